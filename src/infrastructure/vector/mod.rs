//! Vector infrastructure components
//!
//! The binary vector file, the dot-product kernel with runtime SIMD
//! dispatch, L2 normalization, and the bounded top-K heap.

pub mod file;
pub mod normalize;
pub mod simd;
pub mod top_k;

pub use file::{chunk_records, encode_record, Header, RecordBatch, Scanner, VectorFile, HEADER_LEN};
pub use normalize::{normalize_in_place, normalized};
pub use simd::dot;
pub use top_k::TopK;
