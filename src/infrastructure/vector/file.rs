//! Binary vector file.
//!
//! Layout (little-endian, no padding):
//!
//! ```text
//! offset 0  : u32 vector_count
//! offset 4  : u32 dimensions
//! offset 8  : record[0]
//! offset 8+R: record[1] ...
//! ```
//!
//! where `R = (dimensions + 1) * 4` and each record is one f32 carrying
//! the integer id bitwise, followed by `dimensions` f32 components. The
//! uniform stride keeps scans branch-free; the id survives up to 2^24
//! before f32 integer precision runs out.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::domain::errors::Result;

/// Fixed preamble length in bytes.
pub const HEADER_LEN: u64 = 8;

/// Streaming reads aim for this many bytes of in-flight records.
const TARGET_CHUNK_BYTES: usize = 4 * 1024 * 1024;
const MIN_CHUNK_RECORDS: usize = 512;
const MAX_CHUNK_RECORDS: usize = 8192;

/// The 8-byte preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Number of records stored after the header.
    pub vector_count: u32,
    /// Components per vector; 0 until fixed by the first insert.
    pub dimensions: u32,
}

impl Header {
    /// On-disk bytes per record.
    pub fn record_stride(&self) -> u64 {
        (u64::from(self.dimensions) + 1) * 4
    }
}

/// Records per streaming chunk for the given dimensionality.
///
/// Targets ~4 MiB of vectors in flight, clamped to [512, 8192] records
/// and rounded to a multiple of four records so chunks stay 16-byte
/// aligned.
pub fn chunk_records(dimensions: u32) -> usize {
    let stride = (dimensions as usize + 1) * 4;
    (TARGET_CHUNK_BYTES / stride).clamp(MIN_CHUNK_RECORDS, MAX_CHUNK_RECORDS) & !3
}

/// An open vector file with its parsed header.
#[derive(Debug)]
pub struct VectorFile {
    file: File,
    path: PathBuf,
    header: Header,
}

impl VectorFile {
    /// Open (creating if missing) and settle the header.
    ///
    /// An empty or short file gets a fresh header carrying the caller's
    /// dimensions. When both sides have nonzero dimensions that
    /// disagree, the caller's value wins and is written back; a caller
    /// passing 0 adopts whatever is on disk. The cursor is left at the
    /// start of the body.
    pub fn open(path: &Path, dimensions: u32) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let len = file.metadata()?.len();
        let mut vf = Self {
            file,
            path: path.to_path_buf(),
            header: Header {
                vector_count: 0,
                dimensions,
            },
        };

        if len < HEADER_LEN {
            vf.write_header(vf.header)?;
        } else {
            vf.file.seek(SeekFrom::Start(0))?;
            let mut raw = [0u8; HEADER_LEN as usize];
            vf.file.read_exact(&mut raw)?;
            let on_disk = Header {
                vector_count: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
                dimensions: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            };
            let resolved = if dimensions != 0 {
                dimensions
            } else {
                on_disk.dimensions
            };
            vf.header = Header {
                vector_count: on_disk.vector_count,
                dimensions: resolved,
            };
            if resolved != on_disk.dimensions {
                vf.write_header(vf.header)?;
            }
        }

        vf.file.seek(SeekFrom::Start(HEADER_LEN))?;
        Ok(vf)
    }

    /// Current header snapshot.
    pub fn header(&self) -> Header {
        self.header
    }

    /// Path this file was opened at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the preamble and remember it.
    pub fn write_header(&mut self, header: Header) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.vector_count.to_le_bytes())?;
        self.file.write_all(&header.dimensions.to_le_bytes())?;
        self.header = header;
        Ok(())
    }

    /// Append pre-encoded record bytes at the end of the body.
    pub fn append_records(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    /// Overwrite the components of the record at `index`, leaving its id
    /// float untouched.
    pub fn overwrite_vector(&mut self, index: u64, vector: &[f32]) -> Result<()> {
        let offset = HEADER_LEN + index * self.header.record_stride() + 4;
        self.file.seek(SeekFrom::Start(offset))?;
        let mut bytes = Vec::with_capacity(vector.len() * 4);
        for x in vector {
            bytes.extend_from_slice(&x.to_le_bytes());
        }
        self.file.write_all(&bytes)?;
        Ok(())
    }

    /// Flush file contents and metadata to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Begin a chunked scan of the body starting at `skip` records.
    ///
    /// The scan covers at most `vector_count - skip` records and
    /// truncates at EOF, so trailing bytes beyond what the header admits
    /// stay invisible.
    pub fn scan(&mut self, skip: u64) -> Result<Scanner<'_>> {
        let stride = self.header.record_stride();
        let remaining = u64::from(self.header.vector_count).saturating_sub(skip);
        self.file.seek(SeekFrom::Start(HEADER_LEN + skip * stride))?;
        Ok(Scanner {
            file: &mut self.file,
            stride_floats: self.header.dimensions as usize + 1,
            chunk: chunk_records(self.header.dimensions),
            remaining,
            bytes: Vec::new(),
            floats: Vec::new(),
        })
    }

    /// Path of the transient sibling used by rewrites.
    pub fn temp_path(path: &Path) -> PathBuf {
        let mut os = path.as_os_str().to_os_string();
        os.push(".temp");
        PathBuf::from(os)
    }

    /// Copy this file to its temp sibling and open the copy.
    pub fn open_temp_copy(&self) -> Result<Self> {
        let tmp = Self::temp_path(&self.path);
        std::fs::copy(&self.path, &tmp)?;
        Self::open(&tmp, self.header.dimensions)
    }

    /// Open an empty temp sibling carrying this file's dimensions.
    ///
    /// Any stale temp left by an earlier failed rewrite is truncated.
    pub fn create_temp_empty(&self) -> Result<Self> {
        let tmp = Self::temp_path(&self.path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        let header = Header {
            vector_count: 0,
            dimensions: self.header.dimensions,
        };
        let mut vf = Self {
            file,
            path: tmp,
            header,
        };
        vf.write_header(header)?;
        Ok(vf)
    }

    /// Commit a finished temp file: fsync it, rename it over this path,
    /// and refresh the handle so subsequent operations see the new body.
    pub fn replace_with(&mut self, mut temp: Self) -> Result<()> {
        temp.sync()?;
        let temp_path = temp.path.clone();
        let header = temp.header;
        drop(temp);

        std::fs::rename(&temp_path, &self.path)?;

        let mut file = OpenOptions::new().read(true).write(true).open(&self.path)?;
        file.seek(SeekFrom::Start(HEADER_LEN))?;
        self.file = file;
        self.header = header;
        tracing::debug!(
            path = %self.path.display(),
            vector_count = header.vector_count,
            "vector file replaced, handle refreshed"
        );
        Ok(())
    }
}

/// Streaming body reader handed out by [`VectorFile::scan`].
#[derive(Debug)]
pub struct Scanner<'a> {
    file: &'a mut File,
    stride_floats: usize,
    chunk: usize,
    remaining: u64,
    bytes: Vec<u8>,
    floats: Vec<f32>,
}

impl Scanner<'_> {
    /// Read the next chunk of records; `None` at the end of the scan.
    ///
    /// A partial trailing record (truncated file) is dropped.
    pub fn next_batch(&mut self) -> Result<Option<RecordBatch<'_>>> {
        let want = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(self.chunk);
        if want == 0 {
            return Ok(None);
        }

        let stride_bytes = self.stride_floats * 4;
        let want_bytes = want * stride_bytes;
        self.bytes.resize(want_bytes, 0);
        let mut filled = 0;
        while filled < want_bytes {
            let n = self.file.read(&mut self.bytes[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        let records = filled / stride_bytes;
        if records == 0 {
            self.remaining = 0;
            return Ok(None);
        }

        self.floats.clear();
        self.floats.extend(
            self.bytes[..records * stride_bytes]
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])),
        );
        self.remaining -= records as u64;

        Ok(Some(RecordBatch {
            floats: &self.floats,
            stride: self.stride_floats,
        }))
    }
}

/// One decoded chunk of records, borrowed from the scanner's buffer.
#[derive(Debug)]
pub struct RecordBatch<'a> {
    floats: &'a [f32],
    stride: usize,
}

impl<'a> RecordBatch<'a> {
    /// Records in this batch.
    pub fn len(&self) -> usize {
        self.floats.len() / self.stride
    }

    /// True when the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.floats.is_empty()
    }

    /// Iterate `(id, components)` pairs. The id comes back from its f32
    /// carrier via integer truncation.
    pub fn records(&self) -> impl Iterator<Item = (i64, &'a [f32])> + '_ {
        self.floats
            .chunks_exact(self.stride)
            .map(|rec| (rec[0] as i64, &rec[1..]))
    }
}

/// Encode one record into `out`: the id as an f32 bit pattern, then the
/// components.
pub fn encode_record(out: &mut Vec<u8>, id: i64, vector: &[f32]) {
    out.extend_from_slice(&(id as f32).to_le_bytes());
    for x in vector {
        out.extend_from_slice(&x.to_le_bytes());
    }
}
