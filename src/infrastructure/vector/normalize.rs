//! L2 vector normalization.
//!
//! Stored vectors are normalized in place before hitting disk and query
//! vectors into an owned copy, so the dot product of any two of them is
//! their cosine similarity.

/// Guards the division when the norm is zero (e.g. the zero vector).
const EPSILON: f32 = 1e-12;

/// Scale `v` to unit L2 norm in place.
pub fn normalize_in_place(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm + EPSILON;
    if denom > 0.0 {
        for x in v.iter_mut() {
            *x /= denom;
        }
    }
}

/// Owned normalized copy of `v`.
pub fn normalized(v: &[f32]) -> Vec<f32> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}
