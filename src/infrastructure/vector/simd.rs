//! Dot-product kernel with runtime SIMD dispatch.
//!
//! Three implementations: portable scalar, AVX2 (x86_64), and NEON
//! (aarch64). The best available one is probed once and cached in a
//! lock-free function pointer; every subsequent call goes straight
//! through it. Typical dimensions (128/512/768/1536) are multiples of
//! the 16-wide inner loops, so the scalar tail rarely runs.

#![allow(unsafe_code)]

use std::sync::OnceLock;

type DotFn = fn(&[f32], &[f32]) -> f32;

static KERNEL: OnceLock<DotFn> = OnceLock::new();

/// Inner product of two f32 sequences.
///
/// Operates over the shorter of the two lengths; empty input yields 0.0.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let kernel = KERNEL.get_or_init(select_kernel);
    kernel(&a[..n], &b[..n])
}

fn select_kernel() -> DotFn {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            tracing::debug!("dot kernel: avx2");
            return dot_avx2_entry;
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        tracing::debug!("dot kernel: neon");
        return dot_neon_entry;
    }
    #[allow(unreachable_code)]
    {
        tracing::debug!("dot kernel: scalar");
        dot_scalar
    }
}

fn dot_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(target_arch = "x86_64")]
fn dot_avx2_entry(a: &[f32], b: &[f32]) -> f32 {
    // SAFETY: this entry is only selected after the avx2 probe succeeds.
    unsafe { dot_avx2(a, b) }
}

/// Two 8-lane accumulators over a 16-wide inner loop hide the
/// multiply-add latency; lanes are combined with a horizontal sum at the
/// end and the remainder is handled scalar.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn dot_avx2(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::x86_64::{
        _mm256_add_ps, _mm256_castps256_ps128, _mm256_extractf128_ps, _mm256_loadu_ps,
        _mm256_mul_ps, _mm256_setzero_ps, _mm_add_ps, _mm_add_ss, _mm_cvtss_f32,
        _mm_movehdup_ps, _mm_movehl_ps,
    };

    let n = a.len();
    let pa = a.as_ptr();
    let pb = b.as_ptr();

    let mut acc0 = _mm256_setzero_ps();
    let mut acc1 = _mm256_setzero_ps();
    let mut i = 0;
    while i + 16 <= n {
        let a0 = _mm256_loadu_ps(pa.add(i));
        let b0 = _mm256_loadu_ps(pb.add(i));
        acc0 = _mm256_add_ps(acc0, _mm256_mul_ps(a0, b0));
        let a1 = _mm256_loadu_ps(pa.add(i + 8));
        let b1 = _mm256_loadu_ps(pb.add(i + 8));
        acc1 = _mm256_add_ps(acc1, _mm256_mul_ps(a1, b1));
        i += 16;
    }

    let acc = _mm256_add_ps(acc0, acc1);
    let lo = _mm256_castps256_ps128(acc);
    let hi = _mm256_extractf128_ps(acc, 1);
    let quad = _mm_add_ps(lo, hi);
    let dual = _mm_add_ps(quad, _mm_movehl_ps(quad, quad));
    let single = _mm_add_ss(dual, _mm_movehdup_ps(dual));
    let mut sum = _mm_cvtss_f32(single);

    while i < n {
        sum += *pa.add(i) * *pb.add(i);
        i += 1;
    }
    sum
}

#[cfg(target_arch = "aarch64")]
fn dot_neon_entry(a: &[f32], b: &[f32]) -> f32 {
    // SAFETY: neon is baseline on aarch64.
    unsafe { dot_neon(a, b) }
}

/// Four 4-lane fma accumulators over a 16-wide inner loop, pairwise
/// reduction, scalar tail.
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn dot_neon(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::aarch64::{vaddq_f32, vaddvq_f32, vdupq_n_f32, vfmaq_f32, vld1q_f32};

    let n = a.len();
    let pa = a.as_ptr();
    let pb = b.as_ptr();

    let mut acc0 = vdupq_n_f32(0.0);
    let mut acc1 = vdupq_n_f32(0.0);
    let mut acc2 = vdupq_n_f32(0.0);
    let mut acc3 = vdupq_n_f32(0.0);
    let mut i = 0;
    while i + 16 <= n {
        acc0 = vfmaq_f32(acc0, vld1q_f32(pa.add(i)), vld1q_f32(pb.add(i)));
        acc1 = vfmaq_f32(acc1, vld1q_f32(pa.add(i + 4)), vld1q_f32(pb.add(i + 4)));
        acc2 = vfmaq_f32(acc2, vld1q_f32(pa.add(i + 8)), vld1q_f32(pb.add(i + 8)));
        acc3 = vfmaq_f32(acc3, vld1q_f32(pa.add(i + 12)), vld1q_f32(pb.add(i + 12)));
        i += 16;
    }

    let sum = vaddq_f32(vaddq_f32(acc0, acc1), vaddq_f32(acc2, acc3));
    let mut out = vaddvq_f32(sum);

    while i < n {
        out += *pa.add(i) * *pb.add(i);
        i += 1;
    }
    out
}
