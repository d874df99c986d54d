//! SIMD-accelerated distance kernels.
//!
//! AVX2 (+FMA for f32) implementations of the f32-vs-f32 and i8-vs-i8 kernels
//! used by the exact indexes, selected at runtime. Other targets and CPUs
//! without AVX2 use the chunked scalar loops, which LLVM auto-vectorizes.

use super::scalar::{dot_i8_scalar, squared_diff_i8_scalar};
use crate::config::F32_CHUNK;

// ============================================================================
// Public dispatch functions
// ============================================================================

/// Squared Euclidean distance between two f32 slices.
#[inline]
pub fn euclidean_sq_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") && std::arch::is_x86_feature_detected!("fma")
        {
            return unsafe { avx2_euclidean_sq_f32(a, b) };
        }
    }
    scalar_euclidean_sq_f32(a, b)
}

/// Dot product between two f32 slices.
#[inline]
pub fn dot_product_f32(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") && std::arch::is_x86_feature_detected!("fma")
        {
            return unsafe { avx2_dot_product_f32(a, b) };
        }
    }
    scalar_dot_product_f32(a, b)
}

/// Integer dot product between two i8 slices.
#[inline]
pub fn dot_i8(a: &[i8], b: &[i8]) -> i64 {
    debug_assert_eq!(a.len(), b.len());
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            return unsafe { avx2_dot_i8(a, b) };
        }
    }
    dot_i8_scalar(a, b)
}

/// Integer squared Euclidean distance between two i8 slices.
#[inline]
pub fn squared_diff_i8(a: &[i8], b: &[i8]) -> i64 {
    debug_assert_eq!(a.len(), b.len());
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            return unsafe { avx2_squared_diff_i8(a, b) };
        }
    }
    squared_diff_i8_scalar(a, b)
}

// ============================================================================
// Scalar fallbacks (f32 vs f32)
// ============================================================================

fn scalar_euclidean_sq_f32(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len();
    let mut sum = 0.0f64;

    let full_chunks = len / F32_CHUNK;
    for c in 0..full_chunks {
        let base = c * F32_CHUNK;
        let mut chunk_acc = 0.0f32;
        for j in 0..F32_CHUNK {
            let d = a[base + j] - b[base + j];
            chunk_acc += d * d;
        }
        sum += chunk_acc as f64;
    }

    for i in (full_chunks * F32_CHUNK)..len {
        let d = (a[i] - b[i]) as f64;
        sum += d * d;
    }
    sum as f32
}

fn scalar_dot_product_f32(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len();
    let mut sum = 0.0f64;

    let full_chunks = len / F32_CHUNK;
    for c in 0..full_chunks {
        let base = c * F32_CHUNK;
        let mut chunk_acc = 0.0f32;
        for j in 0..F32_CHUNK {
            chunk_acc += a[base + j] * b[base + j];
        }
        sum += chunk_acc as f64;
    }

    for i in (full_chunks * F32_CHUNK)..len {
        sum += a[i] as f64 * b[i] as f64;
    }
    sum as f32
}

// ============================================================================
// AVX2 implementations (x86_64)
// ============================================================================

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn hsum_f32x8(v: __m256) -> f32 {
    let hi128 = _mm256_extractf128_ps(v, 1);
    let lo128 = _mm256_castps256_ps128(v);
    let sum128 = _mm_add_ps(lo128, hi128);
    let hi64 = _mm_movehl_ps(sum128, sum128);
    let sum64 = _mm_add_ps(sum128, hi64);
    let hi32 = _mm_shuffle_ps(sum64, sum64, 0x55);
    _mm_cvtss_f32(_mm_add_ss(sum64, hi32))
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn hsum_i32x8(v: __m256i) -> i64 {
    let mut lanes = [0i32; 8];
    _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, v);
    lanes.iter().map(|&x| x as i64).sum()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn avx2_euclidean_sq_f32(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut s0 = _mm256_setzero_ps();
    let mut s1 = _mm256_setzero_ps();

    let chunks = len / 16;
    for i in 0..chunks {
        let base = i * 16;
        let d0 = _mm256_sub_ps(
            _mm256_loadu_ps(a_ptr.add(base)),
            _mm256_loadu_ps(b_ptr.add(base)),
        );
        let d1 = _mm256_sub_ps(
            _mm256_loadu_ps(a_ptr.add(base + 8)),
            _mm256_loadu_ps(b_ptr.add(base + 8)),
        );
        s0 = _mm256_fmadd_ps(d0, d0, s0);
        s1 = _mm256_fmadd_ps(d1, d1, s1);
    }

    let mut sum = hsum_f32x8(_mm256_add_ps(s0, s1));

    for i in (chunks * 16)..len {
        let d = *a_ptr.add(i) - *b_ptr.add(i);
        sum += d * d;
    }
    sum
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2,fma")]
unsafe fn avx2_dot_product_f32(a: &[f32], b: &[f32]) -> f32 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut s0 = _mm256_setzero_ps();
    let mut s1 = _mm256_setzero_ps();

    let chunks = len / 16;
    for i in 0..chunks {
        let base = i * 16;
        s0 = _mm256_fmadd_ps(
            _mm256_loadu_ps(a_ptr.add(base)),
            _mm256_loadu_ps(b_ptr.add(base)),
            s0,
        );
        s1 = _mm256_fmadd_ps(
            _mm256_loadu_ps(a_ptr.add(base + 8)),
            _mm256_loadu_ps(b_ptr.add(base + 8)),
            s1,
        );
    }

    let mut sum = hsum_f32x8(_mm256_add_ps(s0, s1));

    for i in (chunks * 16)..len {
        sum += *a_ptr.add(i) * *b_ptr.add(i);
    }
    sum
}

/// 16 i8 lanes are sign-extended to i16 and multiplied pairwise into i32
/// lanes with `madd`. Each lane grows by at most 2 * 128 * 128 per step, so
/// `MAX_DIMENSION` elements cannot overflow it.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn avx2_dot_i8(a: &[i8], b: &[i8]) -> i64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut acc = _mm256_setzero_si256();

    let chunks = len / 16;
    for i in 0..chunks {
        let base = i * 16;
        let va = _mm256_cvtepi8_epi16(_mm_loadu_si128(a_ptr.add(base) as *const __m128i));
        let vb = _mm256_cvtepi8_epi16(_mm_loadu_si128(b_ptr.add(base) as *const __m128i));
        acc = _mm256_add_epi32(acc, _mm256_madd_epi16(va, vb));
    }

    let mut sum = hsum_i32x8(acc);
    for i in (chunks * 16)..len {
        sum += *a_ptr.add(i) as i64 * *b_ptr.add(i) as i64;
    }
    sum
}

/// Differences of two i8 values fit in i16 (\[-255, 255\]); each i32 lane grows
/// by at most 2 * 255² per step.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn avx2_squared_diff_i8(a: &[i8], b: &[i8]) -> i64 {
    let len = a.len();
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut acc = _mm256_setzero_si256();

    let chunks = len / 16;
    for i in 0..chunks {
        let base = i * 16;
        let va = _mm256_cvtepi8_epi16(_mm_loadu_si128(a_ptr.add(base) as *const __m128i));
        let vb = _mm256_cvtepi8_epi16(_mm_loadu_si128(b_ptr.add(base) as *const __m128i));
        let d = _mm256_sub_epi16(va, vb);
        acc = _mm256_add_epi32(acc, _mm256_madd_epi16(d, d));
    }

    let mut sum = hsum_i32x8(acc);
    for i in (chunks * 16)..len {
        let d = *a_ptr.add(i) as i64 - *b_ptr.add(i) as i64;
        sum += d * d;
    }
    sum
}
