//! Shared fixtures for the integration tests: seeded field generators and a
//! byte checksum.

#![allow(dead_code)]

/// Linear congruential generator for reproducible data.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed ^ 0x1234_5678_9abc_def0)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Smooth field: a sum of seeded low-frequency cosines per axis, plus a
/// small seeded perturbation. Values stay within roughly `[-3, 3]`.
pub fn smooth_f64(extents: &[usize], seed: u64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    let mut phase = [0.0f64; 3];
    let mut freq = [0.0f64; 3];
    for axis in 0..3 {
        phase[axis] = rng.next_f64() * std::f64::consts::TAU;
        freq[axis] = 0.02 + rng.next_f64() * 0.1;
    }

    let mut dims = [1usize; 3];
    dims[..extents.len()].copy_from_slice(extents);
    let [nx, ny, nz] = dims;

    let mut data = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let mut v = 0.0;
                for (axis, coord) in [x, y, z].into_iter().enumerate().take(extents.len()) {
                    v += (freq[axis] * coord as f64 + phase[axis]).cos();
                }
                v += (rng.next_f64() - 0.5) * 1e-3;
                data.push(v);
            }
        }
    }
    data
}

pub fn smooth_f32(extents: &[usize], seed: u64) -> Vec<f32> {
    smooth_f64(extents, seed).into_iter().map(|v| v as f32).collect()
}

/// Smooth integers scaled to about `amplitude`.
pub fn smooth_i32(extents: &[usize], seed: u64, amplitude: f64) -> Vec<i32> {
    smooth_f64(extents, seed)
        .into_iter()
        .map(|v| (v / 3.0 * amplitude).round() as i32)
        .collect()
}

pub fn smooth_i64(extents: &[usize], seed: u64, amplitude: f64) -> Vec<i64> {
    smooth_f64(extents, seed)
        .into_iter()
        .map(|v| (v / 3.0 * amplitude).round() as i64)
        .collect()
}

/// Smooth field from seeded per-axis cubics plus a small seeded
/// perturbation. Values stay within roughly `[-3, 3]`.
///
/// Only `+`, `-`, `*` and `/` are used, so the values are bit-identical on
/// every platform and can be compared against recorded checksums.
pub fn cubic_f64(extents: &[usize], seed: u64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    let mut coeffs = [[0.0f64; 3]; 3];
    for axis in coeffs.iter_mut() {
        for c in axis.iter_mut() {
            *c = rng.next_f64() * 2.0 - 1.0;
        }
    }

    let mut dims = [1usize; 3];
    dims[..extents.len()].copy_from_slice(extents);
    let [nx, ny, nz] = dims;

    let mut data = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let mut v = 0.0;
                for (axis, (coord, n)) in [(x, nx), (y, ny), (z, nz)]
                    .into_iter()
                    .enumerate()
                    .take(extents.len())
                {
                    let t = coord as f64 / n as f64 * 2.0 - 1.0;
                    let [a, b, c] = coeffs[axis];
                    v += ((c * t + b) * t + a) * t;
                }
                v += (rng.next_f64() - 0.5) * 1e-3;
                data.push(v);
            }
        }
    }
    data
}

pub fn cubic_f32(extents: &[usize], seed: u64) -> Vec<f32> {
    cubic_f64(extents, seed).into_iter().map(|v| v as f32).collect()
}

/// Cubic field scaled by `amplitude` and truncated toward zero.
pub fn cubic_i32(extents: &[usize], seed: u64, amplitude: f64) -> Vec<i32> {
    cubic_f64(extents, seed)
        .into_iter()
        .map(|v| (v * amplitude) as i32)
        .collect()
}

pub fn cubic_i64(extents: &[usize], seed: u64, amplitude: f64) -> Vec<i64> {
    cubic_f64(extents, seed)
        .into_iter()
        .map(|v| (v * amplitude) as i64)
        .collect()
}

/// Uncorrelated full-range integers.
pub fn random_i64(len: usize, seed: u64) -> Vec<i64> {
    let mut rng = Lcg::new(seed);
    (0..len).map(|_| rng.next_u64() as i64).collect()
}

/// Jenkins one-at-a-time hash.
pub fn jenkins_hash(bytes: &[u8]) -> u32 {
    let mut hash = 0u32;
    for &b in bytes {
        hash = hash.wrapping_add(b as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

/// Values that can be hashed by their little-endian bytes.
pub trait LeBytes: Copy {
    fn extend_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_le_bytes {
    ($($t:ty),*) => {
        $(impl LeBytes for $t {
            fn extend_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        })*
    };
}

impl_le_bytes!(i32, i64, f32, f64);

pub fn hash_values<T: LeBytes>(values: &[T]) -> u32 {
    let mut bytes = Vec::with_capacity(values.len() * 8);
    for &v in values {
        v.extend_le(&mut bytes);
    }
    jenkins_hash(&bytes)
}

/// Largest absolute difference between two float arrays.
pub fn max_abs_error(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

#[test]
fn test_jenkins_hash_known_values() {
    assert_eq!(jenkins_hash(b""), 0);
    assert_eq!(jenkins_hash(b"a"), 0xca2e_9442);
    assert_eq!(
        jenkins_hash(b"The quick brown fox jumps over the lazy dog"),
        0x519e_91f5
    );
}
