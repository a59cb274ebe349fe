//! Block decorrelating transform and coefficient ordering.
//!
//! The transform is separable: a four-point lifting step is applied along x,
//! then y, then z. Two variants exist:
//!
//! - the lossy lift, a near-orthogonal transform that concentrates energy in
//!   the low-sequency coefficients but rounds in its shifts, so a forward
//!   then inverse pass may drift by a few units (at most 2, 10 and 42 for
//!   ranks 1, 2 and 3). The guard planes kept below the requested accuracy
//!   absorb this;
//! - the reversible lift, a Lorenzo-style difference cascade that inverts
//!   exactly and is used when every bit plane is kept.
//!
//! After the transform, coefficients are permuted into increasing sequency
//! order and mapped to negabinary so that bit planes can be coded without
//! sign bits.

use crate::value::BlockInt;

/// Coefficient order for 1D blocks.
pub(crate) const PERM_1: [u8; 4] = [0, 1, 2, 3];

/// Coefficient order for 2D blocks.
pub(crate) const PERM_2: [u8; 16] = [0, 1, 4, 5, 2, 8, 6, 9, 3, 12, 10, 7, 13, 11, 14, 15];

/// Coefficient order for 3D blocks.
pub(crate) const PERM_3: [u8; 64] = [
    0, 1, 4, 16, 5, 17, 20, 2, 8, 32, 21, 6, 18, 9, 33, 24, 36, 3, 12, 48, 22, 25, 37, 10, 34, 40,
    7, 19, 13, 49, 28, 52, 26, 38, 41, 23, 29, 53, 11, 35, 14, 50, 44, 56, 42, 27, 39, 30, 54, 45,
    57, 15, 51, 60, 43, 46, 58, 31, 55, 61, 47, 59, 62, 63,
];

/// Coefficient order for a block of the given rank.
pub(crate) fn permutation(rank: usize) -> &'static [u8] {
    match rank {
        1 => &PERM_1,
        2 => &PERM_2,
        _ => &PERM_3,
    }
}

/// Call `f(base, stride)` for every four-point line along `axis`.
fn for_each_line(rank: usize, axis: usize, mut f: impl FnMut(usize, usize)) {
    let stride = 1usize << (2 * axis);
    for base in 0..1usize << (2 * rank) {
        if (base / stride) % 4 == 0 {
            f(base, stride);
        }
    }
}

#[inline]
fn load<I: BlockInt>(p: &[I], base: usize, s: usize) -> (I, I, I, I) {
    (p[base], p[base + s], p[base + 2 * s], p[base + 3 * s])
}

#[inline]
fn store<I: BlockInt>(p: &mut [I], base: usize, s: usize, (x, y, z, w): (I, I, I, I)) {
    p[base] = x;
    p[base + s] = y;
    p[base + 2 * s] = z;
    p[base + 3 * s] = w;
}

fn fwd_lift<I: BlockInt>(p: &mut [I], base: usize, s: usize) {
    let (mut x, mut y, mut z, mut w) = load(p, base, s);

    x = x.add(w).half();
    w = w.sub(x);
    z = z.add(y).half();
    y = y.sub(z);
    x = x.add(z).half();
    z = z.sub(x);
    w = w.add(y).half();
    y = y.sub(w);
    w = w.add(y.half());
    y = y.sub(w.half());

    store(p, base, s, (x, y, z, w));
}

fn inv_lift<I: BlockInt>(p: &mut [I], base: usize, s: usize) {
    let (mut x, mut y, mut z, mut w) = load(p, base, s);

    y = y.add(w.half());
    w = w.sub(y.half());
    y = y.add(w);
    w = w.twice().sub(y);
    z = z.add(x);
    x = x.twice().sub(z);
    y = y.add(z);
    z = z.twice().sub(y);
    w = w.add(x);
    x = x.twice().sub(w);

    store(p, base, s, (x, y, z, w));
}

fn rev_fwd_lift<I: BlockInt>(p: &mut [I], base: usize, s: usize) {
    let (x, mut y, mut z, mut w) = load(p, base, s);

    w = w.sub(z);
    z = z.sub(y);
    y = y.sub(x);
    w = w.sub(z);
    z = z.sub(y);
    w = w.sub(z);

    store(p, base, s, (x, y, z, w));
}

fn rev_inv_lift<I: BlockInt>(p: &mut [I], base: usize, s: usize) {
    let (x, mut y, mut z, mut w) = load(p, base, s);

    w = w.add(z);
    z = z.add(y);
    w = w.add(z);
    y = y.add(x);
    z = z.add(y);
    w = w.add(z);

    store(p, base, s, (x, y, z, w));
}

/// Forward lossy transform, x then y then z.
pub(crate) fn forward<I: BlockInt>(block: &mut [I], rank: usize) {
    for axis in 0..rank {
        for_each_line(rank, axis, |base, s| fwd_lift(block, base, s));
    }
}

/// Inverse lossy transform, z then y then x.
pub(crate) fn inverse<I: BlockInt>(block: &mut [I], rank: usize) {
    for axis in (0..rank).rev() {
        for_each_line(rank, axis, |base, s| inv_lift(block, base, s));
    }
}

/// Forward reversible transform.
pub(crate) fn forward_reversible<I: BlockInt>(block: &mut [I], rank: usize) {
    for axis in 0..rank {
        for_each_line(rank, axis, |base, s| rev_fwd_lift(block, base, s));
    }
}

/// Inverse reversible transform.
pub(crate) fn inverse_reversible<I: BlockInt>(block: &mut [I], rank: usize) {
    for axis in (0..rank).rev() {
        for_each_line(rank, axis, |base, s| rev_inv_lift(block, base, s));
    }
}

/// Permute into sequency order and map to negabinary.
pub(crate) fn reorder_forward<I: BlockInt>(block: &[I], rank: usize, out: &mut [u64]) {
    for (o, &index) in out.iter_mut().zip(permutation(rank)) {
        *o = block[index as usize].to_negabinary();
    }
}

/// Inverse of [`reorder_forward`].
pub(crate) fn reorder_inverse<I: BlockInt>(coeffs: &[u64], rank: usize, out: &mut [I]) {
    for (&c, &index) in coeffs.iter().zip(permutation(rank)) {
        out[index as usize] = I::from_negabinary(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation(perm: &[u8]) -> bool {
        let mut seen = vec![false; perm.len()];
        for &p in perm {
            if seen[p as usize] {
                return false;
            }
            seen[p as usize] = true;
        }
        seen.iter().all(|&s| s)
    }

    #[test]
    fn test_permutations_are_bijections() {
        assert!(is_permutation(&PERM_1));
        assert!(is_permutation(&PERM_2));
        assert!(is_permutation(&PERM_3));
    }

    #[test]
    fn test_permutations_nondecreasing_degree() {
        let degree3 = |i: u8| (i & 3) + ((i >> 2) & 3) + ((i >> 4) & 3);
        for pair in PERM_3.windows(2) {
            assert!(degree3(pair[0]) <= degree3(pair[1]));
        }
        let degree2 = |i: u8| (i & 3) + ((i >> 2) & 3);
        for pair in PERM_2.windows(2) {
            assert!(degree2(pair[0]) <= degree2(pair[1]));
        }
    }

    #[test]
    fn test_constant_block_has_single_dc_coefficient() {
        let mut block = [1000i32; 16];
        forward(&mut block, 2);
        assert_eq!(block[0], 1000);
        assert!(block[1..].iter().all(|&c| c == 0));
    }

    #[test]
    fn test_lossy_transform_near_inverse() {
        let original: Vec<i32> = (0..64).map(|i| (i * 7919 % 1013) << 16).collect();
        let mut block = original.clone();
        forward(&mut block, 3);
        inverse(&mut block, 3);
        for (a, b) in original.iter().zip(&block) {
            assert!((a - b).abs() <= 64, "{a} vs {b}");
        }
    }

    #[test]
    fn test_lossy_transform_drift_is_bounded() {
        // Each inverse row pass amplifies earlier error by at most 4 and
        // adds at most 2 of its own rounding.
        const MAX_DRIFT: [i32; 3] = [2, 10, 42];

        let mut state = 0x9e37_79b9_7f4a_7c15u64;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 38) as i32 - (1 << 25)
        };
        for rank in 1..=3 {
            let n = 1 << (2 * rank);
            let mut worst = 0;
            for _ in 0..2000 {
                let original: Vec<i32> = (0..n).map(|_| next()).collect();
                let mut block = original.clone();
                forward(&mut block, rank);
                inverse(&mut block, rank);
                for (a, b) in original.iter().zip(&block) {
                    worst = worst.max((a - b).abs());
                }
            }
            assert!(
                worst <= MAX_DRIFT[rank - 1],
                "rank {rank}: drift {worst} exceeds {}",
                MAX_DRIFT[rank - 1]
            );
        }
    }

    #[test]
    fn test_reversible_transform_exact() {
        let original: Vec<i64> = (0..64)
            .map(|i: i64| i.wrapping_mul(0x9e37_79b9_7f4a_7c15u64 as i64))
            .collect();
        for rank in 1..=3 {
            let n = 1 << (2 * rank);
            let mut block = original[..n].to_vec();
            forward_reversible(&mut block, rank);
            inverse_reversible(&mut block, rank);
            assert_eq!(block, &original[..n]);
        }
    }

    #[test]
    fn test_reversible_transform_linear_ramp() {
        let mut block = [5i32, 8, 11, 14];
        forward_reversible(&mut block, 1);
        assert_eq!(block, [5, 3, 0, 0]);
    }

    #[test]
    fn test_reorder_roundtrip() {
        let block: Vec<i32> = (0..16).map(|i| i - 8).collect();
        let mut coeffs = [0u64; 16];
        reorder_forward(&block, 2, &mut coeffs);
        assert_eq!(coeffs[0], (-8i32).to_negabinary());
        let mut back = [0i32; 16];
        reorder_inverse(&coeffs, 2, &mut back);
        assert_eq!(&back[..], &block[..]);
    }
}
