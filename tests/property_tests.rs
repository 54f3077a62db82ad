//! Property-based tests for bealreach's mathematical primitives.
//!
//! These tests use the `proptest` framework to verify invariants across
//! thousands of randomly generated inputs. Unlike example-based tests that
//! check specific known values, property tests express universal truths
//! that must hold for all valid inputs.
//!
//! # Prerequisites
//!
//! - No network access required. Purely computational; always run.
//!
//! # How to run
//!
//! ```bash
//! cargo test --test property_tests
//!
//! # Increase case count for thorough testing (default is 256):
//! PROPTEST_CASES=10000 cargo test --test property_tests
//! ```
//!
//! # Testing strategy
//!
//! - **Arith module**: modular exponentiation against GMP's `pow_mod` on
//!   `rug::Integer`, binary GCD against the Euclidean reference, the
//!   deterministic Miller–Rabin against GMP's `is_probably_prime`.
//! - **CzIndex module**: stored residues round-trip through the membership
//!   bitmap; witnesses invert lookups.
//! - **Cursor module**: the emitted point set equals the brute-force
//!   reference set, with no duplicates, in a reproducible order.
//!
//! Each property is named `prop_<function>_<invariant>`.

use proptest::prelude::*;
use rug::Integer;
use std::collections::HashSet;

use bealreach::arith::{gcd, is_prime_u32, modpow};
use bealreach::cursor::{Point, PointCursor};
use bealreach::cz_index::CzIndex;

/// Euclidean reference for cross-checking the binary GCD.
fn gcd_euclid(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

proptest! {
    /// modpow(b, e, m) == b^e mod m computed with arbitrary precision,
    /// over the full 64-bit base and exponent range. This is the property
    /// the pre-reduction exists for: an unreduced base overflows the
    /// 64-bit squaring step and silently corrupts every filter probe.
    #[test]
    fn prop_modpow_matches_big_int(
        base in any::<u64>(),
        exp in any::<u64>(),
        modulus in 1u32..,
    ) {
        let result = modpow(base, exp, modulus);
        let expected = Integer::from(base)
            .pow_mod(&Integer::from(exp), &Integer::from(modulus))
            .unwrap();
        prop_assert_eq!(Integer::from(result), expected,
            "modpow({}, {}, {})", base, exp, modulus);
    }

    /// Binary GCD matches the Euclidean reference everywhere, including
    /// the zero conventions.
    #[test]
    fn prop_gcd_matches_euclid(u in any::<u32>(), v in any::<u32>()) {
        prop_assert_eq!(gcd(u, v), gcd_euclid(u, v));
    }

    /// gcd is symmetric and divides both arguments.
    #[test]
    fn prop_gcd_symmetric_and_divides(u in 1u32.., v in 1u32..) {
        let g = gcd(u, v);
        prop_assert_eq!(g, gcd(v, u));
        prop_assert!(g >= 1);
        prop_assert_eq!(u % g, 0);
        prop_assert_eq!(v % g, 0);
    }

    /// The deterministic Miller–Rabin agrees with GMP's classification
    /// for arbitrary 32-bit inputs.
    #[test]
    fn prop_is_prime_u32_matches_gmp(n in any::<u32>()) {
        let gmp_says = Integer::from(n).is_probably_prime(40) != rug::integer::IsPrime::No;
        prop_assert_eq!(is_prime_u32(n), gmp_says, "n = {}", n);
    }

    /// Every stored residue is the modpow of its coordinates and is
    /// present in the membership bitmap.
    #[test]
    fn prop_index_round_trips(
        max_base in 1u32..40,
        max_pow in 3u32..12,
        m_idx in 0usize..6,
    ) {
        // kept below 2^26 so the per-case bitmap stays a few MiB; the
        // full-width modulus is exercised by the ignored big-bitmap test
        let moduli = [97u32, 101, 65537, 1048573, 15485863, 33554393];
        let m = moduli[m_idx];
        let idx = CzIndex::build(max_base, max_pow, m).unwrap();
        for c in 1..=max_base {
            for z in 3..=max_pow {
                let r = idx.value(c, z);
                prop_assert_eq!(r, modpow(c as u64, z as u64, m));
                prop_assert!(idx.contains(r));
                prop_assert!(idx.witnesses(r).contains(&(c, z)));
            }
        }
    }

    /// The cursor yields exactly the reference set, without duplicates.
    #[test]
    fn prop_cursor_yields_reference_set(
        a_fixed in 1u32..60,
        max_pow in 3u32..8,
    ) {
        let points: Vec<Point> = PointCursor::new(60, max_pow, a_fixed).collect();
        let yielded: HashSet<Point> = points.iter().copied().collect();
        prop_assert_eq!(yielded.len(), points.len(), "duplicate emission");

        let mut reference = HashSet::new();
        for b in 1..=a_fixed {
            if gcd(a_fixed, b) != 1 {
                continue;
            }
            for x in 3..=max_pow {
                for y in 3..=max_pow {
                    reference.insert(Point { a: a_fixed, x, b, y });
                }
            }
        }
        prop_assert_eq!(yielded, reference);
    }

    /// Re-running a cursor reproduces the identical stream.
    #[test]
    fn prop_cursor_deterministic(a_fixed in 1u32..60, max_pow in 3u32..8) {
        let first: Vec<Point> = PointCursor::new(60, max_pow, a_fixed).collect();
        let second: Vec<Point> = PointCursor::new(60, max_pow, a_fixed).collect();
        prop_assert_eq!(first, second);
    }
}
