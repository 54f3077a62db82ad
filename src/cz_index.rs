//! # CzIndex — Per-Prime c^z Residue Membership Index
//!
//! The memory-for-time trade at the heart of the filter: for one 32-bit
//! prime modulus m, precompute every residue c^z mod m over the search
//! rectangle c ∈ [1, max_base], z ∈ [3, max_pow], and answer "does residue r
//! appear anywhere in that rectangle?" with a single bit test.
//!
//! ## Layout
//!
//! ```text
//! vals    row-major Vec<u32>, (max_base × (max_pow − 2)) entries
//!         vals[(c−1)·W + (z−3)] = c^z mod m
//! bitmap  m bits, bit r set ⟺ some (c, z) has residue r
//! ```
//!
//! Residues under m are always < m, so an m-bit table covers the entire
//! residue range with no hashing and no collision chains — membership is a
//! shift, a mask, and one cache line. For the production moduli (primes just
//! below 2³²) the bitmap is ~512 MiB, which is why a worker builds its
//! indices exactly once and keeps them for its whole lifetime.
//!
//! ## Witness Recovery
//!
//! The bitmap stores no back-pointers. Recovering which (c, z) produced a
//! residue is a linear scan over `vals` — deliberately kept off the probe
//! path and run at most once per surviving candidate, not per probe.

use anyhow::{Context, Result};

use crate::arith::modpow;

/// Flat bit table over the residue range [0, m).
pub struct ResidueBitmap {
    words: Vec<u64>,
    bits: u64,
}

impl ResidueBitmap {
    /// Allocate a zeroed table of `bits` bits. Allocation is fallible: a
    /// near-2³² modulus asks for ~512 MiB and the worker must refuse
    /// cleanly rather than abort when that much memory is not available.
    pub fn new(bits: u64) -> Result<Self> {
        let len = bits.div_ceil(64) as usize;
        let mut words = Vec::new();
        words
            .try_reserve_exact(len)
            .with_context(|| format!("cannot allocate {} MiB residue bitmap", (len * 8) >> 20))?;
        words.resize(len, 0u64);
        Ok(ResidueBitmap { words, bits })
    }

    #[inline]
    fn set(&mut self, r: u32) {
        self.words[(r >> 6) as usize] |= 1u64 << (r & 63);
    }

    /// Test bit r. Residues ≥ the table size are by definition absent.
    #[inline]
    pub fn test(&self, r: u32) -> bool {
        if (r as u64) >= self.bits {
            return false;
        }
        (self.words[(r >> 6) as usize] >> (r & 63)) & 1 == 1
    }

    /// Number of set bits, i.e. the number of distinct residues stored.
    pub fn count_ones(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }
}

/// Precomputed c^z residues and their membership bitmap under one modulus.
pub struct CzIndex {
    m: u32,
    max_base: u32,
    max_pow: u32,
    /// Powers per base row: max_pow − 2 (z starts at 3).
    row_width: usize,
    vals: Vec<u32>,
    exists: ResidueBitmap,
}

impl CzIndex {
    /// Build the index for modulus `m`: max_base · (max_pow − 2) modular
    /// exponentiations plus one m-bit allocation.
    pub fn build(max_base: u32, max_pow: u32, m: u32) -> Result<CzIndex> {
        assert!(max_base >= 1, "max_base must be at least 1");
        assert!(max_pow >= 3, "max_pow must be at least 3");
        let row_width = (max_pow - 2) as usize;
        let n_vals = max_base as usize * row_width;

        let mut exists = ResidueBitmap::new(m as u64)
            .with_context(|| format!("building c^z index for modulus {m}"))?;
        let mut vals = Vec::new();
        vals.try_reserve_exact(n_vals)
            .with_context(|| format!("cannot allocate {n_vals}-entry residue table"))?;

        for c in 1..=max_base {
            // c^3 once, then one modular multiply per further exponent
            let c64 = c as u64;
            let m64 = m as u64;
            let mut r = modpow(c64, 3, m) as u64;
            vals.push(r as u32);
            exists.set(r as u32);
            for _z in 4..=max_pow {
                r = r * (c64 % m64) % m64;
                vals.push(r as u32);
                exists.set(r as u32);
            }
        }

        Ok(CzIndex {
            m,
            max_base,
            max_pow,
            row_width,
            vals,
            exists,
        })
    }

    /// The modulus this index was built for.
    #[inline]
    pub fn modulus(&self) -> u32 {
        self.m
    }

    /// Stored residue c^z mod m. Caller must keep (c, z) inside the
    /// populated rectangle; the search loop does by construction.
    #[inline]
    pub fn value(&self, c: u32, z: u32) -> u32 {
        debug_assert!(c >= 1 && c <= self.max_base);
        debug_assert!(z >= 3 && z <= self.max_pow);
        self.vals[(c as usize - 1) * self.row_width + (z as usize - 3)]
    }

    /// True iff some populated (c, z) has residue r.
    #[inline]
    pub fn contains(&self, r: u32) -> bool {
        self.exists.test(r)
    }

    /// The residue of a^x + b^y under this modulus. Both addends are
    /// already reduced, so one conditional subtract replaces the division.
    #[inline]
    pub fn residue_sum(&self, a: u32, x: u32, b: u32, y: u32) -> u32 {
        let s = self.value(a, x) as u64 + self.value(b, y) as u64;
        let m = self.m as u64;
        (if s >= m { s - m } else { s }) as u32
    }

    /// Every (c, z) whose residue equals r. Linear scan over `vals`; used
    /// for witness recovery on surviving candidates, never on the hot path.
    pub fn witnesses(&self, r: u32) -> Vec<(u32, u32)> {
        if !self.exists.test(r) {
            return Vec::new();
        }
        let mut out = Vec::new();
        for c in 1..=self.max_base {
            let row = (c as usize - 1) * self.row_width;
            for z in 3..=self.max_pow {
                if self.vals[row + (z as usize - 3)] == r {
                    out.push((c, z));
                }
            }
        }
        out
    }

    /// Number of distinct residues in the populated rectangle.
    pub fn distinct_residues(&self) -> u64 {
        self.exists.count_ones()
    }

    /// Bitmap footprint in bytes for a given modulus, for RAM admission.
    pub fn bitmap_bytes(m: u32) -> u64 {
        (m as u64).div_ceil(64) * 8
    }
}
