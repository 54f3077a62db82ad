//! # SearchParams — Typed Search Configuration
//!
//! The immutable (max_base, max_pow, primes) triple every node in one search
//! run must agree on. Serialized as JSON inside work assignments so a worker
//! can compare the coordinator's configuration against the indices it has
//! already built — index construction costs minutes and gigabytes, so a
//! worker binds to the first configuration it sees and refuses mismatches
//! rather than rebuilding mid-run.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::arith::is_prime_u32;
use crate::cz_index::CzIndex;

/// Bounds and filter moduli for one search run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Largest base considered for a, b and c.
    pub max_base: u32,
    /// Largest exponent considered for x, y and z (minimum 3).
    pub max_pow: u32,
    /// Filter moduli, applied in declared order. Place the most
    /// discriminating prime first.
    pub primes: Vec<u32>,
}

impl SearchConfig {
    pub fn new(max_base: u32, max_pow: u32, primes: Vec<u32>) -> Result<SearchConfig> {
        let config = SearchConfig {
            max_base,
            max_pow,
            primes,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run: empty or duplicate
    /// prime lists, composite moduli, degenerate bounds.
    pub fn validate(&self) -> Result<()> {
        if self.max_base < 1 {
            bail!("max_base must be at least 1");
        }
        if self.max_pow < 3 {
            bail!("max_pow must be at least 3 (Beal exponents start at 3)");
        }
        if self.primes.is_empty() {
            bail!("at least one filter prime is required");
        }
        for (i, &p) in self.primes.iter().enumerate() {
            if !is_prime_u32(p) {
                bail!("filter modulus {p} is not prime");
            }
            if self.primes[..i].contains(&p) {
                bail!("filter modulus {p} appears more than once");
            }
        }
        Ok(())
    }

    /// Combined bitmap footprint of all filter indices, for RAM admission.
    pub fn bitmap_total_bytes(&self) -> u64 {
        self.primes.iter().map(|&m| CzIndex::bitmap_bytes(m)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> SearchConfig {
        SearchConfig {
            max_base: 1000,
            max_pow: 1000,
            primes: vec![4294967291, 4294967279],
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_empty_primes() {
        let mut c = base_config();
        c.primes.clear();
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_composite_modulus() {
        let mut c = base_config();
        c.primes.push(4294967295);
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_modulus() {
        let mut c = base_config();
        c.primes.push(4294967291);
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_degenerate_bounds() {
        let mut c = base_config();
        c.max_pow = 2;
        assert!(c.validate().is_err());
        let mut c = base_config();
        c.max_base = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn bitmap_sizing() {
        let c = SearchConfig {
            max_base: 10,
            max_pow: 5,
            primes: vec![4294967291],
        };
        // one near-2³² modulus rounds up to the full 512 MiB table
        assert_eq!(c.bitmap_total_bytes(), 536870912);
    }

    #[test]
    fn json_round_trip() {
        let c = base_config();
        let json = serde_json::to_string(&c).unwrap();
        let back: SearchConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
