//! # Verify — Big-Integer Re-Check of Logged Candidates
//!
//! The filter chain is one-sided: it never drops a counterexample, but
//! everything it emits is merely a residue coincidence until proven
//! otherwise. This module closes the loop with exact arithmetic: for each
//! candidate (a, x, b, y) from the result log, compute a^x + b^y with
//! `rug::Integer` and test whether the sum is a perfect z-th power c^z with
//! c ≤ max_base and z ∈ [3, max_pow].
//!
//! gcd(a, b) = 1 is enforced by the enumerator, and for an exact equality
//! it already forces the full Beal coprimality: any prime dividing both a
//! and c would divide b^y = c^z − a^x and hence b. So a perfect-power hit
//! inside the search rectangle IS a counterexample — no further gcd test
//! is needed, though the verdict carries (c, z) so anyone can check.

use anyhow::Result;
use rug::ops::Pow;
use rug::Integer;
use std::path::Path;
use tracing::{info, warn};

use crate::cursor::Point;
use crate::result_log;

/// Outcome of the exact re-check of one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// a^x + b^y really equals c^z inside the search rectangle.
    Counterexample { c: u32, z: u32 },
    /// The residues coincided under every filter prime, the integers do not.
    Coincidence,
}

/// Exact verdict for one candidate under the search bounds.
pub fn check_candidate(p: &Point, max_base: u32, max_pow: u32) -> Verdict {
    let sum = Integer::from(Integer::from(p.a).pow(p.x)) + Integer::from(Integer::from(p.b).pow(p.y));
    for z in 3..=max_pow {
        let (root, rem) = sum.clone().root_rem(Integer::new(), z);
        if rem != 0 {
            continue;
        }
        match root.to_u32() {
            Some(c) if c >= 1 && c <= max_base => {
                return Verdict::Counterexample { c, z };
            }
            _ => {} // exact power, but the base falls outside the rectangle
        }
    }
    Verdict::Coincidence
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct VerifySummary {
    pub checked: u64,
    pub coincidences: u64,
    /// Candidates that survived exact verification, with their witnesses.
    pub counterexamples: Vec<(Point, u32, u32)>,
}

/// Re-check every candidate in a result log. Counterexamples are logged
/// loudly as they are found; the summary carries them all.
pub fn verify_log(path: &Path, max_base: u32, max_pow: u32) -> Result<VerifySummary> {
    let candidates = result_log::read_log(path)?;
    info!(
        candidates = candidates.len(),
        log = %path.display(),
        "verifying candidates with exact arithmetic"
    );

    let mut summary = VerifySummary::default();
    for p in &candidates {
        summary.checked += 1;
        match check_candidate(p, max_base, max_pow) {
            Verdict::Counterexample { c, z } => {
                warn!(
                    a = p.a, x = p.x, b = p.b, y = p.y, c, z,
                    "COUNTEREXAMPLE: {}^{} + {}^{} = {}^{}",
                    p.a, p.x, p.b, p.y, c, z
                );
                summary.counterexamples.push((*p, c, z));
            }
            Verdict::Coincidence => summary.coincidences += 1,
        }
    }
    info!(
        checked = summary.checked,
        coincidences = summary.coincidences,
        counterexamples = summary.counterexamples.len(),
        "verification complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn detects_a_genuine_power_sum() {
        // 3³ + 6³ = 243 = 3⁵. The enumerator would prune it (gcd 3), but
        // the exact checker itself must recognize the equality.
        let p = Point { a: 6, x: 3, b: 3, y: 3 };
        assert_eq!(
            check_candidate(&p, 10, 5),
            Verdict::Counterexample { c: 3, z: 5 }
        );
    }

    #[test]
    fn rejects_a_near_miss() {
        // 7³ + 4⁵ = 1367, prime, certainly no perfect power
        let p = Point { a: 7, x: 3, b: 4, y: 5 };
        assert_eq!(check_candidate(&p, 10, 5), Verdict::Coincidence);
    }

    #[test]
    fn power_outside_rectangle_is_a_coincidence() {
        // 2³ + 2³ = 16 = 2⁴, but z range [3, max_pow] with max_pow = 3
        // excludes z = 4, and 16 is no cube
        let p = Point { a: 2, x: 3, b: 2, y: 3 };
        assert_eq!(check_candidate(&p, 10, 3), Verdict::Coincidence);
    }

    #[test]
    fn base_above_max_base_is_a_coincidence() {
        // 6³ + 3³: c = 3 needs max_base ≥ 3
        let p = Point { a: 6, x: 3, b: 3, y: 3 };
        assert_eq!(check_candidate(&p, 2, 5), Verdict::Coincidence);
    }

    #[test]
    fn verify_log_summarizes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.log");
        std::fs::write(&path, "6 3 3 3\n7 3 4 5\n").unwrap();
        let summary = verify_log(&path, 10, 5).unwrap();
        assert_eq!(summary.checked, 2);
        assert_eq!(summary.coincidences, 1);
        assert_eq!(
            summary.counterexamples,
            vec![(Point { a: 6, x: 3, b: 3, y: 3 }, 3, 5)]
        );
    }
}
