//! # ResultLog — Append-Only Candidate Persistence
//!
//! The coordinator's single durable artifact: one candidate per line, four
//! ASCII decimal integers `a x b y`, space-separated, newline-terminated.
//!
//! The file is opened in append mode exactly once and synced after each
//! batch, so a coordinator crash loses at most the batch being written.
//! Batches are formatted into one buffer and written with a single
//! `write_all`, keeping concurrent completions from interleaving lines
//! (the coordinator additionally serializes appends under its state mutex).

use anyhow::{bail, Context, Result};
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::cursor::Point;

pub struct ResultLog {
    file: File,
}

impl ResultLog {
    /// Open (creating if absent) the log at `path` for appending.
    pub fn open(path: &Path) -> Result<ResultLog> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening result log {}", path.display()))?;
        Ok(ResultLog { file })
    }

    /// Wrap an already-open handle. The caller is responsible for having
    /// opened it in append mode; a handle without write access makes the
    /// first non-empty `append` fail.
    pub fn from_file(file: File) -> ResultLog {
        ResultLog { file }
    }

    /// Append a batch of candidates and sync to disk.
    pub fn append(&mut self, candidates: &[Point]) -> Result<()> {
        if candidates.is_empty() {
            return Ok(());
        }
        let mut buf = String::with_capacity(candidates.len() * 16);
        for p in candidates {
            // one line per candidate: "a x b y\n"
            let _ = writeln!(buf, "{} {} {} {}", p.a, p.x, p.b, p.y);
        }
        self.file
            .write_all(buf.as_bytes())
            .context("appending to result log")?;
        self.file.sync_data().context("syncing result log")?;
        Ok(())
    }
}

/// Parse a result log back into candidate points, for verification runs
/// and tests. Line numbers in errors are 1-based.
pub fn read_log(path: &Path) -> Result<Vec<Point>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading result log {}", path.display()))?;
    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_ascii_whitespace().collect();
        if fields.len() != 4 {
            bail!(
                "result log {}:{}: expected 4 fields, got {}",
                path.display(),
                lineno + 1,
                fields.len()
            );
        }
        let mut nums = [0u32; 4];
        for (slot, field) in nums.iter_mut().zip(&fields) {
            *slot = field.parse().with_context(|| {
                format!("result log {}:{}: bad integer", path.display(), lineno + 1)
            })?;
        }
        out.push(Point {
            a: nums[0],
            x: nums[1],
            b: nums[2],
            y: nums[3],
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn points() -> Vec<Point> {
        vec![
            Point { a: 7, x: 3, b: 4, y: 5 },
            Point { a: 7, x: 5, b: 5, y: 3 },
        ]
    }

    #[test]
    fn append_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.log");
        let mut log = ResultLog::open(&path).unwrap();
        log.append(&points()).unwrap();
        assert_eq!(read_log(&path).unwrap(), points());
    }

    #[test]
    fn line_format_is_space_separated_decimal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.log");
        let mut log = ResultLog::open(&path).unwrap();
        log.append(&points()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "7 3 4 5\n7 5 5 3\n");
    }

    #[test]
    fn reopen_appends_rather_than_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.log");
        {
            let mut log = ResultLog::open(&path).unwrap();
            log.append(&points()[..1]).unwrap();
        }
        {
            let mut log = ResultLog::open(&path).unwrap();
            log.append(&points()[1..]).unwrap();
        }
        assert_eq!(read_log(&path).unwrap(), points());
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.log");
        let mut log = ResultLog::open(&path).unwrap();
        log.append(&[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn append_to_read_only_handle_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.log");
        std::fs::write(&path, "").unwrap();
        let mut log = ResultLog::from_file(File::open(&path).unwrap());
        assert!(log.append(&points()).is_err());
        // nothing landed
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn read_rejects_malformed_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.log");
        std::fs::write(&path, "7 3 4\n").unwrap();
        assert!(read_log(&path).is_err());
        std::fs::write(&path, "7 3 4 x\n").unwrap();
        assert!(read_log(&path).is_err());
    }
}
