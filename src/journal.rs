//! Per-run log file.
//!
//! A run that changed or failed something appends a header block and the
//! trace of every outcome that has one. Runs where every mount was already
//! in place write nothing.
use crate::reconcile::MountOutcome;
use log::debug;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const SEPARATOR: &str = "------------------------------------------------------------";

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("could not create log directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write log file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Context printed at the top of each run's block.
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub started: OffsetDateTime,
    pub host: String,
    pub config_path: PathBuf,
}

impl RunHeader {
    pub fn now(config_path: &Path) -> Self {
        RunHeader {
            started: local_now(),
            host: host_name(),
            config_path: config_path.to_path_buf(),
        }
    }
}

/// Local wall-clock time, so dated files roll over at local midnight.
/// Falls back to UTC when the local offset cannot be determined.
fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn host_name() -> String {
    ["COMPUTERNAME", "HOSTNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// Renders the block for one run, or `None` when there is nothing to say.
pub fn render(header: &RunHeader, outcomes: &[MountOutcome]) -> Option<String> {
    if outcomes.iter().all(|o| o.trace.is_empty()) {
        return None;
    }
    let started = header
        .started
        .format(&Rfc3339)
        .unwrap_or_else(|_| header.started.unix_timestamp().to_string());

    let mut out = String::new();
    out.push_str(SEPARATOR);
    out.push('\n');
    out.push_str(&format!("run started: {started}\n"));
    out.push_str(&format!("host: {}\n", header.host));
    out.push_str(&format!("config: {}\n", header.config_path.display()));
    out.push_str(SEPARATOR);
    out.push('\n');
    for outcome in outcomes {
        for line in &outcome.trace {
            out.push_str(&format!("[{}] {line}\n", outcome.drive_letter));
        }
    }
    Some(out)
}

/// Appends run blocks to a dated file inside a log directory.
#[derive(Debug, Clone)]
pub struct Journal {
    dir: PathBuf,
}

impl Journal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Journal { dir: dir.into() }
    }

    pub fn file_for(&self, header: &RunHeader) -> PathBuf {
        self.dir.join(format!("drivesync-{}.log", header.started.date()))
    }

    /// Writes the run if it has anything to report; returns the file written.
    pub fn record(
        &self,
        header: &RunHeader,
        outcomes: &[MountOutcome],
    ) -> Result<Option<PathBuf>, JournalError> {
        let Some(block) = render(header, outcomes) else {
            debug!("nothing to journal");
            return Ok(None);
        };

        fs::create_dir_all(&self.dir).map_err(|source| JournalError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.file_for(header);
        let write = |path: &Path| -> std::io::Result<()> {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(block.as_bytes())
        };
        write(&path).map_err(|source| JournalError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{FailureReason, MountStatus};
    use time::macros::offset;

    fn header() -> RunHeader {
        RunHeader {
            started: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            host: "WS-01".into(),
            config_path: PathBuf::from("drivesync.toml"),
        }
    }

    fn outcome(letter: &str, status: MountStatus, trace: &[&str]) -> MountOutcome {
        MountOutcome {
            drive_letter: letter.parse().unwrap(),
            remote_path: r"\\S\Docs".into(),
            status,
            trace: trace.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn silent_run_renders_nothing() {
        let outcomes = [outcome("Z:", MountStatus::Skipped, &[])];
        assert_eq!(render(&header(), &outcomes), None);
    }

    #[test]
    fn block_has_header_and_prefixed_lines() {
        let outcomes = [
            outcome("Z:", MountStatus::Skipped, &[]),
            outcome(
                "Y:",
                MountStatus::Failed(FailureReason::AttachFailed),
                &["mapping Y: -> \\\\S\\Docs", "Y: failed: could not create mapping"],
            ),
        ];
        let block = render(&header(), &outcomes).unwrap();
        assert!(block.contains("run started: 2023-11-14T22:13:20Z"));
        assert!(block.contains("host: WS-01"));
        assert!(block.contains("config: drivesync.toml"));
        assert!(block.contains("[Y:] Y: failed: could not create mapping"));
        assert!(!block.contains("[Z:]"));
    }

    #[test]
    fn record_creates_directory_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("logs"));
        let outcomes = [outcome("Z:", MountStatus::Mounted, &["Z: successfully mounted to \\\\S\\Docs"])];

        let first = journal.record(&header(), &outcomes).unwrap().unwrap();
        let second = journal.record(&header(), &outcomes).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.file_name().unwrap(), "drivesync-2023-11-14.log");

        let text = fs::read_to_string(&first).unwrap();
        assert_eq!(text.matches("run started:").count(), 2);
    }

    #[test]
    fn file_is_dated_by_the_header_offset() {
        // 2023-11-14T22:13:20Z is already the 15th in UTC+10
        let mut header = header();
        header.started = header.started.to_offset(offset!(+10));
        let journal = Journal::new("logs");
        assert_eq!(
            journal.file_for(&header),
            Path::new("logs").join("drivesync-2023-11-15.log")
        );
        let outcomes = [outcome("Z:", MountStatus::Mounted, &["Z: mounted"])];
        let block = render(&header, &outcomes).unwrap();
        assert!(block.contains("run started: 2023-11-15T08:13:20+10:00"));
    }

    #[test]
    fn now_has_a_usable_offset() {
        let now = local_now();
        let utc = OffsetDateTime::now_utc();
        assert!((utc - now).whole_minutes().abs() < 5);
    }

    #[test]
    fn record_skips_silent_runs() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("logs"));
        let outcomes = [outcome("Z:", MountStatus::Skipped, &[])];
        assert_eq!(journal.record(&header(), &outcomes).unwrap(), None);
        assert!(!dir.path().join("logs").exists());
    }
}
