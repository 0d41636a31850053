//! Size- and trigger-rotated log file
//!
//! [`RotatingFile`] is a cheaply cloneable handle to a single append-only log
//! file. Every clone writes through the same mutex, so one `write` call is
//! one record and records never interleave. Rotation swaps the backing file
//! under that same mutex: the current file is renamed to a timestamped
//! archive next to it and a fresh file is opened at the original path.
//!
//! # Archive naming
//!
//! ```text
//! logs/fileserver.log                          <- active file
//! logs/fileserver-2024-05-01T10-15-30.250.log  <- archive
//! logs/fileserver-2024-05-01T10-15-30.250-1.log <- same-millisecond archive
//! ```
//!
//! The timestamp is UTC and is also what age-based pruning reads back.

use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::fmt::MakeWriter;

const ARCHIVE_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
/// Length of a rendered `ARCHIVE_TIME_FORMAT` timestamp
const ARCHIVE_TIME_LEN: usize = 23;

const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Log sink errors
#[derive(Error, Debug)]
pub enum LogSinkError {
    #[error("Failed to open log file {path}: {source}")]
    Init {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to rotate log file {path}: {source}")]
    Rotate {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// When archives are created and how long they are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate before a write would push the file past this size. 0 disables.
    pub max_size_bytes: u64,
    /// Archives to keep, newest first. 0 keeps all.
    pub max_backups: usize,
    /// Archives older than this are removed. 0 disables.
    pub max_age_days: u64,
}

impl RotationPolicy {
    /// Build a policy with the size expressed in megabytes
    pub fn from_megabytes(max_size_mb: u64, max_backups: usize, max_age_days: u64) -> Self {
        Self {
            max_size_bytes: max_size_mb.saturating_mul(BYTES_PER_MEGABYTE),
            max_backups,
            max_age_days,
        }
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::from_megabytes(5, 3, 28)
    }
}

/// Outcome of a rotation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rotation {
    /// The active file was archived at this path
    Archived(PathBuf),
    /// The active file was empty; nothing to archive
    Skipped,
}

struct ActiveFile {
    file: File,
    size: u64,
}

struct Shared {
    path: PathBuf,
    policy: RotationPolicy,
    active: Mutex<ActiveFile>,
}

/// Append-only log file with rotation
///
/// Implements [`MakeWriter`] so it can back a `tracing_subscriber` fmt layer
/// directly.
#[derive(Clone)]
pub struct RotatingFile {
    shared: Arc<Shared>,
}

impl RotatingFile {
    /// Open (or create) the log file, creating its directory first
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Self, LogSinkError> {
        let path = path.into();
        let init_error = |source| LogSinkError::Init {
            path: path.display().to_string(),
            source,
        };

        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(init_error)?;
        }

        let file = open_append(&path).map_err(init_error)?;
        let size = file.metadata().map_err(init_error)?.len();

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                policy,
                active: Mutex::new(ActiveFile { file, size }),
            }),
        })
    }

    /// Path of the active log file
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Rotation policy in effect
    pub fn policy(&self) -> RotationPolicy {
        self.shared.policy
    }

    /// Bytes written to the active file so far
    pub fn current_size(&self) -> u64 {
        self.shared.active.lock().size
    }

    /// Archive the active file and start a new one
    ///
    /// Rotating an empty file does nothing, so repeated triggers without
    /// intervening writes leave a single archive. If the swap fails the
    /// previous handle keeps receiving writes.
    pub fn rotate(&self) -> Result<Rotation, LogSinkError> {
        let rotation = {
            let mut active = self.shared.active.lock();
            if active.size == 0 {
                return Ok(Rotation::Skipped);
            }
            self.swap_locked(&mut active)?
        };
        self.prune_archives();
        Ok(Rotation::Archived(rotation))
    }

    /// Flush the active file
    pub fn flush(&self) -> io::Result<()> {
        self.shared.active.lock().file.flush()
    }

    /// Archives belonging to this log file, newest first
    pub fn archives(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .list_archives()?
            .into_iter()
            .map(|(path, _)| path)
            .collect())
    }

    fn append(&self, buf: &[u8]) -> io::Result<()> {
        let rotated = {
            let mut active = self.shared.active.lock();
            let max = self.shared.policy.max_size_bytes;
            let would_exceed = max > 0 && active.size + buf.len() as u64 > max;

            let rotated = if would_exceed && active.size > 0 {
                match self.swap_locked(&mut active) {
                    Ok(_) => true,
                    Err(e) => {
                        // The sink cannot log about itself without re-entering this lock.
                        eprintln!("log rotation failed, continuing with current file: {}", e);
                        false
                    }
                }
            } else {
                false
            };

            active.file.write_all(buf)?;
            active.size += buf.len() as u64;
            rotated
        };

        if rotated {
            self.prune_archives();
        }
        Ok(())
    }

    /// Rename the active file to a fresh archive name and reopen the original path.
    fn swap_locked(&self, active: &mut ActiveFile) -> Result<PathBuf, LogSinkError> {
        let path = &self.shared.path;
        let rotate_error = |source| LogSinkError::Rotate {
            path: path.display().to_string(),
            source,
        };

        active.file.flush().map_err(rotate_error)?;

        let archive = self.next_archive_path();
        fs::rename(path, &archive).map_err(rotate_error)?;

        match open_append(path) {
            Ok(file) => {
                active.file = file;
                active.size = 0;
                crate::metrics::record_rotation(true);
                Ok(archive)
            }
            Err(e) => {
                // Put the old file back so the handle we keep matches the path.
                let _ = fs::rename(&archive, path);
                crate::metrics::record_rotation(false);
                Err(rotate_error(e))
            }
        }
    }

    fn next_archive_path(&self) -> PathBuf {
        let (stem, ext) = self.name_parts();
        let dir = self.dir();
        let stamp = Utc::now().format(ARCHIVE_TIME_FORMAT).to_string();

        let mut candidate = dir.join(format!("{}-{}{}", stem, stamp, ext));
        let mut n = 1;
        while candidate.exists() {
            candidate = dir.join(format!("{}-{}-{}{}", stem, stamp, n, ext));
            n += 1;
        }
        candidate
    }

    fn prune_archives(&self) {
        let policy = self.shared.policy;
        if policy.max_backups == 0 && policy.max_age_days == 0 {
            return;
        }

        let archives = match self.list_archives() {
            Ok(archives) => archives,
            Err(e) => {
                eprintln!("failed to list log archives: {}", e);
                return;
            }
        };

        let cutoff = if policy.max_age_days > 0 {
            i64::try_from(policy.max_age_days)
                .ok()
                .and_then(chrono::Duration::try_days)
                .and_then(|age| Utc::now().checked_sub_signed(age))
        } else {
            None
        };

        for (index, (path, stamp)) in archives.iter().enumerate() {
            let over_count = policy.max_backups > 0 && index >= policy.max_backups;
            let too_old = cutoff.is_some_and(|cutoff| *stamp < cutoff);
            if over_count || too_old {
                if let Err(e) = fs::remove_file(path) {
                    eprintln!("failed to remove log archive {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Archives with their embedded timestamps, newest first
    fn list_archives(&self) -> io::Result<Vec<(PathBuf, DateTime<Utc>)>> {
        let (stem, ext) = self.name_parts();
        let prefix = format!("{}-", stem);
        let mut archives = Vec::new();

        for entry in fs::read_dir(self.dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(stamp) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(ext.as_str()))
                .and_then(parse_archive_stamp)
            else {
                continue;
            };
            archives.push((entry.path(), stamp));
        }

        // Same-millisecond archives are ordered by their collision index.
        archives.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(archives
            .into_iter()
            .map(|(path, stamp)| (path, stamp.time))
            .collect())
    }

    fn dir(&self) -> PathBuf {
        match self.shared.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// File stem and extension (with its leading dot, or empty)
    fn name_parts(&self) -> (String, String) {
        let path = &self.shared.path;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (stem, ext)
    }
}

/// Position of an archive in rotation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct ArchiveStamp {
    time: DateTime<Utc>,
    /// `-n` collision suffix, 0 when absent
    seq: u32,
}

/// Parse `<timestamp>[-n]` from the middle of an archive name
fn parse_archive_stamp(rest: &str) -> Option<ArchiveStamp> {
    let stamp = rest.get(..ARCHIVE_TIME_LEN)?;
    let suffix = &rest[ARCHIVE_TIME_LEN..];
    let seq = if suffix.is_empty() {
        0
    } else {
        let digits = suffix.strip_prefix('-')?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()?
    };
    let time = NaiveDateTime::parse_from_str(stamp, ARCHIVE_TIME_FORMAT)
        .ok()?
        .and_utc();
    Some(ArchiveStamp { time, seq })
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl Write for &RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.shared.active.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingFile {
    type Writer = &'a RotatingFile;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

impl std::fmt::Debug for RotatingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFile")
            .field("path", &self.shared.path)
            .field("policy", &self.shared.policy)
            .finish()
    }
}
