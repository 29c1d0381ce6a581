use crate::{
    file_finder::{self, DEFAULT_EXTENSION},
    metadata::{self, FileIdentity},
};
use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader, Seek, SeekFrom},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerDesc {
    /// pause after a poll that found no data
    pub poll_interval: Duration,
    /// pause between discovery attempts while no file can be found
    pub retry_interval: Duration,
    /// extension of the files discovery may switch to
    pub extension: String,
    /// switch as soon as a newer matching file appears, not only when the current one vanishes
    pub follow_newest: bool,
}

impl TrackerDesc {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            retry_interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            extension: DEFAULT_EXTENSION.to_string(),
            follow_newest: false,
        }
    }
}

impl Default for TrackerDesc {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one [`FileTracker::poll`] step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    /// a complete line, without its line terminator
    Line(String),
    /// nothing new, same file
    Idle,
    /// the path now names a different file; reading resumes at its end
    Replaced { path: PathBuf },
    /// the file shrank below the read offset; reading restarts from its start
    Truncated { path: PathBuf },
    /// the file can no longer be read; the handle is closed
    Lost { path: PathBuf },
    /// discovery picked another file; reading resumes at its end
    Switched { from: PathBuf, to: PathBuf },
    /// discovery found nothing yet
    Searching,
}

impl TrackerEvent {
    /// How long the caller should wait before polling again.
    pub fn pause(&self, desc: &TrackerDesc) -> Option<Duration> {
        match self {
            TrackerEvent::Idle | TrackerEvent::Truncated { .. } => Some(desc.poll_interval),
            TrackerEvent::Searching => Some(desc.retry_interval),
            _ => None,
        }
    }
}

struct FileCursor {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    identity: FileIdentity,
    pending: Vec<u8>,
}

impl FileCursor {
    fn open_at_end(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let identity = FileIdentity::of(&file.metadata()?);
        let mut reader = BufReader::new(file);

        // only show what gets appended from now on
        let offset = reader.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            offset,
            identity,
            pending: Vec::new(),
        })
    }

    fn rewind(&mut self) -> Result<()> {
        self.offset = self.reader.seek(SeekFrom::Start(0))?;
        self.pending.clear();
        Ok(())
    }

    /// Next complete line, or `None` when only part of a line (or nothing) is there yet.
    fn read_line(&mut self) -> Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.pending)?;
        self.offset += read as u64;

        if !self.pending.ends_with(b"\n") {
            return Ok(None);
        }

        let mut bytes = std::mem::take(&mut self.pending);
        bytes.pop();
        Ok(Some(decode_line(bytes)))
    }

    /// Unterminated tail read so far. Taken before the handle is dropped, so a
    /// last line without a newline still gets shown.
    fn take_pending(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(decode_line(std::mem::take(&mut self.pending)))
    }
}

fn decode_line(mut bytes: Vec<u8>) -> String {
    if bytes.ends_with(b"\r") {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Owns the followed file: which path, which handle, how far it has been read,
/// and which underlying file the path pointed at when it was opened.
///
/// Every [`poll`](FileTracker::poll) first drains the open handle. Only when it
/// has nothing left does the tracker look at the path again, in this order:
/// readability, identity, size, and (when enabled) newer files in the watched
/// directory.
pub struct FileTracker {
    watch_dir: PathBuf,
    cursor: Option<FileCursor>,
    last_path: PathBuf,
    desc: TrackerDesc,
}

impl FileTracker {
    /// Follows `path`, starting at its current end.
    ///
    /// `watch_dir` is where replacements are searched for once the file is
    /// gone; it defaults to the file's parent directory.
    pub fn open(path: &Path, watch_dir: Option<PathBuf>, desc: TrackerDesc) -> Result<Self> {
        let watch_dir = match watch_dir {
            Some(dir) => dir,
            None => path
                .parent()
                .map(Path::to_path_buf)
                .with_context(|| format!("Cannot determine directory for {}", path.display()))?,
        };
        let cursor = FileCursor::open_at_end(path)?;
        log::debug!(
            "FileTracker: following {} from offset {}",
            path.display(),
            cursor.offset
        );

        Ok(Self {
            watch_dir,
            last_path: path.to_path_buf(),
            cursor: Some(cursor),
            desc,
        })
    }

    /// Follows the newest matching file under `watch_dir`.
    pub fn discover(watch_dir: PathBuf, desc: TrackerDesc) -> Result<Self> {
        let path = file_finder::find_latest_matching(&watch_dir, &desc.extension)
            .with_context(|| {
                format!(
                    "No .{} files found in {}",
                    desc.extension,
                    watch_dir.display()
                )
            })?;
        Self::open(&path, Some(watch_dir), desc)
    }

    /// the file currently held open, if any
    pub fn path(&self) -> Option<&Path> {
        self.cursor.as_ref().map(|cursor| cursor.path.as_path())
    }

    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    pub fn offset(&self) -> Option<u64> {
        self.cursor.as_ref().map(|cursor| cursor.offset)
    }

    pub fn desc(&self) -> &TrackerDesc {
        &self.desc
    }

    /// One non-blocking step. Never fails: I/O trouble turns into
    /// [`TrackerEvent::Lost`] and a later re-discovery. A partial last line is
    /// emitted as a [`TrackerEvent::Line`] before the handle is given up.
    pub fn poll(&mut self) -> TrackerEvent {
        let Some(cursor) = self.cursor.as_mut() else {
            return self.rediscover();
        };

        match cursor.read_line() {
            Ok(Some(line)) => TrackerEvent::Line(line),
            Ok(None) => self.check_path(),
            Err(e) => {
                log::debug!("FileTracker: read error on {}: {}", cursor.path.display(), e);
                match cursor.take_pending() {
                    Some(tail) => TrackerEvent::Line(tail),
                    None => self.lose(),
                }
            }
        }
    }

    fn check_path(&mut self) -> TrackerEvent {
        let Some(cursor) = self.cursor.as_mut() else {
            return self.rediscover();
        };

        let current = match metadata::stat_path(&cursor.path) {
            Ok(meta) => meta,
            Err(e) => {
                log::debug!("FileTracker: {} unreadable: {}", cursor.path.display(), e);
                return match cursor.take_pending() {
                    Some(tail) => TrackerEvent::Line(tail),
                    None => self.lose(),
                };
            }
        };

        if current.identity != cursor.identity {
            // the old handle is drained; its unterminated tail goes out first
            if let Some(tail) = cursor.take_pending() {
                return TrackerEvent::Line(tail);
            }
            let path = cursor.path.clone();
            log::debug!("FileTracker: {} replaced in place", path.display());
            return match FileCursor::open_at_end(&path) {
                Ok(reopened) => {
                    self.cursor = Some(reopened);
                    TrackerEvent::Replaced { path }
                }
                Err(e) => {
                    log::debug!("FileTracker: reopen failed: {}", e);
                    self.lose()
                }
            };
        }

        // handle file truncation
        if current.len < cursor.offset {
            log::debug!(
                "FileTracker: {} shrank from {} to {} bytes",
                cursor.path.display(),
                cursor.offset,
                current.len
            );
            return match cursor.rewind() {
                Ok(()) => TrackerEvent::Truncated {
                    path: cursor.path.clone(),
                },
                Err(e) => {
                    log::debug!("FileTracker: rewind failed: {}", e);
                    self.lose()
                }
            };
        }

        if self.desc.follow_newest
            && let Some(newer) = self.newer_file(current.modified)
        {
            return self.switch_to(newer);
        }

        TrackerEvent::Idle
    }

    fn newer_file(&self, current_modified: Option<SystemTime>) -> Option<PathBuf> {
        let latest = file_finder::find_latest_matching(&self.watch_dir, &self.desc.extension)?;
        if self.path() == Some(latest.as_path()) {
            return None;
        }

        let latest_modified = metadata::stat_path(&latest).ok()?.modified?;
        (latest_modified > current_modified?).then_some(latest)
    }

    fn switch_to(&mut self, path: PathBuf) -> TrackerEvent {
        match FileCursor::open_at_end(&path) {
            Ok(cursor) => {
                let from = std::mem::replace(&mut self.last_path, path.clone());
                log::debug!(
                    "FileTracker: switching from {} to {}",
                    from.display(),
                    path.display()
                );
                self.cursor = Some(cursor);
                if from == path {
                    TrackerEvent::Replaced { path }
                } else {
                    TrackerEvent::Switched { from, to: path }
                }
            }
            Err(e) => {
                log::debug!("FileTracker: cannot open {}: {}", path.display(), e);
                self.cursor = None;
                TrackerEvent::Searching
            }
        }
    }

    fn lose(&mut self) -> TrackerEvent {
        // dropping the cursor closes the handle
        let path = match self.cursor.take() {
            Some(cursor) => cursor.path,
            None => self.last_path.clone(),
        };
        TrackerEvent::Lost { path }
    }

    fn rediscover(&mut self) -> TrackerEvent {
        match file_finder::find_latest_matching(&self.watch_dir, &self.desc.extension) {
            Some(path) => self.switch_to(path),
            None => {
                log::debug!(
                    "FileTracker: nothing to follow in {}",
                    self.watch_dir.display()
                );
                TrackerEvent::Searching
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        fs::{self, OpenOptions},
        io::Write,
        time::Duration,
    };

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn age(path: &Path, secs: u64) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_starts_at_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        append(&path, "{\"old\":1}\n{\"old\":2}\n");

        let mut tracker = FileTracker::open(&path, None, TrackerDesc::new()).unwrap();
        assert_eq!(tracker.poll(), TrackerEvent::Idle);
        assert_eq!(tracker.watch_dir(), dir.path());

        append(&path, "{\"new\":3}\n");
        assert_eq!(tracker.poll(), TrackerEvent::Line("{\"new\":3}".to_string()));
        assert_eq!(tracker.poll(), TrackerEvent::Idle);
    }

    #[test]
    fn test_partial_line_waits_for_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        append(&path, "");

        let mut tracker = FileTracker::open(&path, None, TrackerDesc::new()).unwrap();
        append(&path, "{\"msg\":");
        assert_eq!(tracker.poll(), TrackerEvent::Idle);

        append(&path, "\"hi\"}\r\nnext");
        assert_eq!(
            tracker.poll(),
            TrackerEvent::Line("{\"msg\":\"hi\"}".to_string())
        );
        assert_eq!(tracker.poll(), TrackerEvent::Idle);
        assert_eq!(tracker.offset(), Some(18));
    }

    #[cfg(unix)]
    #[test]
    fn test_replaced_file_drains_old_then_resumes_at_new_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        let staged = dir.path().join("a.jsonl.tmp");
        append(&path, "before\n");

        let mut tracker = FileTracker::open(&path, None, TrackerDesc::new()).unwrap();
        append(&path, "last old line\n");
        append(&staged, "already in new file\n");
        fs::rename(&staged, &path).unwrap();

        assert_eq!(tracker.poll(), TrackerEvent::Line("last old line".to_string()));
        assert_eq!(
            tracker.poll(),
            TrackerEvent::Replaced { path: path.clone() }
        );
        assert_eq!(tracker.poll(), TrackerEvent::Idle);

        append(&path, "fresh\n");
        assert_eq!(tracker.poll(), TrackerEvent::Line("fresh".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_unterminated_tail_is_emitted_before_replacement() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        let staged = dir.path().join("a.jsonl.tmp");
        append(&path, "");

        let mut tracker = FileTracker::open(&path, None, TrackerDesc::new()).unwrap();
        append(&path, "{\"last\":1}");
        append(&staged, "");
        fs::rename(&staged, &path).unwrap();

        assert_eq!(tracker.poll(), TrackerEvent::Line("{\"last\":1}".to_string()));
        assert_eq!(
            tracker.poll(),
            TrackerEvent::Replaced { path: path.clone() }
        );
        assert_eq!(tracker.poll(), TrackerEvent::Idle);
    }

    #[cfg(unix)]
    #[test]
    fn test_unterminated_tail_is_emitted_before_loss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        append(&path, "");

        let mut tracker = FileTracker::open(&path, None, TrackerDesc::new()).unwrap();
        append(&path, "tail\r");
        fs::remove_file(&path).unwrap();

        assert_eq!(tracker.poll(), TrackerEvent::Line("tail".to_string()));
        assert_eq!(tracker.poll(), TrackerEvent::Lost { path: path.clone() });
        assert_eq!(tracker.path(), None);
    }

    #[test]
    fn test_truncated_file_restarts_from_beginning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        append(&path, "a fairly long line that will be truncated away\n");

        let mut tracker = FileTracker::open(&path, None, TrackerDesc::new()).unwrap();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(0)
            .unwrap();
        append(&path, "short\n");

        let truncated = tracker.poll();
        assert_eq!(truncated, TrackerEvent::Truncated { path: path.clone() });
        assert_eq!(
            truncated.pause(tracker.desc()),
            Some(tracker.desc().poll_interval)
        );
        assert_eq!(tracker.poll(), TrackerEvent::Line("short".to_string()));
    }

    #[test]
    fn test_deleted_file_switches_to_newest_match() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.jsonl");
        let second = dir.path().join("second.jsonl");
        append(&first, "one\n");

        let mut tracker = FileTracker::open(&first, None, TrackerDesc::new()).unwrap();
        fs::remove_file(&first).unwrap();
        append(&second, "history that must not replay\n");

        assert_eq!(tracker.poll(), TrackerEvent::Lost { path: first.clone() });
        assert_eq!(tracker.path(), None);
        assert_eq!(
            tracker.poll(),
            TrackerEvent::Switched {
                from: first.clone(),
                to: second.clone()
            }
        );
        assert_eq!(tracker.poll(), TrackerEvent::Idle);

        append(&second, "two\n");
        assert_eq!(tracker.poll(), TrackerEvent::Line("two".to_string()));
    }

    #[test]
    fn test_searches_until_a_file_appears() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.jsonl");
        append(&first, "");

        let desc = TrackerDesc::new();
        let mut tracker = FileTracker::open(&first, None, desc.clone()).unwrap();
        fs::remove_file(&first).unwrap();

        assert_eq!(tracker.poll(), TrackerEvent::Lost { path: first.clone() });
        let searching = tracker.poll();
        assert_eq!(searching, TrackerEvent::Searching);
        assert_eq!(searching.pause(&desc), Some(desc.retry_interval));

        // non-matching files are never picked up
        append(&dir.path().join("notes.txt"), "nope\n");
        assert_eq!(tracker.poll(), TrackerEvent::Searching);

        let later = dir.path().join("nested").join("later.jsonl");
        fs::create_dir_all(later.parent().unwrap()).unwrap();
        append(&later, "");
        assert_eq!(
            tracker.poll(),
            TrackerEvent::Switched {
                from: first,
                to: later
            }
        );
    }

    #[test]
    fn test_recreated_same_path_counts_as_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        append(&path, "x\n");

        let mut tracker = FileTracker::open(&path, None, TrackerDesc::new()).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(tracker.poll(), TrackerEvent::Lost { path: path.clone() });

        append(&path, "recreated\n");
        assert_eq!(tracker.poll(), TrackerEvent::Replaced { path: path.clone() });
        append(&path, "y\n");
        assert_eq!(tracker.poll(), TrackerEvent::Line("y".to_string()));
    }

    #[test]
    fn test_follow_newest_switches_while_old_file_still_exists() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.jsonl");
        let new = dir.path().join("new.jsonl");
        append(&old, "x\n");
        age(&old, 60);

        let mut desc = TrackerDesc::new();
        desc.follow_newest = true;
        let mut tracker = FileTracker::open(&old, None, desc).unwrap();
        assert_eq!(tracker.poll(), TrackerEvent::Idle);

        append(&new, "y\n");
        assert_eq!(
            tracker.poll(),
            TrackerEvent::Switched {
                from: old.clone(),
                to: new.clone()
            }
        );
        assert_eq!(tracker.path(), Some(new.as_path()));
    }

    #[test]
    fn test_without_follow_newest_stays_on_current_file() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.jsonl");
        append(&old, "x\n");
        age(&old, 60);

        let mut tracker = FileTracker::open(&old, None, TrackerDesc::new()).unwrap();
        append(&dir.path().join("new.jsonl"), "y\n");
        assert_eq!(tracker.poll(), TrackerEvent::Idle);
        assert_eq!(tracker.path(), Some(old.as_path()));
    }

    #[test]
    fn test_open_and_discover_failures() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.jsonl");
        assert!(FileTracker::open(&missing, None, TrackerDesc::new()).is_err());

        let err = FileTracker::discover(dir.path().to_path_buf(), TrackerDesc::new())
            .err()
            .unwrap();
        assert!(err.to_string().contains("No .jsonl files found"));
    }
}
