use anyhow::Result;
use jsonlview_render::Painter;
use jsonlview_tracker::{FileTracker, TrackerEvent};
use std::{
    io::Write,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

// longest uninterrupted sleep, so Ctrl-C is noticed quickly
const NAP_SLICE_MS: u64 = 50;

/// Live view: prints whatever the tracker yields until interrupted.
pub struct Follower<W> {
    tracker: FileTracker,
    painter: Painter,
    out: W,
}

impl<W: Write> Follower<W> {
    pub fn new(tracker: FileTracker, painter: Painter, out: W) -> Self {
        Self {
            tracker,
            painter,
            out,
        }
    }

    pub fn write_banner(&mut self) -> Result<()> {
        writeln!(self.out, "Following log with beautiful formatting...")?;
        writeln!(self.out, "Press Ctrl+C to stop")?;
        writeln!(self.out, "===========================================")?;
        if let Some(path) = self.tracker.path() {
            writeln!(self.out, "Monitoring: {}", path.display())?;
        }
        writeln!(
            self.out,
            "Monitoring directory: {}",
            self.tracker.watch_dir().display()
        )?;
        self.out.flush()?;
        Ok(())
    }

    /// Handles one tracker event and returns how long to wait before the next.
    pub fn step(&mut self) -> Result<Option<Duration>> {
        let event = self.tracker.poll();
        match &event {
            TrackerEvent::Line(line) => self.painter.paint_line(&mut self.out, line)?,
            TrackerEvent::Replaced { path } => writeln!(
                self.out,
                "\nDetected new log file, switching to: {}",
                path.display()
            )?,
            TrackerEvent::Truncated { path } => writeln!(
                self.out,
                "\nLog file truncated, reading from the start: {}",
                path.display()
            )?,
            TrackerEvent::Lost { .. } => {
                writeln!(self.out, "\nLog file rotated, finding new log file...")?
            }
            TrackerEvent::Switched { to, .. } => {
                writeln!(self.out, "Switching to new log file: {}", to.display())?
            }
            TrackerEvent::Idle | TrackerEvent::Searching => {}
        }
        self.out.flush()?;
        Ok(event.pause(self.tracker.desc()))
    }

    /// Loops until `stop` is raised. The tracker, and the file it holds open,
    /// is released when the follower is dropped.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::Relaxed) {
            if let Some(pause) = self.step()? {
                nap(pause, stop);
            }
        }
        log::debug!("Follower: stop requested");
        Ok(())
    }

    pub fn tracker(&self) -> &FileTracker {
        &self.tracker
    }

    pub fn output(&self) -> &W {
        &self.out
    }
}

fn nap(duration: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(NAP_SLICE_MS)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonlview_render::TimeShift;
    use jsonlview_tracker::TrackerDesc;
    use std::{
        fs::{self, OpenOptions},
        path::Path,
        sync::Arc,
    };

    fn append(path: &Path, text: &str) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn follower(path: &Path) -> Follower<Vec<u8>> {
        let tracker = FileTracker::open(path, None, TrackerDesc::new()).unwrap();
        Follower::new(tracker, Painter::new(false, TimeShift::default()), Vec::new())
    }

    fn text(follower: &Follower<Vec<u8>>) -> String {
        String::from_utf8(follower.output().clone()).unwrap()
    }

    #[test]
    fn test_banner_names_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        append(&path, "");

        let mut follower = follower(&path);
        follower.write_banner().unwrap();
        let out = text(&follower);
        assert!(out.contains(&format!("Monitoring: {}", path.display())));
        assert!(out.contains(&format!("Monitoring directory: {}", dir.path().display())));
    }

    #[test]
    fn test_only_new_lines_are_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        append(&path, "{\"type\":\"history\"}\n");

        let mut follower = follower(&path);
        assert_eq!(follower.step().unwrap(), Some(TrackerDesc::new().poll_interval));

        append(&path, "{\"type\":\"live\",\"msg\":\"hi\"}\nplain\n");
        assert_eq!(follower.step().unwrap(), None);
        assert_eq!(follower.step().unwrap(), None);

        let out = text(&follower);
        assert!(!out.contains("history"));
        assert!(out.contains("\n[No timestamp] [live]\n  msg: hi\n"));
        assert!(out.contains("📄 Raw Line: plain\n"));
    }

    #[test]
    fn test_rotation_notices() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.jsonl");
        let second = dir.path().join("second.jsonl");
        append(&first, "");

        let mut follower = follower(&first);
        fs::remove_file(&first).unwrap();
        append(&second, "");

        follower.step().unwrap();
        follower.step().unwrap();
        append(&second, "{\"type\":\"after\"}\n");
        follower.step().unwrap();

        let out = text(&follower);
        assert!(out.contains("Log file rotated, finding new log file..."));
        assert!(out.contains(&format!("Switching to new log file: {}", second.display())));
        assert!(out.contains("[No timestamp] [after]"));
        assert_eq!(follower.tracker().path(), Some(second.as_path()));
    }

    #[test]
    fn test_truncation_notice_then_pause() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        append(&path, "{\"type\":\"a long line that gets cut\"}\n");

        let mut follower = follower(&path);
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(0)
            .unwrap();

        assert_eq!(follower.step().unwrap(), Some(TrackerDesc::new().poll_interval));
        assert!(text(&follower).contains(&format!(
            "Log file truncated, reading from the start: {}",
            path.display()
        )));
    }

    #[test]
    fn test_run_stops_on_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        append(&path, "");

        let stop = Arc::new(AtomicBool::new(false));
        let writer = {
            let stop = stop.clone();
            let path = path.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                append(&path, "{\"type\":\"late\"}\n");
                thread::sleep(Duration::from_millis(400));
                stop.store(true, Ordering::Relaxed);
            })
        };

        let mut follower = follower(&path);
        follower.run(&stop).unwrap();
        writer.join().unwrap();

        assert!(text(&follower).contains("[No timestamp] [late]"));
    }

    #[test]
    fn test_nap_returns_early_when_stopped() {
        let stop = AtomicBool::new(true);
        let started = Instant::now();
        nap(Duration::from_secs(5), &stop);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
