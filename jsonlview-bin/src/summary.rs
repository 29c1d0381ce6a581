use anyhow::Result;
use chrono::NaiveDateTime;
use jsonlview_render::{LogRecord, TimeShift, timestamp::format_full};
use std::io::Write;

const RULE_WIDTH: usize = 50;

/// Overview shown before the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSummary {
    /// every line counts, JSON or not
    pub total_events: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub total_pages: usize,
}

impl LogSummary {
    pub fn from_lines(lines: &[String], shift: &TimeShift, page_size: usize) -> Self {
        let mut start: Option<NaiveDateTime> = None;
        let mut end: Option<NaiveDateTime> = None;

        let shifted = lines
            .iter()
            .filter_map(|line| LogRecord::parse(line))
            .filter_map(|record| record.timestamp())
            .filter_map(|raw| shift.apply(&raw));
        for time in shifted {
            start = Some(start.map_or(time, |s| s.min(time)));
            end = Some(end.map_or(time, |e| e.max(time)));
        }

        Self {
            total_events: lines.len(),
            start,
            end,
            total_pages: lines.len().div_ceil(page_size.max(1)),
        }
    }

    pub fn write_to(&self, out: &mut impl Write) -> Result<()> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(out, "{}", rule)?;
        writeln!(out, "Log summary:")?;
        writeln!(out, "  Events: {}", self.total_events)?;
        writeln!(out, "  Start time: {}", format_bound(self.start.as_ref()))?;
        writeln!(out, "  End time: {}", format_bound(self.end.as_ref()))?;
        writeln!(out, "  Pages: {}", self.total_pages)?;
        writeln!(out, "{}", rule)?;
        writeln!(out)?;
        Ok(())
    }
}

fn format_bound(time: Option<&NaiveDateTime>) -> String {
    time.map(format_full).unwrap_or_else(|| "N/A".to_string())
}
