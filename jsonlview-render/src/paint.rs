use crate::{
    entry::{INDENT_WIDTH, RenderedLine, render_entry},
    record::LogRecord,
    timestamp::TimeShift,
};
use anyhow::Result;
use crossterm::{
    queue,
    style::{Print, ResetColor, SetForegroundColor},
};
use std::io::Write;

pub const RAW_LINE_MARKER: &str = "📄 Raw Line: ";

/// Writes rendered lines to a terminal-like sink.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    pub color: bool,
    pub shift: TimeShift,
}

impl Painter {
    pub fn new(color: bool, shift: TimeShift) -> Self {
        Self { color, shift }
    }

    /// Renders `raw` as a record when it is JSON, otherwise passes it through.
    pub fn paint_line(&self, out: &mut impl Write, raw: &str) -> Result<()> {
        match LogRecord::parse(raw) {
            Some(record) => self.paint_entry(out, &record),
            None => self.paint_raw_line(out, raw),
        }
    }

    /// A blank separator line, then the entry.
    pub fn paint_entry(&self, out: &mut impl Write, record: &LogRecord) -> Result<()> {
        writeln!(out)?;
        for line in render_entry(record, &self.shift) {
            self.paint_rendered(out, &line)?;
        }
        Ok(())
    }

    pub fn paint_raw_line(&self, out: &mut impl Write, raw: &str) -> Result<()> {
        let raw = raw.strip_suffix('\n').unwrap_or(raw);
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        writeln!(out, "{}{}", RAW_LINE_MARKER, raw)?;
        Ok(())
    }

    pub fn paint_rendered(&self, out: &mut impl Write, line: &RenderedLine) -> Result<()> {
        queue!(out, Print(" ".repeat(line.indent * INDENT_WIDTH)))?;
        for span in &line.spans {
            match span.color {
                Some(color) if self.color => {
                    queue!(
                        out,
                        SetForegroundColor(color),
                        Print(&span.text),
                        ResetColor
                    )?;
                }
                _ => queue!(out, Print(&span.text))?,
            }
        }
        queue!(out, Print("\n"))?;
        Ok(())
    }
}

impl Default for Painter {
    fn default() -> Self {
        Self::new(true, TimeShift::default())
    }
}
