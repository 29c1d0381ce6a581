use crate::{
    keys::{Key, KeySource},
    summary::LogSummary,
};
use anyhow::Result;
use jsonlview_render::{LogRecord, Painter};
use std::{
    io::Write,
    sync::atomic::{AtomicBool, Ordering},
};

const START_PROMPT: &str = "Press 'c' to view the log content, 'q' to quit: ";
const MORE_PROMPT: &str =
    "--More--(space: next page, Enter: jump to next timestamp, 'q': quit): ";
const PAGING_HELP: &str = "Space turns the page, Enter jumps to the next timestamp, 'q' quits";
const END_OF_FILE: &str = "End of file.";
const END_OF_FILE_REACHED: &str = "End of file reached.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerState {
    AwaitingStart,
    ShowingPage,
    AwaitingPageInput,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerExit {
    Quit,
    EndOfFile,
    Interrupted,
}

impl PagerExit {
    /// Line printed once the pager has returned, unless it was interrupted.
    pub fn closing_notice(self) -> Option<&'static str> {
        match self {
            PagerExit::Quit | PagerExit::EndOfFile => Some(END_OF_FILE_REACHED),
            PagerExit::Interrupted => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    /// index of the next line to show
    pub cursor: usize,
    pub page_size: usize,
}

/// "more"-style pager over lines already loaded in memory.
pub struct Pager<'a, K, W> {
    lines: &'a [String],
    keys: K,
    out: W,
    painter: Painter,
    page: PageState,
    state: PagerState,
    exit: Option<PagerExit>,
    interrupt: Option<&'a AtomicBool>,
}

impl<'a, K: KeySource, W: Write> Pager<'a, K, W> {
    pub fn new(lines: &'a [String], keys: K, out: W, painter: Painter, page_size: usize) -> Self {
        Self {
            lines,
            keys,
            out,
            painter,
            page: PageState {
                cursor: 0,
                page_size: page_size.max(1),
            },
            state: PagerState::AwaitingStart,
            exit: None,
            interrupt: None,
        }
    }

    /// Stop at the next transition once `flag` is raised.
    pub fn with_interrupt(mut self, flag: &'a AtomicBool) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn state(&self) -> PagerState {
        self.state
    }

    pub fn page(&self) -> PageState {
        self.page
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Runs until `Done`.
    pub fn run(&mut self) -> Result<PagerExit> {
        while self.state != PagerState::Done {
            if self.interrupt.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                self.finish(PagerExit::Interrupted);
                break;
            }
            self.step()?;
        }
        self.out.flush()?;
        Ok(self.exit.unwrap_or(PagerExit::EndOfFile))
    }

    /// Performs one state transition.
    pub fn step(&mut self) -> Result<()> {
        log::debug!("Pager: {:?} at line {}", self.state, self.page.cursor);
        match self.state {
            PagerState::AwaitingStart => self.await_start(),
            PagerState::ShowingPage => self.show_page(),
            PagerState::AwaitingPageInput => self.await_page_input(),
            PagerState::Done => Ok(()),
        }
    }

    fn await_start(&mut self) -> Result<()> {
        LogSummary::from_lines(self.lines, &self.painter.shift, self.page.page_size)
            .write_to(&mut self.out)?;

        match self.prompt(START_PROMPT)? {
            Key::Interrupt => {
                self.finish(PagerExit::Interrupted);
                return Ok(());
            }
            Key::Char('q') | Key::Char('Q') => {
                writeln!(self.out, "Exiting...")?;
                self.finish(PagerExit::Quit);
                return Ok(());
            }
            Key::Char('c') | Key::Char('C') => {}
            _ => writeln!(self.out, "Continuing...")?,
        }

        writeln!(self.out, "Formatting log content...")?;
        writeln!(self.out, "{}", PAGING_HELP)?;
        writeln!(self.out, "===========================================")?;
        self.state = PagerState::ShowingPage;
        Ok(())
    }

    fn show_page(&mut self) -> Result<()> {
        let mut shown = 0;
        while self.page.cursor < self.lines.len() && shown < self.page.page_size {
            self.painter
                .paint_line(&mut self.out, &self.lines[self.page.cursor])?;
            self.page.cursor += 1;
            shown += 1;
        }

        if self.page.cursor >= self.lines.len() {
            self.end_of_file()
        } else {
            self.state = PagerState::AwaitingPageInput;
            Ok(())
        }
    }

    fn await_page_input(&mut self) -> Result<()> {
        match self.prompt(MORE_PROMPT)? {
            Key::Interrupt => self.finish(PagerExit::Interrupted),
            Key::Char('q') | Key::Char('Q') => {
                writeln!(self.out, "Exiting...")?;
                self.finish(PagerExit::Quit);
            }
            Key::Enter => return self.jump_to_next_entry(),
            // space and every other key turn the page
            _ => self.state = PagerState::ShowingPage,
        }
        Ok(())
    }

    fn jump_to_next_entry(&mut self) -> Result<()> {
        match find_next_entry(self.lines, self.page.cursor) {
            Some(index) => {
                self.painter.paint_line(&mut self.out, &self.lines[index])?;
                self.page.cursor = index + 1;
                self.state = PagerState::ShowingPage;
                Ok(())
            }
            None => {
                self.page.cursor = self.lines.len();
                self.end_of_file()
            }
        }
    }

    fn prompt(&mut self, text: &str) -> Result<Key> {
        write!(self.out, "{}", text)?;
        self.out.flush()?;
        let key = self.keys.read_key()?;
        writeln!(self.out)?;
        Ok(key)
    }

    fn end_of_file(&mut self) -> Result<()> {
        writeln!(self.out, "{}", END_OF_FILE)?;
        self.finish(PagerExit::EndOfFile);
        Ok(())
    }

    fn finish(&mut self, exit: PagerExit) {
        log::debug!("Pager: done ({:?})", exit);
        self.exit = Some(exit);
        self.state = PagerState::Done;
    }
}

/// First line at or after `from` that is a JSON object carrying `timestamp`,
/// `time` or `type`, whatever their values.
pub fn find_next_entry(lines: &[String], from: usize) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, line)| LogRecord::parse(line).is_some_and(|record| record.has_header_key()))
        .map(|(index, _)| index)
}
