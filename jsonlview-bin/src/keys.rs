use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    /// Ctrl-C pressed while the terminal was in raw mode
    Interrupt,
    Other,
}

impl From<KeyEvent> for Key {
    fn from(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('C')
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Key::Interrupt
            }
            KeyCode::Enter => Key::Enter,
            KeyCode::Char('\n') | KeyCode::Char('\r') => Key::Enter,
            KeyCode::Char(c) => Key::Char(c),
            _ => Key::Other,
        }
    }
}

/// Source of single key presses for the pager.
pub trait KeySource {
    /// Block until one key is pressed.
    fn read_key(&mut self) -> Result<Key>;
}

/// Reads keys from the controlling terminal, one at a time.
pub struct TerminalKeys;

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> Result<Key> {
        let _raw = RawModeGuard::acquire()?;
        loop {
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                return Ok(Key::from(key));
            }
        }
    }
}

/// Raw mode for as long as the guard lives; dropped on every exit path.
struct RawModeGuard;

impl RawModeGuard {
    fn acquire() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}
