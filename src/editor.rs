// editor.rs

use crate::history::{CursorMove, History};
use bytes::{BufMut, BytesMut};
use std::io::{self, Read, Write};
use tracing::trace;

const ESC: u8 = 0x1b;
const BACKSPACE: u8 = 0x08;
const DELETE: u8 = 0x7f;

const ERASE_CHAR: &[u8] = b"\x08 \x08";
const CLEAR_LINE: &[u8] = b"\x1b[2K\r";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Up,
    Down,
    Byte(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Normal,
    Escape,
    Bracket,
}

/// Turns raw terminal bytes into keys. Only `ESC [ A` and `ESC [ B` are
/// understood; any other escape sequence is swallowed up to the byte that
/// broke it.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    state: State,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match (self.state, byte) {
            (State::Normal, b'\n' | b'\r') => Some(Key::Enter),
            (State::Normal, DELETE | BACKSPACE) => Some(Key::Backspace),
            (State::Normal, ESC) => {
                self.state = State::Escape;
                None
            }
            (State::Normal, b) => Some(Key::Byte(b)),
            (State::Escape, b'[') => {
                self.state = State::Bracket;
                None
            }
            (State::Bracket, b'A') => {
                self.state = State::Normal;
                Some(Key::Up)
            }
            (State::Bracket, b'B') => {
                self.state = State::Normal;
                Some(Key::Down)
            }
            (state, b) => {
                trace!(?state, byte = b, "dropping unsupported escape sequence");
                self.state = State::Normal;
                None
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    Eof,
}

/// Byte-at-a-time line editor with history recall on the arrow keys.
pub struct LineEditor<R, W> {
    input: R,
    output: W,
    max_len: usize,
    pending: BytesMut,
}

impl<R: Read, W: Write> LineEditor<R, W> {
    /// `max_len` counts a terminator slot, so lines hold at most `max_len - 1` bytes.
    pub fn new(input: R, output: W, max_len: usize) -> Self {
        Self {
            input,
            output,
            max_len,
            pending: BytesMut::with_capacity(max_len),
        }
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }

    /// Reads one line. The prompt must already be on screen; it is only
    /// reprinted when history recall redraws the line.
    pub fn read_line(&mut self, prompt: &str, history: &mut History) -> io::Result<ReadOutcome> {
        self.pending.clear();
        history.reset_cursor();
        let mut decoder = KeyDecoder::new();

        loop {
            let Some(byte) = self.next_byte()? else {
                return Ok(ReadOutcome::Eof);
            };
            let Some(key) = decoder.feed(byte) else {
                continue;
            };
            match key {
                Key::Enter => {
                    self.output.write_all(b"\n")?;
                    self.output.flush()?;
                    // Lines are text from here on; undecodable bytes become U+FFFD.
                    let line = String::from_utf8_lossy(&self.pending).into_owned();
                    return Ok(ReadOutcome::Line(line));
                }
                Key::Backspace => self.erase_last()?,
                Key::Up => {
                    if let CursorMove::Moved(index) = history.move_back() {
                        self.recall(prompt, history, index)?;
                    }
                }
                Key::Down => match history.move_forward() {
                    CursorMove::Moved(index) => self.recall(prompt, history, index)?,
                    CursorMove::Cleared => {
                        self.pending.clear();
                        self.redraw(prompt)?;
                    }
                    CursorMove::Unchanged => {}
                },
                Key::Byte(b) => {
                    if self.pending.len() < self.max_len.saturating_sub(1) {
                        self.pending.put_u8(b);
                        self.output.write_all(&[b])?;
                        self.output.flush()?;
                    }
                }
            }
        }
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn erase_last(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        // Drop UTF-8 continuation bytes along with their lead byte.
        let mut end = self.pending.len() - 1;
        while end > 0 && (self.pending[end] & 0xc0) == 0x80 {
            end -= 1;
        }
        self.pending.truncate(end);
        self.output.write_all(ERASE_CHAR)?;
        self.output.flush()
    }

    fn recall(&mut self, prompt: &str, history: &History, index: usize) -> io::Result<()> {
        self.pending.clear();
        if let Some(entry) = history.entry_at(index) {
            let keep = entry.len().min(self.max_len.saturating_sub(1));
            self.pending.extend_from_slice(&entry.as_bytes()[..keep]);
        }
        self.redraw(prompt)
    }

    fn redraw(&mut self, prompt: &str) -> io::Result<()> {
        self.output.write_all(CLEAR_LINE)?;
        self.output.write_all(prompt.as_bytes())?;
        self.output.write_all(&self.pending)?;
        self.output.flush()
    }
}
