// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The line editor: a single-line, horizontally-scrolling editor over an entry's `options`.
//!
//! Maintains `(first, cursor)` such that `first + cursor` is the character index into the line
//! being edited; `first` is the scroll offset, `cursor` the on-screen column within the visible
//! window. The edited string is never persisted to the filesystem; on a confirmed change it is
//! returned to the caller as a one-boot-only override.

use alloc::string::String;
use ratatui_core::{layout::Position, terminal::Terminal};
use uefi::{
    Event,
    boot::{self, ScopedProtocol},
    proto::console::text::{Input, Key, ScanCode},
};

use crate::{MainError, menu::MenuError, ui::ratatui_backend::UefiBackend};

/// Extra headroom reserved in the buffer beyond the initial string's length.
const EXTRA_CAPACITY: usize = 1024;

/// How many columns to scroll left on a backspace that empties the visible window.
const BACKSPACE_SCROLL: usize = 10;

/// The outcome of a single key handled by the editor.
enum Outcome {
    /// Keep editing.
    Continue,

    /// The user cancelled; discard changes.
    Cancel,

    /// The user confirmed; commit if the text changed.
    Commit,
}

/// A single-line, horizontally-scrolling text editor.
pub struct Editor {
    /// The text being edited.
    buffer: String,

    /// The string the editor started with, to detect whether anything actually changed.
    original: String,

    /// The scroll offset: the character index of the first visible column.
    first: usize,

    /// The on-screen column of the cursor, relative to `first`.
    cursor: usize,

    /// The visible window width, in columns.
    width: usize,

    /// The pending key-press event.
    events: Option<[Event; 1]>,
}

impl Editor {
    /// Creates an editor over `initial`, reserving headroom for further typing.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the [`Input`] protocol was already closed.
    pub fn new(input: &ScopedProtocol<Input>, initial: String) -> Result<Self, MainError> {
        let mut buffer = String::with_capacity(initial.len() + EXTRA_CAPACITY);
        buffer.push_str(&initial);
        let cursor = buffer.chars().count();

        Ok(Self {
            buffer,
            original: initial,
            first: 0,
            cursor,
            width: 76,
            events: Some([input.wait_for_key_event().ok_or(MenuError::InputClosed)?]),
        })
    }

    /// Runs the editor to completion.
    ///
    /// Returns `Some(text)` if the user confirmed a change, `None` if the user cancelled or
    /// confirmed without changing anything.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the terminal could not be drawn or cleared, or reading a key
    /// failed.
    pub fn run(
        &mut self,
        input: &mut ScopedProtocol<Input>,
        terminal: &mut Terminal<UefiBackend>,
    ) -> Result<Option<String>, MainError> {
        if let Ok(size) = terminal.size() {
            self.width = usize::from(size.width.saturating_sub(4)).max(1);
        }
        self.clamp_cursor();

        terminal.clear()?;

        loop {
            self.draw(terminal)?;

            let cursor_col = u16::try_from(self.cursor).unwrap_or(u16::MAX);
            terminal.set_cursor_position(Position::new(cursor_col, 1))?;

            self.wait_for_key();
            let key = input.read_key().map_err(bootctl_core::error::BootError::Uefi)?;

            match self.handle_key(key) {
                Outcome::Continue => {}
                Outcome::Cancel => {
                    terminal.hide_cursor()?;
                    return Ok(None);
                }
                Outcome::Commit => {
                    terminal.hide_cursor()?;
                    return Ok(if self.buffer == self.original {
                        None
                    } else {
                        Some(core::mem::take(&mut self.buffer))
                    });
                }
            }
        }
    }

    fn draw(&self, terminal: &mut Terminal<UefiBackend>) -> Result<(), MainError> {
        let visible: String = self
            .buffer
            .chars()
            .skip(self.first)
            .take(self.width)
            .collect();
        terminal.draw(|f| {
            let paragraph = ratatui_widgets::paragraph::Paragraph::new(visible.as_str());
            f.render_widget(paragraph, f.area());
        })?;
        Ok(())
    }

    fn wait_for_key(&mut self) {
        let Some(events) = &mut self.events else {
            return;
        };
        let _ = boot::wait_for_event(events);
    }

    fn handle_key(&mut self, key: Option<Key>) -> Outcome {
        match key {
            Some(Key::Special(ScanCode::ESCAPE)) => return Outcome::Cancel,
            Some(Key::Special(key)) => self.handle_special_key(key),
            Some(Key::Printable(key)) => self.handle_printable_key(char::from(key)),
            None => {}
        }
        Outcome::Continue
    }

    fn handle_special_key(&mut self, key: ScanCode) {
        match key {
            ScanCode::LEFT => self.move_left(),
            ScanCode::RIGHT => self.move_right(),
            ScanCode::HOME => {
                self.first = 0;
                self.cursor = 0;
            }
            ScanCode::END => self.move_to_end(),
            ScanCode::UP => self.move_to_word_start(),
            ScanCode::DOWN => self.move_to_word_end(),
            ScanCode::DELETE => self.delete_forward(),
            _ => {}
        }
    }

    fn handle_printable_key(&mut self, key: char) -> Outcome {
        match key {
            '\r' => return Outcome::Commit,
            '\x08' => self.backspace(),
            key if !key.is_control() => self.insert(key),
            _ => {}
        }
        Outcome::Continue
    }

    fn index(&self) -> usize {
        self.first + self.cursor
    }

    fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn clamp_cursor(&mut self) {
        let len = self.len();
        if self.index() > len {
            self.first = len.saturating_sub(self.cursor);
        }
    }

    fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        } else if self.first > 0 {
            self.first -= 1;
        }
    }

    fn move_right(&mut self) {
        if self.index() >= self.len() {
            return;
        }
        if self.cursor + 1 < self.width {
            self.cursor += 1;
        } else {
            self.first += 1;
        }
    }

    fn move_to_end(&mut self) {
        let len = self.len();
        if len < self.width {
            self.first = 0;
            self.cursor = len;
        } else {
            self.first = len - self.width + 1;
            self.cursor = self.width - 1;
        }
    }

    fn move_to_word_start(&mut self) {
        let idx = self.index();
        let chars: alloc::vec::Vec<char> = self.buffer.chars().collect();
        let mut i = idx.min(chars.len());
        while i > 0 && chars[i - 1] == ' ' {
            i -= 1;
        }
        while i > 0 && chars[i - 1] != ' ' {
            i -= 1;
        }
        self.set_index(i);
    }

    fn move_to_word_end(&mut self) {
        let idx = self.index();
        let chars: alloc::vec::Vec<char> = self.buffer.chars().collect();
        let mut i = idx.min(chars.len());
        while i < chars.len() && chars[i] != ' ' {
            i += 1;
        }
        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
        self.set_index(i);
    }

    fn set_index(&mut self, idx: usize) {
        if idx < self.first || idx >= self.first + self.width {
            self.first = idx.saturating_sub(self.width / 2);
            self.cursor = idx - self.first;
        } else {
            self.cursor = idx - self.first;
        }
    }

    fn insert(&mut self, c: char) {
        let idx = self.index();
        let byte_idx = self.byte_index(idx);
        self.buffer.insert(byte_idx, c);
        if self.cursor + 1 < self.width {
            self.cursor += 1;
        } else {
            self.first += 1;
        }
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            let idx = self.index() - 1;
            let byte_idx = self.byte_index(idx);
            self.buffer.remove(byte_idx);
            self.cursor -= 1;
        } else if self.first > 0 {
            let byte_idx = self.byte_index(self.first - 1);
            self.buffer.remove(byte_idx);
            self.first = self.first.saturating_sub(BACKSPACE_SCROLL);
        }
    }

    fn delete_forward(&mut self) {
        let idx = self.index();
        if idx < self.len() {
            let byte_idx = self.byte_index(idx);
            self.buffer.remove(byte_idx);
        }
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_idx)
            .map_or(self.buffer.len(), |(b, _)| b)
    }
}
