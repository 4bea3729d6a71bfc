// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The user interface of the menu.
//!
//! The overall design is very heavily inspired by text-only bootloaders like Microsoft's bootmgr
//! and systemd-boot: a centered list of entries, a status line for transient feedback, a
//! countdown line, and a one-line key reference at the bottom. The architecture is built on
//! ratatui, targeting a custom [`ratatui_backend::UefiBackend`] over the UEFI text-out protocol.

use alloc::format;
use ratatui_core::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::Style,
    terminal::Terminal,
    text::{Line, Span, Text},
    widgets::{StatefulWidget, Widget},
};
use ratatui_widgets::{
    block::Block,
    borders::Borders,
    list::{List, ListItem},
    paragraph::Paragraph,
};
use tinyvec::ArrayVec;

use crate::{MainError, menu::Menu, ui::ratatui_backend::UefiBackend};

mod widget;

pub mod entry_list;
pub mod ratatui_backend;
pub mod theme;

/// Minimum width reserved for the entry list, regardless of title length.
const MIN_LINE_WIDTH: u16 = 20;

impl Menu {
    /// Draws a frame to the screen.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the widgets could not be drawn to the screen.
    pub fn draw(&mut self, terminal: &mut Terminal<UefiBackend>) -> Result<(), MainError> {
        terminal.draw(|f| f.render_widget(self, f.area()))?;
        Ok(())
    }

    /// The width reserved for the entry list: the longest title, clamped between
    /// [`MIN_LINE_WIDTH`] and the screen width.
    #[must_use = "Has no effect if the result is unused"]
    pub fn line_width(&self) -> u16 {
        let longest = self
            .list
            .items
            .iter()
            .map(|t| u16::try_from(t.chars().count()).unwrap_or(u16::MAX))
            .max()
            .unwrap_or(0);
        longest.max(MIN_LINE_WIDTH)
    }

    /// Renders the entry list.
    pub fn render_list(&mut self, area: Rect, buf: &mut Buffer) {
        let list = List::new(self.list.items.iter().map(|x| ListItem::new(x.as_str())))
            .style(self.theme.base)
            .highlight_style(self.theme.highlight)
            .highlight_symbol("> ");

        StatefulWidget::render(list, area, buf, &mut self.list.state);
    }

    /// Renders the program name and version in a bordered header.
    pub fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let header_block = Block::default()
            .borders(Borders::ALL)
            .style(Style::default());
        let header = Paragraph::new(Text::styled(
            concat!("bootctl ", env!("CARGO_PKG_VERSION")),
            self.theme.base,
        ))
        .alignment(Alignment::Center)
        .block(header_block);

        Widget::render(header, area, buf);
    }

    /// Renders the countdown line, if the countdown has not been cancelled.
    pub fn render_timeout(&self, area: Rect, buf: &mut Buffer) {
        let mut text = Line::raw(" ")
            .style(self.theme.base)
            .alignment(Alignment::Center);
        if self.countdown_active() {
            text.push_span(format!("Boot in {} seconds.", self.remaining_seconds()));
        }
        Widget::render(text, area, buf);
    }

    /// Renders the transient status line (confirmations, version banner, errors).
    pub fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let line = self.status.as_deref().map_or_else(
            || Line::raw(" "),
            |s| Line::raw(s).style(self.theme.base),
        );
        Widget::render(line.alignment(Alignment::Center), area, buf);
    }

    /// Renders the one-line key reference at the bottom of the screen.
    pub fn render_help(&self, area: Rect, buf: &mut Buffer) {
        const KEYS: [(&str, &str); 8] = [
            (" ↑/↓ ", " Select "),
            (" Home/End ", " Ends "),
            (" PgUp/PgDn ", " Page "),
            (" Return ", " Boot "),
            (" q ", " Quit "),
            (" d ", " Default "),
            (" +/- ", " Timeout "),
            (" e ", " Edit "),
        ];

        let mut spans: ArrayVec<[Span; 20]> = ArrayVec::new();
        for (key, desc) in &KEYS {
            spans.push(Span::styled(*key, self.theme.highlight));
            spans.push(Span::styled(*desc, self.theme.base));
        }

        Line::default()
            .spans(spans)
            .centered()
            .style(Style::default())
            .render(area, buf);
    }
}
