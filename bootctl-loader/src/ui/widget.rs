// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Menu widget layout.

use ratatui_core::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    widgets::Widget,
};

use crate::menu::Menu;

impl Widget for &mut Menu {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let vertical = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        let width = self.line_width();
        let horizontal = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

        self.render_header(vertical[0], buf);
        self.render_list(horizontal[1], buf);
        self.render_status(vertical[2], buf);
        self.render_timeout(vertical[3], buf);
        self.render_help(vertical[4], buf);
    }
}
