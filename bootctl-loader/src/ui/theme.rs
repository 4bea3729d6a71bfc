// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`Theme`], the fixed color scheme for the menu.
//!
//! `loader.conf` carries no color keys, so unlike the theming this is adapted from, the scheme
//! here is not configurable: white on black, with a reverse-video highlight for the selected
//! entry.

use ratatui_core::style::{Color as RatatuiColor, Style};

/// The color scheme of the UI.
#[derive(Clone, Copy)]
pub struct Theme {
    /// The color scheme for everything except the highlighted entry.
    pub base: Style,

    /// The color scheme for the highlighted entry.
    pub highlight: Style,
}

impl Theme {
    /// The default (and only) theme.
    #[must_use = "Has no effect if the result is unused"]
    pub const fn new() -> Self {
        Self {
            base: Style::new()
                .fg(RatatuiColor::White)
                .bg(RatatuiColor::Black),
            highlight: Style::new()
                .fg(RatatuiColor::Black)
                .bg(RatatuiColor::White),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}
