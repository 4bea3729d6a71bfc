// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`EntryList`], which renders a [`Catalog`]'s entries with ratatui.

use alloc::{string::String, vec::Vec};
use bootctl_core::catalog::Catalog;
use ratatui_widgets::list::ListState;

/// The UI frontend for a [`Catalog`]'s entries.
pub struct EntryList {
    /// The titles shown for each entry, in catalog order.
    pub items: Vec<String>,

    /// The current highlight/scroll state.
    pub state: ListState,
}

impl EntryList {
    /// Builds an [`EntryList`] from `catalog`, with the catalog's selected default highlighted.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(catalog: &Catalog) -> Self {
        let items = catalog
            .entries
            .iter()
            .map(|e| e.title_shown.clone())
            .collect();
        let mut state = ListState::default();
        state.select(Some(catalog.idx_default));
        Self { items, state }
    }
}
