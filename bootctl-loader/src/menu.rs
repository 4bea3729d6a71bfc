// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The menu state machine.
//!
//! Drives the entry list, the countdown, and the handful of single-key commands described in
//! the menu's component design, and hands control to the line editor or the diagnostic dump
//! when asked to.

use alloc::{format, string::String, vec::Vec};
use log::error;
use ratatui_core::terminal::Terminal;
use thiserror::Error;
use uefi::{
    Event,
    boot::{self, ScopedProtocol, TimerTrigger},
    proto::console::text::{Input, Key, ScanCode},
};

use bootctl_core::{
    catalog::Catalog,
    fw_vars::{self, LOADER_CONFIG_TIMEOUT, LOADER_ENTRY_DEFAULT, LOADER_ENTRY_SELECTED},
    system::helper::{create_timer, locate_protocol},
};

use crate::{
    MainError,
    editor::Editor,
    ui::{entry_list::EntryList, ratatui_backend::UefiBackend, theme::Theme},
};

/// Ticks per second of the countdown timer (the spec requires a 10 Hz refresh).
const TICKS_PER_SECOND: i64 = 10;

/// The timer interval, in 100ns units, for a 10 Hz countdown.
const TIMER_INTERVAL: u64 = 1_000_000;

/// How long to stall after a failed boot attempt, in microseconds, so the error is visible.
const ERROR_DELAY: usize = 5_000_000;

/// An `Error` that may result from running the [`Menu`].
#[derive(Error, Debug)]
pub enum MenuError {
    /// The [`Input`] protocol was closed for any reason.
    #[error("Keyboard input protocol was closed")]
    InputClosed,

    /// There are no boot entries in the catalog.
    #[error("No boot entries found")]
    NoEntries,
}

/// The state of the menu, as described in the menu's component design.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    /// Waiting for a keystroke; the countdown is not running (either it was cancelled, or there
    /// never was one).
    Showing,

    /// The countdown is active; any keystroke cancels it permanently for this session.
    CountingDown,

    /// The line editor has control.
    Editing,

    /// Exiting: return the selected entry to the caller for chain-loading.
    ExitingBoot,

    /// Exiting: abort without booting anything.
    ExitingQuit,
}

/// The menu: entry list, countdown, and the command set operating on them.
pub struct Menu {
    /// The entry catalog.
    pub catalog: Catalog,

    /// The on-screen entry list.
    pub list: EntryList,

    /// The keyboard input protocol.
    pub input: ScopedProtocol<Input>,

    /// The pending key/timer events.
    events: Option<[Event; 2]>,

    /// The color scheme.
    pub theme: Theme,

    /// The current state.
    pub state: MenuState,

    /// Remaining tenths of a second in the countdown, if active.
    remaining_ticks: i64,

    /// Transient feedback shown on the status line.
    pub status: Option<String>,
}

impl Menu {
    /// Builds the menu from a freshly built [`Catalog`].
    ///
    /// # Errors
    ///
    /// May return an `Error` if there is no handle supporting [`Input`], or the catalog has no
    /// entries at all.
    pub fn new(catalog: Catalog) -> Result<Self, MainError> {
        if catalog.entries.is_empty() {
            return Err(MenuError::NoEntries.into());
        }

        let list = EntryList::new(&catalog);
        let input = locate_protocol::<Input>()?;
        let timeout = catalog.timeout_sec();

        let (state, remaining_ticks) = if timeout == 0 {
            (MenuState::ExitingBoot, 0)
        } else if timeout > 0 {
            (MenuState::CountingDown, timeout.saturating_mul(TICKS_PER_SECOND))
        } else {
            (MenuState::Showing, 0)
        };

        Ok(Self {
            catalog,
            list,
            input,
            events: None,
            theme: Theme::new(),
            state,
            remaining_ticks,
            status: None,
        })
    }

    /// Runs the menu to completion.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the terminal could not be drawn, or the keyboard input was
    /// closed.
    pub fn run(&mut self, terminal: &mut Terminal<UefiBackend>) -> Result<(), MainError> {
        self.init_state(terminal)?;

        loop {
            match self.state {
                MenuState::ExitingQuit => break,
                MenuState::ExitingBoot => {
                    self.boot(terminal)?;
                    continue;
                }
                MenuState::Editing => {
                    self.run_editor(terminal)?;
                    continue;
                }
                MenuState::Showing | MenuState::CountingDown => {}
            }

            self.draw(terminal)?;
            self.wait_for_events()?;
            self.handle_key(terminal)?;
        }

        Ok(())
    }

    /// The entry currently selected by the highlight, if any.
    #[must_use = "Has no effect if the result is unused"]
    pub fn selected(&self) -> Option<&bootctl_core::entry::Entry> {
        self.list
            .state
            .selected()
            .and_then(|i| self.catalog.entries.get(i))
    }

    /// Returns true while the countdown is active.
    #[must_use = "Has no effect if the result is unused"]
    pub fn countdown_active(&self) -> bool {
        self.state == MenuState::CountingDown
    }

    /// The whole seconds remaining in the countdown.
    #[must_use = "Has no effect if the result is unused"]
    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_ticks.div_euclid(TICKS_PER_SECOND).max(0)
    }

    fn init_state(&mut self, terminal: &mut Terminal<UefiBackend>) -> Result<(), MainError> {
        terminal.clear()?;
        self.create_events()?;
        Ok(())
    }

    fn create_events(&mut self) -> Result<(), MainError> {
        self.events = Some([
            self.input
                .wait_for_key_event()
                .ok_or(MenuError::InputClosed)?,
            create_timer(TimerTrigger::Periodic(TIMER_INTERVAL))?,
        ]);
        Ok(())
    }

    fn wait_for_events(&mut self) -> Result<(), MainError> {
        let Some(events) = &mut self.events else {
            return Ok(());
        };

        match boot::wait_for_event(events) {
            Ok(1) => self.tick(),
            Ok(_) => {}
            Err(e) => {
                error!("{e}");
                self.events.take();
                self.create_events()?;
            }
        }
        Ok(())
    }

    fn tick(&mut self) {
        if self.state != MenuState::CountingDown {
            return;
        }
        self.remaining_ticks -= 1;
        if self.remaining_ticks <= 0 {
            self.state = MenuState::ExitingBoot;
        }
    }

    /// Cancels the countdown permanently for this session, as any keystroke must.
    fn cancel_countdown(&mut self) {
        if self.state == MenuState::CountingDown {
            self.state = MenuState::Showing;
        }
    }

    fn handle_key(&mut self, terminal: &mut Terminal<UefiBackend>) -> Result<(), MainError> {
        let key = self
            .input
            .read_key()
            .map_err(bootctl_core::error::BootError::Uefi)?;
        self.cancel_countdown();
        match key {
            Some(Key::Special(key)) => self.handle_special_key(key),
            Some(Key::Printable(key)) => self.handle_printable_key(char::from(key), terminal)?,
            _ => {}
        }
        Ok(())
    }

    fn handle_special_key(&mut self, key: ScanCode) {
        match key {
            ScanCode::UP => self.list.state.select_previous(),
            ScanCode::DOWN => self.list.state.select_next(),
            ScanCode::HOME => self.list.state.select_first(),
            ScanCode::END => self.list.state.select_last(),
            ScanCode::PAGE_UP => self.page(-1),
            ScanCode::PAGE_DOWN => self.page(1),
            ScanCode::FUNCTION_1 => self.show_key_reference(),
            _ => {}
        }
    }

    fn page(&mut self, direction: i32) {
        let len = self.list.items.len();
        if len == 0 {
            return;
        }
        let visible: i32 = 10; // matches the fixed list height reserved in the layout
        let current = i32::try_from(self.list.state.selected().unwrap_or(0)).unwrap_or(0);
        let last = i32::try_from(len - 1).unwrap_or(0);
        let target = (current + visible * direction).clamp(0, last);
        self.list
            .state
            .select(usize::try_from(target).ok());
    }

    fn handle_printable_key(
        &mut self,
        key: char,
        terminal: &mut Terminal<UefiBackend>,
    ) -> Result<(), MainError> {
        match key {
            '\r' => self.state = MenuState::ExitingBoot,
            'q' | 'Q' => self.state = MenuState::ExitingQuit,
            'd' | 'D' => self.toggle_default(),
            '+' | '=' => self.adjust_timeout(1),
            '-' | '_' => self.adjust_timeout(-1),
            'e' | 'E' => self.state = MenuState::Editing,
            'v' | 'V' => self.show_version(),
            '*' => self.show_diagnostics(terminal)?,
            _ => {}
        }
        Ok(())
    }

    fn toggle_default(&mut self) {
        let Some(idx) = self.list.state.selected() else {
            return;
        };
        let idx_i64 = i64::try_from(idx).unwrap_or(-1);
        if self.catalog.idx_default_efivar == idx_i64 {
            let _ = fw_vars::set(LOADER_ENTRY_DEFAULT, "", true);
            self.catalog.idx_default_efivar = -1;
            self.status = Some(String::from("Cleared persistent default boot entry."));
        } else {
            let id = self.catalog.entries[idx].id.clone();
            if fw_vars::set(LOADER_ENTRY_DEFAULT, &id, true).is_ok() {
                self.catalog.idx_default_efivar = idx_i64;
                self.status = Some(format!("Set \"{id}\" as the default boot entry."));
            }
        }
    }

    fn adjust_timeout(&mut self, delta: i64) {
        let current = self.catalog.timeout_sec();
        let new = current + delta;
        if new <= 0 && delta < 0 {
            let _ = fw_vars::set(LOADER_CONFIG_TIMEOUT, "", true);
            self.catalog.timeout_sec_efivar = None;
            self.status = Some(String::from("Timeout cleared."));
        } else if fw_vars::set_int(LOADER_CONFIG_TIMEOUT, new, true).is_ok() {
            self.catalog.timeout_sec_efivar = Some(new);
            self.status = Some(format!("Timeout set to {new} seconds."));
        }
    }

    fn show_version(&mut self) {
        self.status = Some(format!("bootctl {}", env!("CARGO_PKG_VERSION")));
    }

    fn show_key_reference(&mut self) {
        self.status = Some(String::from(
            "Up/Down select  Home/End ends  PgUp/PgDn page  Enter boot  q quit  d default  +/- timeout  e edit  v version  * diagnostics",
        ));
    }

    /// Dumps diagnostic state to the console, one page at a time; any key dismisses a page.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the terminal could not be drawn or cleared.
    fn show_diagnostics(&mut self, terminal: &mut Terminal<UefiBackend>) -> Result<(), MainError> {
        let pages = self.diagnostic_pages();
        for page in pages {
            terminal.clear()?;
            terminal.draw(|f| {
                let paragraph = ratatui_widgets::paragraph::Paragraph::new(page.as_str());
                f.render_widget(paragraph, f.area());
            })?;
            self.wait_for_any_key()?;
        }
        terminal.clear()?;
        Ok(())
    }

    fn diagnostic_pages(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push(own_image_path_summary());
        lines.push(firmware_summary());
        lines.push(String::from("Catalog:"));
        for entry in &self.catalog.entries {
            lines.push(format!(
                "  {} - {} ({:?}) {}",
                entry.id, entry.title_shown, entry.kind, entry.loader_path
            ));
        }

        const LINES_PER_PAGE: usize = 15;
        lines
            .chunks(LINES_PER_PAGE)
            .map(|chunk| chunk.join("\n"))
            .collect()
    }

    fn wait_for_any_key(&mut self) -> Result<(), MainError> {
        let Some(event) = self.input.wait_for_key_event() else {
            return Err(MenuError::InputClosed.into());
        };
        let mut events = [event];
        let _ = boot::wait_for_event(&mut events);
        let _ = self.input.read_key();
        Ok(())
    }

    fn run_editor(&mut self, terminal: &mut Terminal<UefiBackend>) -> Result<(), MainError> {
        let Some(idx) = self.list.state.selected() else {
            self.state = MenuState::Showing;
            return Ok(());
        };
        let initial = self.catalog.entries[idx].options.clone();

        let mut editor = Editor::new(&self.input, initial)?;
        let result = editor.run(&mut self.input, terminal)?;

        terminal.clear()?;

        match result {
            Some(new_options) => {
                self.catalog.options_edit = Some(new_options);
                self.state = MenuState::ExitingBoot;
            }
            None => self.state = MenuState::Showing,
        }

        Ok(())
    }

    /// Persists the selection and chain-loads it.
    ///
    /// A successful start never returns: control transfers to the loaded image. A recoverable
    /// failure resets the state back to [`MenuState::Showing`] and redisplays the menu.
    ///
    /// # Errors
    ///
    /// Propagates the failure if the firmware's policy rejection (access denied or a security
    /// violation) makes it non-retriable for the session.
    fn boot(&mut self, terminal: &mut Terminal<UefiBackend>) -> Result<(), MainError> {
        let Some(entry) = self.selected().cloned() else {
            self.state = MenuState::Showing;
            return Ok(());
        };
        self.persist_selection();

        match bootctl_core::chain_loader::load_and_start(
            &entry,
            self.catalog.options_edit.as_deref(),
        ) {
            Ok(()) => Ok(()), // unreachable on success: control transferred to the loaded image
            Err(bootctl_core::error::BootError::Uefi(e))
                if bootctl_core::chain_loader::is_policy_fatal(e.status()) =>
            {
                Err(MainError::BootError(bootctl_core::error::BootError::Uefi(e)))
            }
            Err(e) => {
                terminal.backend_mut().reset_color();
                error!("{e}");
                boot::stall(ERROR_DELAY);
                self.state = MenuState::Showing;
                self.catalog.options_edit = None;
                terminal.clear()?;
                Ok(())
            }
        }
    }

    /// Writes `LoaderEntrySelected` before returning control to the caller.
    fn persist_selection(&self) {
        if let Some(entry) = self.selected() {
            let _ = fw_vars::set(LOADER_ENTRY_SELECTED, &entry.id, true);
        }
    }
}

fn own_image_path_summary() -> String {
    use uefi::proto::loaded_image::LoadedImage;
    let Ok(loaded_image) = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle())
    else {
        return String::from("Image path: <unavailable>");
    };
    let Some(device_path) = loaded_image.file_path() else {
        return String::from("Image path: <unavailable>");
    };
    bootctl_core::system::helper::device_path_to_text(device_path).map_or_else(
        |_| String::from("Image path: <unavailable>"),
        |text| format!("Image path: {}", &*text),
    )
}

fn firmware_summary() -> String {
    format!(
        "Firmware: {} rev {:#x}",
        uefi::system::firmware_vendor(),
        uefi::system::firmware_revision()
    )
}
