// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `bootctl` menu application.
//!
//! Builds the entry catalog, drives the menu, and chain-loads whatever the menu selects.
//! Because a UEFI application may only return a [`Status`], every unrecoverable failure here
//! panics.

#![no_main]
#![no_std]

extern crate alloc;

use bootctl_core::system::log_backend::UefiLogger;

use ratatui_core::terminal::Terminal;
use thiserror::Error;
use uefi::prelude::*;

use crate::{menu::Menu, ui::ratatui_backend::UefiBackend};

mod editor;
mod menu;
mod ui;

/// The global logging instance.
static LOGGER: UefiLogger = UefiLogger::new();

/// An error that may occur while running the menu application.
#[derive(Error, Debug)]
pub enum MainError {
    /// An error originating in `bootctl-core`.
    #[error("Boot error: {0}")]
    BootError(#[from] bootctl_core::error::BootError),

    /// An error originating in the menu state machine.
    #[error("Menu error: {0}")]
    MenuError(#[from] crate::menu::MenuError),
}

/// Builds the catalog, runs the menu, and chain-loads whatever it selects.
///
/// A successful chain-load never returns, since control transfers to the loaded image.
///
/// # Errors
///
/// May return an `Error` if the catalog could not be built, the terminal backend could not be
/// initialized, or the menu failed to run.
fn main_func() -> Result<(), MainError> {
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(log::LevelFilter::Warn));

    let catalog = bootctl_core::catalog::Catalog::build()?;

    let backend = UefiBackend::new()?;
    let mut terminal = Terminal::new(backend)?;
    let mut menu = Menu::new(catalog)?;

    menu.run(&mut terminal)
}

/// The program's entry point.
///
/// # Panics
///
/// Panics if [`main_func`] returns an error.
#[entry]
fn main() -> Status {
    main_func().unwrap_or_else(|e| panic!("Error occurred while running: {e}"));
    Status::SUCCESS
}
