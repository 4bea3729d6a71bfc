// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The `bootctl-core` library crate.
//!
//! This implements the firmware half of bootctl: the entry catalog (discovery, parsing,
//! de-duplication, natural-version sort, and default selection of `loader/entries/*.conf`), the
//! loader's UEFI variable namespace, and the chain-loader that starts the selected image.
//!
//! The interactive menu frontend lives in `bootctl-loader`, which depends on this crate.
//!
//! ## MSRV
//!
//! The minimum supported rust version is 1.88.0.

#![cfg_attr(not(any(fuzzing, test, doctest)), no_std)]

/// The primary result type that wraps around [`crate::error::BootError`].
pub type BootResult<T> = Result<T, crate::error::BootError>;

pub mod catalog;
pub mod chain_loader;
pub mod entry;
pub mod error;
pub mod fw_vars;
pub mod parser;
pub mod system;

extern crate alloc;
