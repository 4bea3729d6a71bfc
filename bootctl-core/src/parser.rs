// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Parsing of `loader.conf` and `entries/*.conf`, and auto-detection of well-known loaders that
//! have no `.conf` file of their own.

pub mod autodetect;
pub mod entries;
pub mod loader_conf;
