// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! System re-exports

pub mod fs;
pub mod global_allocator;
pub mod helper;
pub mod log_backend;
pub mod panic_handler;
pub mod time;
