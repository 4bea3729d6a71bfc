// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Installs, updates, or removes a UEFI boot manager from an EFI System Partition.
#[derive(Parser, Debug)]
#[command(name = "setup", version, about)]
pub struct Args {
    /// Path to the mounted EFI System Partition.
    #[arg(long, default_value = "/boot")]
    pub path: PathBuf,

    /// Don't touch `Boot####`/`BootOrder` firmware variables.
    #[arg(long)]
    pub no_variables: bool,

    /// Which operation to perform.
    #[command(subcommand)]
    pub verb: Option<Verb>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Report installed binaries and firmware boot entries.
    Status,
    /// Install the boot loader for the first time.
    Install,
    /// Update an already-installed boot loader.
    Update,
    /// Remove the boot loader and its firmware boot entry.
    Remove,
}

impl Default for Verb {
    fn default() -> Self {
        Self::Status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
