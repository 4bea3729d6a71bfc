// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The error taxonomy for the host-side installer.

use std::path::PathBuf;

/// An `Error` that may occur while probing, reading, or writing installer state.
#[derive(thiserror::Error, Debug)]
pub enum InstallError {
    /// A filesystem operation on `path` failed.
    #[error("{path}: {source}")]
    Io {
        /// The path the failing operation was performed on.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `path` is not the root of an EFI System Partition, with a diagnostic naming which check
    /// failed.
    #[error("{path}: {reason}")]
    NotEsp {
        /// The path that failed validation.
        path: PathBuf,
        /// Which check failed and why.
        reason: &'static str,
    },

    /// A `Boot####` variable, `BootOrder`, or `LoaderInfo` marker was present but malformed.
    #[error("malformed record: {0}")]
    MalformedRecord(&'static str),

    /// No free `Boot####` slot could be allocated (all 65536 are in use).
    #[error("no free boot variable slot")]
    NoFreeSlot,
}

impl InstallError {
    /// Wraps `source` with the path that was being operated on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A convenience alias for this crate's fallible operations.
pub type InstallResult<T> = Result<T, InstallError>;
