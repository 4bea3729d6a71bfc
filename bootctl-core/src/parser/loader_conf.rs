// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Parses `/loader/loader.conf`: global defaults for the timeout and default-entry glob.
//!
//! ```text
//! # seconds before the default entry is booted
//! timeout 5
//!
//! # glob, matched against entry ids from the end of the catalog backward
//! default arch-*
//! ```

use alloc::string::{String, ToOwned};
use bootctl_confparser::ConfLines;
use uefi::cstr16;

use crate::{BootResult, system::fs::UefiFileSystem};

/// The path to the loader's global configuration file.
pub const LOADER_CONF_PATH: &uefi::CStr16 = cstr16!("\\loader\\loader.conf");

/// Global defaults read from `loader.conf`.
#[derive(Clone, Debug, Default)]
pub struct LoaderConf {
    /// Timeout in seconds, before the firmware variable override (if any) is applied.
    pub timeout_sec_config: Option<i64>,

    /// Glob pattern (already lowercased) used to pick a default entry when no firmware
    /// variable names one.
    pub default_pattern: Option<String>,
}

impl LoaderConf {
    /// Reads and parses `loader.conf` from the ESP, if present.
    ///
    /// A missing file is not an error: an empty [`LoaderConf`] is returned, matching the
    /// "absent-but-expected" error category.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the file exists but could not be read.
    pub fn load(fs: &mut UefiFileSystem) -> BootResult<Self> {
        if !fs.exists(LOADER_CONF_PATH) {
            return Ok(Self::default());
        }
        let content = fs.read(LOADER_CONF_PATH)?;
        Ok(Self::parse(&content))
    }

    /// Parses the contents of a `loader.conf`-format buffer.
    #[must_use = "Has no effect if the result is unused"]
    pub fn parse(content: &[u8]) -> Self {
        let mut conf = Self::default();
        for (key, value) in ConfLines::new(content) {
            match key {
                "timeout" => {
                    if let Ok(timeout) = value.parse() {
                        conf.timeout_sec_config = Some(timeout);
                    }
                }
                "default" => conf.default_pattern = Some(value.to_ascii_lowercase().to_owned()),
                _ => (),
            }
        }
        conf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timeout_and_default() {
        let content = b"timeout 10\ndefault arch-*\n";
        let conf = LoaderConf::parse(content);
        assert_eq!(conf.timeout_sec_config, Some(10));
        assert_eq!(conf.default_pattern.as_deref(), Some("arch-*"));
    }

    #[test]
    fn default_pattern_is_lowercased() {
        let conf = LoaderConf::parse(b"default ARCH-*\n");
        assert_eq!(conf.default_pattern.as_deref(), Some("arch-*"));
    }

    #[test]
    fn ignores_comments_and_unknown_keys() {
        let conf = LoaderConf::parse(b"# comment\nbogus value\ntimeout 3\n");
        assert_eq!(conf.timeout_sec_config, Some(3));
    }
}
