// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Extracts and compares the `#### LoaderInfo: <product> <version> ####` marker embedded in
//! every loader binary, used to decide whether an update would overwrite a newer install.

use std::fs;
use std::path::Path;

use bootctl_confparser::natural_cmp;
use core::cmp::Ordering;

use crate::error::{InstallError, InstallResult};

const MARKER_PREFIX: &str = "#### LoaderInfo: ";
const MARKER_SUFFIX: &str = " ####";

/// A parsed `LoaderInfo` marker, split into product and version at the first space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderInfo {
    pub product: String,
    pub version: String,
}

impl LoaderInfo {
    /// Splits a raw marker string (`"<product> <version>"`) into its two halves.
    #[must_use = "Has no effect if the result is unused"]
    pub fn parse(marker: &str) -> Option<Self> {
        let (product, version) = marker.split_once(' ')?;
        Some(Self {
            product: product.to_string(),
            version: version.trim_start().to_string(),
        })
    }

    /// Compares two markers the way the installer decides whether to skip a copy: product
    /// names are compared for equality, versions by natural version comparison.
    #[must_use = "Has no effect if the result is unused"]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        if self.product != other.product {
            return None;
        }
        Some(natural_cmp(&self.version, &other.version))
    }
}

/// Reads `path` and extracts its `LoaderInfo` marker, if present.
///
/// Returns `Ok(None)` if the file carries no marker at all, which is not an error: a binary
/// with no version information is simply treated as unversioned.
///
/// # Errors
///
/// Returns [`InstallError::MalformedRecord`] if a marker prefix is found with no matching
/// suffix, or an I/O error if the file could not be read.
pub fn read_marker(path: &Path) -> InstallResult<Option<LoaderInfo>> {
    let bytes = fs::read(path).map_err(|e| InstallError::io(path, e))?;
    let content = String::from_utf8_lossy(&bytes);

    let Some(after_prefix) = content.find(MARKER_PREFIX).map(|i| &content[i + MARKER_PREFIX.len()..])
    else {
        return Ok(None);
    };

    let Some(end) = after_prefix.find(MARKER_SUFFIX) else {
        return Err(InstallError::MalformedRecord("LoaderInfo marker has no closing ####"));
    };

    let marker = &after_prefix[..end];
    if marker.len() < 3 {
        return Err(InstallError::MalformedRecord("LoaderInfo marker too short"));
    }

    Ok(LoaderInfo::parse(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_product_and_version() {
        let info = LoaderInfo::parse("gummiboot 48").unwrap();
        assert_eq!(info.product, "gummiboot");
        assert_eq!(info.version, "48");
    }

    #[test]
    fn different_products_do_not_compare() {
        let a = LoaderInfo::parse("gummiboot 48").unwrap();
        let b = LoaderInfo::parse("systemd-boot 250").unwrap();
        assert_eq!(a.compare(&b), None);
    }

    #[test]
    fn newer_version_orders_greater() {
        let a = LoaderInfo::parse("gummiboot 48").unwrap();
        let b = LoaderInfo::parse("gummiboot 9").unwrap();
        assert_eq!(a.compare(&b), Some(Ordering::Greater));
    }
}
