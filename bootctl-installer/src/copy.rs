// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Copies loader binaries from the installed package tree onto the EFI System Partition.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::{set_file_times, FileTime};
use log::{info, warn};

use crate::error::{InstallError, InstallResult};
use crate::loader_info;

/// Directory loader binaries are installed from.
pub const SOURCE_DIR: &str = "/usr/lib/gummiboot";

/// Copies `from` onto `to`, atomically, skipping by version when `force` is `false`.
///
/// `force == true` is a first install: the destination is always overwritten, and a missing
/// destination directory is an error. `force == false` is an update: the source's `LoaderInfo`
/// marker is compared against the destination's, the copy is skipped if the destination is
/// equal-or-newer or belongs to a different product, and a missing destination directory is a
/// silent no-op rather than an error.
///
/// # Errors
///
/// Propagates I/O errors from any step other than a missing destination directory during an
/// update.
pub fn copy_file(from: &Path, to: &Path, force: bool) -> InstallResult<()> {
    if !force {
        if let Some(reason) = skip_reason(from, to)? {
            info!("Skipping {}: {reason}", to.display());
            return Ok(());
        }
    }

    let tmp = sibling_with_suffix(to, "~");

    let result = (|| -> InstallResult<()> {
        fs::copy(from, &tmp).map_err(|e| InstallError::io(&tmp, e))?;

        let meta = fs::metadata(from).map_err(|e| InstallError::io(from, e))?;
        let atime = FileTime::from_last_access_time(&meta);
        let mtime = FileTime::from_last_modification_time(&meta);
        set_file_times(&tmp, atime, mtime).map_err(|e| InstallError::io(&tmp, e))?;

        fs::rename(&tmp, to).map_err(|e| InstallError::io(to, e))?;
        Ok(())
    })();

    if let Err(ref e) = result {
        let _ = fs::remove_file(&tmp);

        if !force {
            if let InstallError::Io { source, .. } = e {
                if source.kind() == io::ErrorKind::NotFound {
                    return Ok(());
                }
            }
        }
    } else {
        info!("Copied {} to {}.", from.display(), to.display());
    }

    result
}

/// Returns `Some(reason)` if `to` should not be overwritten by `from`, or `None` if the copy
/// should proceed.
fn skip_reason(from: &Path, to: &Path) -> InstallResult<Option<&'static str>> {
    let Some(source_info) = loader_info::read_marker(from)? else {
        return Ok(Some("source carries no version information"));
    };

    let dest_info = match loader_info::read_marker(to) {
        Ok(info) => info,
        Err(InstallError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let Some(dest_info) = dest_info else {
        return Ok(Some("it's owned by another boot loader"));
    };

    match source_info.compare(&dest_info) {
        None => Ok(Some("it's owned by another boot loader")),
        Some(core::cmp::Ordering::Less | core::cmp::Ordering::Equal) => {
            Ok(Some("it's a newer boot loader version already"))
        }
        Some(core::cmp::Ordering::Greater) => Ok(None),
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// Creates the ESP directory layout (`EFI`, `EFI/gummiboot`, `EFI/BOOT`, `loader`,
/// `loader/entries`), tolerating directories that already exist.
///
/// # Errors
///
/// Propagates any I/O error other than the directory already existing.
pub fn create_dirs(esp_path: &Path) -> InstallResult<()> {
    for rel in ["EFI", "EFI/gummiboot", "EFI/BOOT", "loader", "loader/entries"] {
        let dir = esp_path.join(rel);
        match fs::create_dir(&dir) {
            Ok(()) => info!("Created {}.", dir.display()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(InstallError::io(dir, e)),
        }
    }
    Ok(())
}

/// Copies every regular file under [`SOURCE_DIR`] into `<esp_path>/EFI/gummiboot/`, placing a
/// fallback copy under `<esp_path>/EFI/BOOT/` for any source file named `gummiboot*`.
///
/// # Errors
///
/// Propagates I/O errors from directory creation or from the underlying copies, except where
/// [`copy_file`] defines a silent skip.
pub fn install_binaries(esp_path: &Path, force: bool) -> InstallResult<()> {
    if force {
        create_dirs(esp_path)?;
    }

    let source_dir = Path::new(SOURCE_DIR);
    let entries = fs::read_dir(source_dir).map_err(|e| InstallError::io(source_dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| InstallError::io(source_dir, e))?;
        let file_type = entry.file_type().map_err(|e| InstallError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }

        let name = entry.file_name();
        let Some(name_str) = name.to_str() else {
            warn!("Skipping non-UTF-8 file name in {}", source_dir.display());
            continue;
        };
        if name_str.starts_with('.') {
            continue;
        }

        let from = entry.path();
        let to = esp_path.join("EFI/gummiboot").join(&name);
        copy_file(&from, &to, force)?;

        if let Some(rest) = name_str.strip_prefix("gummiboot") {
            let fallback_name = rest.to_uppercase();
            let fallback = esp_path.join("EFI/BOOT").join(fallback_name);
            copy_file(&from, &fallback, force)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_name_strips_gummi_prefix_and_uppercases() {
        let rest = "gummibootx64.efi".strip_prefix("gummiboot").unwrap();
        assert_eq!(rest.to_uppercase(), "X64.EFI");
    }

    #[test]
    fn sibling_suffix_appends_to_file_name_only() {
        let p = sibling_with_suffix(Path::new("/a/b/gummibootx64.efi"), "~");
        assert_eq!(p, Path::new("/a/b/gummibootx64.efi~"));
    }
}
