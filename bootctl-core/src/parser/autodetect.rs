// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Auto-detection of well-known loaders that do not ship a `loader/entries/*.conf` of their own:
//! the Windows boot manager, the EFI shell, the removable-media fallback, and macOS's `boot.efi`.
//!
//! Every entry produced here has [`Entry::no_autoselect`] set, since these are discovered, not
//! configured, and should never outrank an entry the user actually installed.

use alloc::format;
use uefi::{CStr16, Handle, cstr16};

use crate::{
    entry::{Entry, EntryKind},
    system::{fs::UefiFileSystem, helper::arch_suffix},
};

/// Path to the Windows boot manager.
const WINDOWS_PATH: &CStr16 = cstr16!("\\EFI\\Microsoft\\Boot\\bootmgfw.efi");

/// Path to the UEFI shell, at the root of the partition.
const SHELL_PATH: &CStr16 = cstr16!("\\shellx64.efi");

/// Path to macOS's boot loader.
const OSX_PATH: &CStr16 = cstr16!("\\System\\Library\\CoreServices\\boot.efi");

/// Builds an auto-detect [`Entry`] for `path` on `device` if `path` exists on `fs`.
fn detect(fs: &mut UefiFileSystem, device: Handle, path: &CStr16, id: &str, title: &str) -> Option<Entry> {
    if !fs.exists(path) {
        return None;
    }
    Some(Entry {
        id: id.into(),
        title: Some(title.into()),
        title_shown: title.into(),
        kind: EntryKind::Efi,
        loader_path: format!("{path}"),
        device: Some(device),
        no_autoselect: true,
        ..Entry::default()
    })
}

/// Detects the Windows boot manager on `device`.
#[must_use = "Has no effect if the result is unused"]
pub fn windows(fs: &mut UefiFileSystem, device: Handle) -> Option<Entry> {
    detect(fs, device, WINDOWS_PATH, "auto-windows", "Windows Boot Manager")
}

/// Detects the EFI shell on `device`.
#[must_use = "Has no effect if the result is unused"]
pub fn shell(fs: &mut UefiFileSystem, device: Handle) -> Option<Entry> {
    detect(fs, device, SHELL_PATH, "auto-efi-shell", "EFI Shell")
}

/// Detects macOS's `boot.efi` on `device`.
#[must_use = "Has no effect if the result is unused"]
pub fn osx(fs: &mut UefiFileSystem, device: Handle) -> Option<Entry> {
    detect(fs, device, OSX_PATH, "auto-osx", "macOS")
}

/// Detects the removable-media fallback binary (`\EFI\BOOT\BOOT<ARCH>.EFI`) on `device`.
#[must_use = "Has no effect if the result is unused"]
pub fn fallback(fs: &mut UefiFileSystem, device: Handle) -> Option<Entry> {
    let arch = arch_suffix()?;
    let path = format!("\\EFI\\BOOT\\BOOT{}.EFI", arch.to_ascii_uppercase());
    let cpath = crate::system::helper::str_to_cstr(&path).ok()?;

    if !fs.exists(&cpath) {
        return None;
    }
    Some(Entry {
        id: "auto-efi-default".into(),
        title: Some("EFI Default Loader".into()),
        title_shown: "EFI Default Loader".into(),
        kind: EntryKind::Efi,
        loader_path: path,
        device: Some(device),
        no_autoselect: true,
        ..Entry::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn well_known_paths_are_rooted_at_the_esp() {
        assert_eq!(String::from(WINDOWS_PATH), "\\EFI\\Microsoft\\Boot\\bootmgfw.efi");
        assert_eq!(String::from(SHELL_PATH), "\\shellx64.efi");
        assert_eq!(String::from(OSX_PATH), "\\System\\Library\\CoreServices\\boot.efi");
    }
}
