// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Parses `loader/entries/*.conf` into [`Entry`] values.
//!
//! Recognized keys: `title`, `version`, `machine-id`, `linux`, `efi`, `initrd`, `options`.
//! `initrd` and `options` accumulate across repeated keys; every other recognized key may
//! appear at most once (later occurrences win). Unknown keys are silently ignored.

use alloc::format;
use alloc::string::{String, ToOwned};
use uefi::{CStr16, Handle, cstr16};

use crate::{
    entry::{Entry, EntryKind},
    system::{fs::UefiFileSystem, helper::normalize_path},
};

/// The directory under which entry files live.
pub const ENTRIES_PREFIX: &CStr16 = cstr16!("\\loader\\entries");

/// The suffix an entry file must have to be considered.
pub const ENTRIES_SUFFIX: &str = ".conf";

/// Scans `loader/entries/` on `fs`, returning one [`Entry`] per valid `.conf` file.
///
/// `device` is recorded on every entry produced. `own_image_path`, if given, is compared
/// (case-insensitively) against each entry's `efi` path; a match resets the entry's kind back
/// to [`EntryKind::Undefined`], which causes it to be dropped during catalog validation, since
/// an entry pointing at the loader's own image would otherwise loop forever.
#[must_use = "Has no effect if the result is unused"]
pub fn scan(
    fs: &mut UefiFileSystem,
    device: Handle,
    own_image_path: Option<&str>,
) -> alloc::vec::Vec<Entry> {
    let mut entries = alloc::vec::Vec::new();

    for info in fs.read_filtered_dir(ENTRIES_PREFIX, ENTRIES_SUFFIX) {
        let filename = info.file_name();
        let filename_str = alloc::string::String::from(filename);
        if filename_str.starts_with('.') {
            continue;
        }

        let path = format!("{ENTRIES_PREFIX}\\{filename}");
        let Ok(path) = crate::system::helper::str_to_cstr(&path) else {
            continue;
        };
        let Ok(content) = fs.read(&path) else {
            continue;
        };

        let id = filename_str
            .strip_suffix(ENTRIES_SUFFIX)
            .unwrap_or(&filename_str)
            .to_ascii_lowercase();

        let mut entry = parse_one(&content, id, Some(device));

        if let Some(own) = own_image_path
            && entry.kind == EntryKind::Efi
            && entry.loader_path.eq_ignore_ascii_case(own)
        {
            entry.kind = EntryKind::Undefined;
        }

        entries.push(entry);
    }

    entries
}

/// Parses a single entry file's content into an [`Entry`].
fn parse_one(content: &[u8], id: String, device: Option<Handle>) -> Entry {
    let mut entry = Entry {
        id,
        device,
        ..Entry::default()
    };
    let mut initrds: alloc::vec::Vec<String> = alloc::vec::Vec::new();
    let mut options_parts: alloc::vec::Vec<String> = alloc::vec::Vec::new();

    for (key, value) in bootctl_confparser::ConfLines::new(content) {
        match key.to_ascii_lowercase().as_str() {
            "title" => entry.title = Some(value.to_owned()),
            "version" => entry.version = Some(value.to_owned()),
            "machine-id" => entry.machine_id = Some(value.to_ascii_lowercase()),
            "linux" => {
                entry.kind = EntryKind::Linux;
                entry.loader_path = normalize_path(value);
            }
            "efi" => {
                entry.kind = EntryKind::Efi;
                entry.loader_path = normalize_path(value);
            }
            "initrd" => initrds.push(normalize_path(value)),
            "options" => options_parts.push(value.to_owned()),
            _ => (),
        }
    }

    if !initrds.is_empty() {
        let initrd_opts: alloc::vec::Vec<String> =
            initrds.iter().map(|p| format!("initrd={p}")).collect();
        options_parts.insert(0, initrd_opts.join(" "));
    }
    entry.options = options_parts.join(" ");

    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linux_entry_with_initrd_and_options() {
        let content = b"title Arch Linux\nversion 6.1.0\nlinux /vmlinuz-linux\ninitrd /intel-ucode.img\ninitrd /initramfs-linux.img\noptions root=/dev/sda1 rw\noptions quiet\n";
        let entry = parse_one(content, "arch".into(), None);
        assert_eq!(entry.kind, EntryKind::Linux);
        assert_eq!(entry.title.as_deref(), Some("Arch Linux"));
        assert_eq!(entry.loader_path, "\\vmlinuz-linux");
        assert!(entry.options.starts_with(
            "initrd=\\intel-ucode.img initrd=\\initramfs-linux.img root=/dev/sda1 rw quiet"
        ));
    }

    #[test]
    fn efi_entry_has_no_kind_without_efi_key() {
        let entry = parse_one(b"title Nothing useful\n", "stub".into(), None);
        assert_eq!(entry.kind, EntryKind::Undefined);
    }

    #[test]
    fn machine_id_is_lowercased() {
        let entry = parse_one(
            b"efi /foo.efi\nmachine-id 0123456789ABCDEF0123456789ABCDEF\n",
            "x".into(),
            None,
        );
        assert_eq!(
            entry.machine_id.as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
    }
}
