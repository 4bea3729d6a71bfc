// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Provides [`Entry`], one per `.conf` file under `/loader/entries/` or one per auto-detected
//! loader, and [`EntryKind`], the discriminant that decides whether an entry is eligible to boot.

use alloc::string::String;
use uefi::Handle;

/// What kind of image an [`Entry`] points to.
///
/// `Undefined` entries never appear in a finished [`crate::catalog::Catalog`]; they are the
/// state an entry is born in before a parser fills in `linux` or `efi`, and the state an entry
/// is forced back into when its `efi` path turns out to be the loader's own image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EntryKind {
    /// No bootable image has been identified for this entry yet.
    #[default]
    Undefined,

    /// The entry boots an EFI executable directly.
    Efi,

    /// The entry boots a Linux kernel image (with an optional initrd).
    Linux,
}

/// A single boot entry: either parsed from a `.conf` file or synthesized by auto-detection.
#[derive(Clone, Debug, Default)]
pub struct Entry {
    /// The lowercased file name stem (without `.conf`). Unique within a catalog.
    pub id: String,

    /// The raw `title` field from the `.conf` file, if present.
    pub title: Option<String>,

    /// The title actually displayed in the menu, after the uniquification pass has run.
    pub title_shown: String,

    /// The raw `version` field, if present.
    pub version: Option<String>,

    /// The raw `machine-id` field, if present.
    pub machine_id: Option<String>,

    /// What kind of image this entry boots.
    pub kind: EntryKind,

    /// Absolute, backslash-separated path to the image on the ESP, with duplicate separators
    /// collapsed.
    pub loader_path: String,

    /// The command-line options passed to the loaded image, possibly augmented by
    /// `LoaderEntryOptions-<machine_id>` and one-shot variables.
    pub options: String,

    /// The handle of the filesystem this entry's image resides on.
    pub device: Option<Handle>,

    /// If true, this entry is never chosen automatically (set on every auto-detected entry).
    pub no_autoselect: bool,

    /// Transient flag used by the title-uniquification pass: true while `title_shown` still
    /// collides with another entry's.
    pub non_unique: bool,

    /// `true` once this entry has failed to load; excluded from subsequent selection.
    pub bad: bool,
}

impl Entry {
    /// Returns true if this entry is eligible to appear in a finished catalog: it names a
    /// bootable image and a non-empty path.
    #[must_use = "Has no effect if the result is unused"]
    pub fn is_good(&self) -> bool {
        !self.bad && self.kind != EntryKind::Undefined && !self.loader_path.is_empty()
    }

    /// Returns the eight-character machine-id prefix used as a uniquification suffix, if a
    /// `machine-id` was set.
    #[must_use = "Has no effect if the result is unused"]
    pub fn machine_id_prefix(&self) -> Option<&str> {
        self.machine_id.as_deref().map(|m| &m[..m.len().min(8)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_entry_is_never_good() {
        let entry = Entry {
            loader_path: "\\vmlinuz-linux".into(),
            ..Entry::default()
        };
        assert!(!entry.is_good());
    }

    #[test]
    fn empty_path_is_never_good() {
        let entry = Entry {
            kind: EntryKind::Linux,
            ..Entry::default()
        };
        assert!(!entry.is_good());
    }

    #[test]
    fn machine_id_prefix_truncates_to_eight() {
        let entry = Entry {
            machine_id: Some("0123456789abcdef0123456789abcdef".into()),
            ..Entry::default()
        };
        assert_eq!(entry.machine_id_prefix(), Some("01234567"));
    }
}
