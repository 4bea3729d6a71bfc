// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The entry catalog: discovery, natural-version sort, title uniquification, and
//! default-entry selection.

use alloc::string::String;
use alloc::vec::Vec;
use uefi::{boot, proto::media::fs::SimpleFileSystem};

use crate::{
    BootResult,
    entry::Entry,
    fw_vars::{self, LOADER_CONFIG_TIMEOUT, LOADER_ENTRY_DEFAULT},
    parser::{autodetect, entries, loader_conf::LoaderConf},
    system::fs::{UefiFileSystem, is_target_partition},
};

/// The entry catalog, plus the timeout/default-selection state that travels with it.
pub struct Catalog {
    /// Every eligible entry, sorted by id under natural version ordering.
    pub entries: Vec<Entry>,

    /// Timeout read from `loader.conf`.
    pub timeout_sec_config: Option<i64>,

    /// Timeout read from the `LoaderConfigTimeout` firmware variable; takes precedence over
    /// `timeout_sec_config` when present.
    pub timeout_sec_efivar: Option<i64>,

    /// The default-entry glob from `loader.conf`.
    pub default_pattern: Option<String>,

    /// Index of the currently selected entry.
    pub idx_default: usize,

    /// Index persistently chosen by the user via `LoaderEntryDefault`, or `-1` if none.
    pub idx_default_efivar: i64,

    /// Non-persistent, per-boot override of the selected entry's `options`.
    pub options_edit: Option<String>,

    /// Space-separated ids of auto-detected entries.
    pub entries_auto: String,
}

impl Catalog {
    /// Builds a [`Catalog`] by scanning every handle that supports [`SimpleFileSystem`] and is
    /// the EFI System Partition, parsing `loader/entries/*.conf` on each, and appending the
    /// well-known auto-detections, then sorting, uniquifying titles, and picking a default.
    ///
    /// # Errors
    ///
    /// May return an `Error` if locating filesystem handles fails outright (not if an
    /// individual handle or file cannot be read; those are skipped).
    pub fn build() -> BootResult<Self> {
        let own_image_path = own_image_path().ok();
        let loader_conf = Self::load_loader_conf()?;

        let mut entries = Vec::new();
        let mut auto_ids = Vec::new();

        let handles = boot::locate_handle_buffer(boot::SearchType::from_proto::<SimpleFileSystem>())?;
        for &handle in handles.iter() {
            if !is_target_partition(handle) {
                continue;
            }
            let Ok(mut fs) = UefiFileSystem::from_handle(handle) else {
                continue;
            };

            entries.extend(entries::scan(&mut fs, handle, own_image_path.as_deref()));

            for detector in [autodetect::windows, autodetect::shell, autodetect::fallback, autodetect::osx] {
                if let Some(entry) = detector(&mut fs, handle) {
                    auto_ids.push(entry.id.clone());
                    entries.push(entry);
                }
            }
        }

        entries.retain(Entry::is_good);
        entries.sort_unstable_by(|a, b| bootctl_confparser::natural_cmp(&a.id, &b.id));

        uniquify_titles(&mut entries);
        for entry in &mut entries {
            let _ = fw_vars::augment_entry_options(&mut entry.options, entry.machine_id.as_deref());
        }

        let mut catalog = Self {
            entries,
            timeout_sec_config: loader_conf.timeout_sec_config,
            timeout_sec_efivar: fw_vars::get_int(LOADER_CONFIG_TIMEOUT),
            default_pattern: loader_conf.default_pattern,
            idx_default: 0,
            idx_default_efivar: -1,
            options_edit: None,
            entries_auto: auto_ids.join(" "),
        };
        catalog.select_default()?;
        Ok(catalog)
    }

    /// Reads `loader.conf` off the same filesystem as the currently executing image.
    fn load_loader_conf() -> BootResult<LoaderConf> {
        let mut fs = UefiFileSystem::from_image_fs()?;
        LoaderConf::load(&mut fs)
    }

    /// The effective timeout: the firmware variable overrides the config file.
    #[must_use = "Has no effect if the result is unused"]
    pub fn timeout_sec(&self) -> i64 {
        self.timeout_sec_efivar
            .or(self.timeout_sec_config)
            .unwrap_or(0)
    }

    /// Runs the default-selection policy described in the entry catalog's component design and
    /// records the result in `idx_default` (and `idx_default_efivar`, if applicable).
    ///
    /// # Errors
    ///
    /// May return an `Error` if a firmware variable read or the one-shot clear fails.
    pub fn select_default(&mut self) -> BootResult<()> {
        if self.entries.is_empty() {
            self.idx_default = 0;
            return Ok(());
        }

        // 1. LoaderEntryOneShot, if it names an existing id.
        if let Some(oneshot) = fw_vars::take_oneshot()?
            && let Some(idx) = self.index_of(&oneshot)
        {
            self.idx_default = idx;
            return Ok(());
        }

        // 2. LoaderEntryDefault, if it names an existing id.
        let default_var = fw_vars::get(LOADER_ENTRY_DEFAULT).unwrap_or_default();
        if !default_var.is_empty()
            && let Some(idx) = self.index_of(&default_var)
        {
            self.idx_default = idx;
            self.idx_default_efivar = i64::try_from(idx).unwrap_or(-1);
            return Ok(());
        }

        // 3. default_pattern, walking from the end, skipping no_autoselect entries.
        if let Some(pattern) = self.default_pattern.clone()
            && let Some(idx) = self
                .entries
                .iter()
                .enumerate()
                .rev()
                .find(|(_, e)| !e.no_autoselect && glob_match(&pattern, &e.id.to_ascii_lowercase()))
                .map(|(i, _)| i)
        {
            self.idx_default = idx;
            return Ok(());
        }

        // 4. last entry with no_autoselect == false.
        if let Some(idx) = self
            .entries
            .iter()
            .enumerate()
            .rev()
            .find(|(_, e)| !e.no_autoselect)
            .map(|(i, _)| i)
        {
            self.idx_default = idx;
            return Ok(());
        }

        // 5. every entry is no_autoselect: pick the last one regardless.
        self.idx_default = self.entries.len() - 1;
        Ok(())
    }

    /// Finds the index of the entry with id `id`, if present.
    #[must_use = "Has no effect if the result is unused"]
    fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

/// Derives the currently executing image's path, for suppressing self-referential entries.
fn own_image_path() -> BootResult<String> {
    use uefi::proto::loaded_image::LoadedImage;

    let loaded_image = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle())?;
    let device_path = loaded_image
        .file_path()
        .ok_or(uefi::Error::from(uefi::Status::NOT_FOUND))?;
    let text = crate::system::helper::device_path_to_text(device_path)?;
    Ok(String::from(&*text))
}

/// Initializes `title_shown` for every entry, then repeatedly disambiguates collisions by
/// appending `(version)`, then the machine-id prefix, then `(id)`, recomputing collisions after
/// each pass, until all titles are distinct or no further progress can be made.
fn uniquify_titles(entries: &mut [Entry]) {
    for entry in entries.iter_mut() {
        entry.title_shown = entry
            .title
            .clone()
            .unwrap_or_else(|| entry.id.clone());
        entry.non_unique = false;
    }

    mark_collisions(entries);
    if !any_non_unique(entries) {
        return;
    }

    for entry in entries.iter_mut().filter(|e| e.non_unique) {
        if let Some(version) = &entry.version {
            entry.title_shown = alloc::format!("{} ({version})", entry.title_shown);
        }
    }
    mark_collisions(entries);
    if !any_non_unique(entries) {
        return;
    }

    for entry in entries.iter_mut().filter(|e| e.non_unique) {
        if let Some(prefix) = entry.machine_id_prefix() {
            entry.title_shown = alloc::format!("{} {prefix}", entry.title_shown);
        }
    }
    mark_collisions(entries);
    if !any_non_unique(entries) {
        return;
    }

    for entry in entries.iter_mut().filter(|e| e.non_unique) {
        entry.title_shown = alloc::format!("{} ({})", entry.title_shown, entry.id);
    }
    mark_collisions(entries);
}

/// Sets `non_unique` on every entry whose `title_shown` collides with another entry's.
fn mark_collisions(entries: &mut [Entry]) {
    for i in 0..entries.len() {
        let collides = entries
            .iter()
            .enumerate()
            .any(|(j, other)| j != i && other.title_shown == entries[i].title_shown);
        entries[i].non_unique = collides;
    }
}

/// Returns true if any entry is still flagged as having a colliding title.
fn any_non_unique(entries: &[Entry]) -> bool {
    entries.iter().any(|e| e.non_unique)
}

/// Matches `name` against `pattern` using standard `*`/`?` glob semantics, case-insensitively
/// (both arguments are expected to already be lowercased by the caller).
#[must_use = "Has no effect if the result is unused"]
fn glob_match(pattern: &str, name: &str) -> bool {
    fn inner(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => inner(&p[1..], n) || (!n.is_empty() && inner(p, &n[1..])),
            (Some(b'?'), Some(_)) => inner(&p[1..], &n[1..]),
            (Some(&pc), Some(&nc)) if pc == nc => inner(&p[1..], &n[1..]),
            _ => false,
        }
    }
    inner(pattern.as_bytes(), name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::borrow::ToOwned;
    use crate::entry::EntryKind;

    fn entry(id: &str, title: Option<&str>, version: Option<&str>) -> Entry {
        Entry {
            id: id.into(),
            title: title.map(ToOwned::to_owned),
            version: version.map(ToOwned::to_owned),
            kind: EntryKind::Linux,
            loader_path: "\\vmlinuz".into(),
            ..Entry::default()
        }
    }

    #[test]
    fn uniquify_appends_version_on_collision() {
        let mut entries = alloc::vec![
            entry("a", Some("Linux"), Some("4.2")),
            entry("b", Some("Linux"), Some("4.3")),
        ];
        uniquify_titles(&mut entries);
        assert_eq!(entries[0].title_shown, "Linux (4.2)");
        assert_eq!(entries[1].title_shown, "Linux (4.3)");
    }

    #[test]
    fn glob_matches_prefix_star() {
        assert!(glob_match("arch-*", "arch-10"));
        assert!(!glob_match("arch-*", "debian-1"));
        assert!(glob_match("a?c", "abc"));
    }

    #[test]
    fn natural_sort_orders_entries_as_scenario_1() {
        let mut entries = alloc::vec![entry("arch-10", None, None), entry("arch-4", None, None)];
        entries.sort_unstable_by(|a, b| bootctl_confparser::natural_cmp(&a.id, &b.id));
        assert_eq!(entries[0].id, "arch-4");
        assert_eq!(entries[1].id, "arch-10");
    }
}
