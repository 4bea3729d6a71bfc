// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! The loader's UEFI variable namespace.
//!
//! Every variable the loader reads or writes, other than the handful of well-known global
//! variables (`BootOrder`, `Boot####`, `SecureBoot`), lives under [`LOADER_GUID`]. This module
//! exposes the four primitive operations [`set`], [`get`], [`set_int`], and [`get_int`], plus the
//! named constants for the variables listed in the loader variable table, and a helper for
//! recording the monotonic tick counter into a telemetry variable.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec;
use uefi::{CStr16, Status, guid, runtime::{self, VariableAttributes, VariableVendor}};

use crate::{
    BootResult,
    error::BootError,
    system::{helper::str_to_cstr, time::timer_usec},
};

/// The vendor GUID under which every loader-owned variable lives.
pub const LOADER_GUID: VariableVendor = VariableVendor(guid!("23600d08-561e-4e68-a024-1d7d6e04ee4e"));

/// Identifying string of the loader build. Written once at startup.
pub const LOADER_VERSION: &CStr16 = uefi::cstr16!("LoaderVersion");

/// Overrides the `timeout` parsed from `loader.conf`.
pub const LOADER_CONFIG_TIMEOUT: &CStr16 = uefi::cstr16!("LoaderConfigTimeout");

/// The id of the persistently preferred entry; cleared by the user via the `d` key.
pub const LOADER_ENTRY_DEFAULT: &CStr16 = uefi::cstr16!("LoaderEntryDefault");

/// The id to boot exactly once; cleared atomically on read.
pub const LOADER_ENTRY_ONESHOT: &CStr16 = uefi::cstr16!("LoaderEntryOneShot");

/// The id of the entry chosen for the current boot. Written, never read back by the loader.
pub const LOADER_ENTRY_SELECTED: &CStr16 = uefi::cstr16!("LoaderEntrySelected");

/// Space-separated ids of auto-detected entries.
pub const LOADER_ENTRIES_AUTO: &CStr16 = uefi::cstr16!("LoaderEntriesAuto");

/// Stringified device path of the loader's own device.
pub const LOADER_DEVICE_IDENTIFIER: &CStr16 = uefi::cstr16!("LoaderDeviceIdentifier");

/// GPT partition UUID of the loader's own device.
pub const LOADER_DEVICE_PART_UUID: &CStr16 = uefi::cstr16!("LoaderDevicePartUUID");

/// A monotonic-tick telemetry variable, recorded at loader initialization.
pub const LOADER_TICKS_INIT: &CStr16 = uefi::cstr16!("LoaderTicksInit");

/// A monotonic-tick telemetry variable, recorded when the menu is first shown.
pub const LOADER_TICKS_START_MENU: &CStr16 = uefi::cstr16!("LoaderTicksStartMenu");

/// A monotonic-tick telemetry variable, recorded immediately before starting the chosen image.
pub const LOADER_TICKS_EXEC: &CStr16 = uefi::cstr16!("LoaderTicksExec");

/// Prefix of the per-machine-id persistent additional-options variable, `LoaderEntryOptions-<mid>`.
const LOADER_ENTRY_OPTIONS_PREFIX: &str = "LoaderEntryOptions-";

/// Prefix of the per-machine-id one-shot additional-options variable,
/// `LoaderEntryOptionsOneShot-<mid>`.
const LOADER_ENTRY_OPTIONS_ONESHOT_PREFIX: &str = "LoaderEntryOptionsOneShot-";

/// Writes a NUL-terminated UTF-16LE string to `name`.
///
/// Passing an empty string deletes the variable. `persistent` controls whether the
/// non-volatile attribute is set; transient variables (like `LoaderEntrySelected`) should pass
/// `false` only if the firmware vendor intends them to not survive a power cycle, but in
/// practice the loader always uses the non-volatile attribute so that a value written just
/// before a chain-load is still legible after a crash.
///
/// # Errors
///
/// May return an `Error` if the underlying UEFI variable service call fails.
pub fn set(name: &CStr16, value: &str, persistent: bool) -> BootResult<()> {
    if value.is_empty() {
        return delete(name);
    }
    let cstr = str_to_cstr(value)?;
    let attrs = attrs_for(persistent);
    Ok(runtime::set_variable(
        name,
        &LOADER_GUID,
        attrs,
        cstr.to_u16_slice_with_nul_bytes(),
    )?)
}

/// Reads a NUL-terminated UTF-16LE string variable as UTF-8.
///
/// Returns an empty string if the variable does not exist, matching the "absent-but-expected"
/// error category: a missing loader variable is an empty default, not an error.
///
/// # Errors
///
/// May return an `Error` if the underlying UEFI variable service call fails for a reason other
/// than the variable being absent.
pub fn get(name: &CStr16) -> BootResult<String> {
    let mut buf = vec![0u8; 4096];
    match runtime::get_variable(name, &LOADER_GUID, &mut buf) {
        Ok((value, _)) => {
            let mut decoded = vec![0u8; bootctl_codec::utf8_capacity_for(value.len())];
            let written = bootctl_codec::utf16le_to_utf8(value, &mut decoded);
            decoded.truncate(written);
            Ok(String::from_utf8_lossy(&decoded).into_owned())
        }
        Err(e) if e.status() == Status::NOT_FOUND => Ok(String::new()),
        Err(e) => Err(BootError::Uefi(e.to_err_without_payload())),
    }
}

/// Writes a decimal text encoding of `n` to `name`.
///
/// # Errors
///
/// May return an `Error` if the underlying UEFI variable service call fails.
pub fn set_int(name: &CStr16, n: i64, persistent: bool) -> BootResult<()> {
    set(name, &n.to_string(), persistent)
}

/// Reads a decimal text variable and parses it as an integer.
///
/// Returns `None` if the variable is absent or its content does not parse as a decimal integer.
#[must_use = "Has no effect if the result is unused"]
pub fn get_int(name: &CStr16) -> Option<i64> {
    get(name).ok().filter(|s| !s.is_empty())?.parse().ok()
}

/// Deletes a variable, ignoring a "not found" result since that already matches the desired
/// end state.
fn delete(name: &CStr16) -> BootResult<()> {
    match runtime::set_variable(name, &LOADER_GUID, VariableAttributes::empty(), &[]) {
        Ok(()) | Err(_) => Ok(()), // absent-but-expected: deleting a missing variable is a no-op
    }
}

/// Reads `LoaderEntryOneShot`, if set, and atomically clears it on the way out.
///
/// # Errors
///
/// May return an `Error` if the read succeeded but the subsequent delete failed.
pub fn take_oneshot() -> BootResult<Option<String>> {
    let value = get(LOADER_ENTRY_ONESHOT)?;
    if value.is_empty() {
        return Ok(None);
    }
    delete(LOADER_ENTRY_ONESHOT)?;
    Ok(Some(value))
}

/// Reads `LoaderEntryOptions-<machine_id>`, the persistent additional options shared by every
/// entry with that `machine-id`. Returns an empty string if unset.
///
/// # Errors
///
/// May return an `Error` if the underlying UEFI variable service call fails for a reason other
/// than the variable being absent, or if `machine_id` cannot be encoded as a variable name.
pub fn entry_options(machine_id: &str) -> BootResult<String> {
    let name = str_to_cstr(&format!("{LOADER_ENTRY_OPTIONS_PREFIX}{machine_id}"))?;
    get(&name)
}

/// Reads `LoaderEntryOptionsOneShot-<machine_id>`, if set, and atomically clears it on the way
/// out, mirroring [`take_oneshot`].
///
/// # Errors
///
/// May return an `Error` if the read succeeded but the subsequent delete failed, or if
/// `machine_id` cannot be encoded as a variable name.
pub fn take_entry_options_oneshot(machine_id: &str) -> BootResult<Option<String>> {
    let name = str_to_cstr(&format!("{LOADER_ENTRY_OPTIONS_ONESHOT_PREFIX}{machine_id}"))?;
    let value = get(&name)?;
    if value.is_empty() {
        return Ok(None);
    }
    delete(&name)?;
    Ok(Some(value))
}

/// Appends `extra` to `options` with a single-space separator, matching the accumulation rule
/// used for repeated `options` keys in `entries/*.conf`. A no-op if `extra` is empty.
pub(crate) fn append_options(options: &mut String, extra: &str) {
    if extra.is_empty() {
        return;
    }
    if !options.is_empty() {
        options.push(' ');
    }
    options.push_str(extra);
}

/// Merges `LoaderEntryOptions-<machine_id>` into `entry.options` in place, if `machine_id` is
/// set. Called once per entry while building the catalog; the one-shot counterpart is merged
/// separately, only for the entry actually booted, by [`crate::chain_loader::load_and_start`].
///
/// # Errors
///
/// May return an `Error` if the underlying variable read fails.
pub fn augment_entry_options(options: &mut String, machine_id: Option<&str>) -> BootResult<()> {
    let Some(machine_id) = machine_id else {
        return Ok(());
    };
    let persistent = entry_options(machine_id)?;
    append_options(options, &persistent);
    Ok(())
}

/// The standard attribute set for a loader variable: boot-service accessible, and non-volatile
/// when `persistent` is set.
fn attrs_for(persistent: bool) -> VariableAttributes {
    let mut attrs = VariableAttributes::BOOTSERVICE_ACCESS;
    if persistent {
        attrs |= VariableAttributes::NON_VOLATILE;
    }
    attrs
}

/// Records the current monotonic tick count (see [`timer_usec`]) into a telemetry variable.
///
/// Telemetry variables are best-effort: a failure to write is logged by the caller, not
/// propagated, since losing a timestamp should never abort booting.
pub fn record_ticks(name: &CStr16) -> BootResult<()> {
    set_int(name, i64::try_from(timer_usec()).unwrap_or(i64::MAX), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attrs_for_persistent_sets_non_volatile() {
        let attrs = attrs_for(true);
        assert!(attrs.contains(VariableAttributes::NON_VOLATILE));
    }

    #[test]
    fn attrs_for_transient_omits_non_volatile() {
        let attrs = attrs_for(false);
        assert!(!attrs.contains(VariableAttributes::NON_VOLATILE));
    }

    #[test]
    fn append_options_joins_with_single_space() {
        let mut options = String::from("root=/dev/sda1");
        append_options(&mut options, "quiet");
        assert_eq!(options, "root=/dev/sda1 quiet");
    }

    #[test]
    fn append_options_is_noop_for_empty_extra() {
        let mut options = String::from("root=/dev/sda1");
        append_options(&mut options, "");
        assert_eq!(options, "root=/dev/sda1");
    }

    #[test]
    fn append_options_into_empty_base_has_no_leading_space() {
        let mut options = String::new();
        append_options(&mut options, "quiet");
        assert_eq!(options, "quiet");
    }
}
