// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Various helper functions for other modules.

use core::mem::MaybeUninit;

use alloc::ffi::CString;
use alloc::format;
use alloc::string::String;
use thiserror::Error;
use uefi::CStr8;
use uefi::{
    CStr16, CString16, Event, boot,
    boot::{ScopedProtocol, TimerTrigger},
    data_types::PoolString,
    proto::{
        ProtocolPointer,
        device_path::{
            DevicePath, PoolDevicePath, build,
            text::{AllowShortcuts, DevicePathToText, DisplayOnly},
        },
    },
};

use crate::BootResult;

/// The length of a BLS machine-id.
const MACHINE_ID_LEN: usize = 32;

/// An `Error` that may result from converting a [`String`] to another format.
#[derive(Error, Debug)]
pub enum StrError {
    /// A [`String`] could not be converted into a [`CString16`]
    #[error("Could not convert String to CString16")]
    CstrFromStr(#[from] uefi::data_types::FromStrError),

    /// A byte slice could not be converted into a [`CString`], due to an invalid
    /// character or nul character found.
    #[error("Could not convert a byte slice to a CString*")]
    FromSliceWithNul(#[from] uefi::data_types::FromSliceWithNulError),

    /// A [`String`] could not be converted into a [`CString`]
    #[error("Could not convert String to CString")]
    CstringFromStr(#[from] alloc::ffi::NulError),
}

/// An `Error` that may result from building a [`DevicePath`]
#[derive(Error, Debug)]
pub enum DevicePathError {
    /// A Device Path could not be built. This can happen if the buffer was too small.
    #[error("Could not build DevicePath")]
    Build(#[from] uefi::proto::device_path::build::BuildError),

    /// The Device Path could not be appended to an existing one for some reason.
    #[error("Could not append DevicePath to another DevicePath")]
    DevPathUtil(#[from] uefi::proto::device_path::DevicePathUtilitiesError),
}

/// Tests if a BLS machine id is valid: exactly 32 hex digits.
#[must_use = "Has no effect if the result is unused"]
pub(crate) fn check_machine_id_valid(machine_id: &str) -> bool {
    machine_id.chars().count() == MACHINE_ID_LEN
        && machine_id.chars().all(|x| x.is_ascii_hexdigit())
}

/// Converts a [`DevicePath`] into a text representation.
///
/// # Errors
///
/// May return an `Error` if the system does not support [`DevicePathToText`], or there is not enough memory.
pub fn device_path_to_text(device_path: &DevicePath) -> BootResult<PoolString> {
    let handle = boot::get_handle_for_protocol::<DevicePathToText>()?;
    let device_path_to_text = boot::open_protocol_exclusive::<DevicePathToText>(handle)?;
    Ok(device_path_to_text.convert_device_path_to_text(
        device_path,
        DisplayOnly(true),
        AllowShortcuts(false),
    )?)
}

/// Locates the first handle supporting protocol `P` and opens it exclusively.
///
/// # Errors
///
/// May return an `Error` if no handle supports `P`, or the protocol could not be opened.
pub fn locate_protocol<P: ProtocolPointer + ?Sized>() -> BootResult<ScopedProtocol<P>> {
    let handle = boot::get_handle_for_protocol::<P>()?;
    Ok(boot::open_protocol_exclusive::<P>(handle)?)
}

/// Creates a periodic timer event firing on `trigger`.
///
/// # Errors
///
/// May return an `Error` if the event or the timer could not be created.
pub fn create_timer(trigger: TimerTrigger) -> BootResult<Event> {
    // SAFETY: no callback is registered, so there is nothing for the firmware to call back into.
    let timer_event =
        unsafe { boot::create_event(boot::EventType::TIMER, boot::Tpl::APPLICATION, None, None)? };
    boot::set_timer(&timer_event, trigger)?;
    Ok(timer_event)
}

/// Gets a [`CString16`] from an [`&str`].
///
/// # Errors
///
/// May return an `Error` if the string could not be converted into a [`CString16`], either due to unsupported
/// characters or an invalid nul character.
pub fn str_to_cstr(str: &str) -> Result<CString16, StrError> {
    Ok(CString16::try_from(str)?)
}

/// Gets a [`CString16`] path given a prefix and a filename, joined with a single backslash.
///
/// # Errors
///
/// May return an `Error` if the finalized string could not be converted into a [`CString16`].
pub fn get_path_cstr(prefix: &CStr16, filename: &CStr16) -> Result<CString16, StrError> {
    str_to_cstr(&format!("{prefix}\\{filename}"))
}

/// Gets a [`CString`] from an [`&str`].
///
/// Not to be confused with a [`CString16`].
///
/// # Errors
///
/// May return an `Error` if the string could not be converted into a [`CString`] because an interior
/// nul character was found.
pub(crate) fn str_to_cstring(str: &str) -> Result<CString, StrError> {
    Ok(CString::new(str)?)
}

/// Gets a [`CStr8`] from a byte slice containing UTF-8 with a trailing nul.
///
/// # Errors
///
/// May return an `Error` if the bytes could not be converted into a [`CStr8`] because an interior nul
/// character was found, or there was an invalid character.
pub(crate) fn bytes_to_cstr8(bytes: &[u8]) -> Result<&CStr8, StrError> {
    Ok(CStr8::from_bytes_with_nul(bytes)?)
}

/// Gets the target architecture suffix used by the fallback boot path, e.g. `x64` for
/// `BOOTx64.EFI`.
#[must_use = "Has no effect if the result is unused"]
pub fn arch_suffix() -> Option<&'static str> {
    if cfg!(target_arch = "x86") {
        Some("ia32")
    } else if cfg!(target_arch = "x86_64") {
        Some("x64")
    } else if cfg!(target_arch = "arm") {
        Some("arm")
    } else if cfg!(target_arch = "aarch64") {
        Some("aa64")
    } else {
        None // rust doesn't support itanium anyways
    }
}

/// Gets the joined [`DevicePath`] given an existing [`DevicePath`] (likely to a partition) and a file's path.
///
/// The provided mutable buffer must be large enough to fit the final [`DevicePath`].
///
/// # Errors
///
/// May return an `Error` if the device path is finalized before the file's [`DevicePath`] could be pushed.
pub(crate) fn join_to_device_path(
    dev_path: &DevicePath,
    path: &CStr16,
    buf: &mut [u8],
) -> Result<PoolDevicePath, DevicePathError> {
    let buf = slice_to_maybe_uninit(buf);
    let path: &DevicePath = build::DevicePathBuilder::with_buf(buf)
        .push(&build::media::FilePath { path_name: path })?
        .finalize()?;
    Ok(dev_path.append_path(path)?)
}

/// Normalizes a path to UEFI expectations by replacing forward slashes with backslashes and
/// collapsing any run of duplicate backslashes that results.
#[must_use = "Has no effect if the result is unused"]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_sep = false;
    for c in path.chars() {
        let c = if c == '/' { '\\' } else { c };
        if c == '\\' {
            if last_was_sep {
                continue;
            }
            last_was_sep = true;
        } else {
            last_was_sep = false;
        }
        out.push(c);
    }
    out
}

/// Converts a byte slice into an `&mut [MaybeUninit<u8>]`.
pub(crate) fn slice_to_maybe_uninit(slice: &mut [u8]) -> &mut [MaybeUninit<u8>] {
    // SAFETY: this is essentially equivalent to reconstructing an &mut [MaybeUninit<u8>] from a mutable slice.
    // because slices are always valid as pointers, and the length of the two slices are the same, this is safe.
    unsafe {
        core::slice::from_raw_parts_mut(slice.as_mut_ptr().cast::<MaybeUninit<u8>>(), slice.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uefi::cstr16;

    #[test]
    fn test_check_machine_id_valid() {
        let machine_id = "1234567890abcdef1234567890abcdef";
        assert!(check_machine_id_valid(machine_id));
        let machine_id = "1234567890abcdef1234567890abcdeg";
        assert!(!check_machine_id_valid(machine_id));
        let machine_id = "obviously invalid";
        assert!(!check_machine_id_valid(machine_id));
    }

    #[test]
    fn test_str_to_cstr() -> Result<(), StrError> {
        let cstr = str_to_cstr("foo bar")?;
        let str = String::from(&cstr);
        assert_eq!(str, "foo bar".to_owned());
        Ok(())
    }

    #[test]
    fn test_get_path_cstr() -> Result<(), StrError> {
        const PREFIX: &CStr16 = cstr16!("\\root");
        const FILE: &CStr16 = cstr16!("somefilename");
        let path = get_path_cstr(PREFIX, FILE)?;
        let str = String::from(&path);
        assert_eq!(str, "\\root\\somefilename".to_owned());
        Ok(())
    }

    #[test]
    fn test_arch_suffix() {
        if cfg!(target_arch = "x86_64") {
            assert_eq!(arch_suffix(), Some("x64"));
        }
    }

    #[test]
    fn test_normalize_path() {
        let path = "/some//path/from/linux/fs";
        assert_eq!(normalize_path(path), "\\some\\path\\from\\linux\\fs");
        let path = "\\a\\completely\\normal\\path";
        assert_eq!(normalize_path(path), path);
    }
}
