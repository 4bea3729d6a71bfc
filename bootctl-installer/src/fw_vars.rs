// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Reads and writes `/sys/firmware/efi/efivars/<Name>-<vendor-guid>`.
//!
//! The wire format is uniform across every variable in this filesystem: the first four bytes
//! are the attribute flags (little-endian `u32`), and the remainder is the variable's value.
//! Values are NUL-padded by two bytes on read to protect UTF-16 consumers that don't carry
//! their own length.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::boot_option::{self, BootOption, LOAD_OPTION_ACTIVE};
use crate::error::{InstallError, InstallResult};

/// EFI global variable vendor GUID (`8be4df61-93ca-11d2-aa0d-00e098032b8c`).
pub const EFI_GLOBAL_GUID: &str = "8be4df61-93ca-11d2-aa0d-00e098032b8c";

const EFIVARS_DIR: &str = "/sys/firmware/efi/efivars";
const ATTR_NON_VOLATILE: u32 = 0x0000_0001;
const ATTR_BOOTSERVICE_ACCESS: u32 = 0x0000_0002;
const ATTR_RUNTIME_ACCESS: u32 = 0x0000_0004;
const MAX_VARIABLE_SIZE: usize = 4 * 1024 * 1024 + 4;

/// Returns `true` if the system was booted via UEFI (`/sys/firmware/efi` exists).
#[must_use = "Has no effect if the result is unused"]
pub fn is_efi_boot() -> bool {
    Path::new("/sys/firmware/efi").exists()
}

fn variable_path(name: &str, vendor_guid: &str) -> PathBuf {
    PathBuf::from(EFIVARS_DIR).join(format!("{name}-{vendor_guid}"))
}

/// Reads a raw variable, returning its value with the 4-byte attribute prefix stripped.
///
/// # Errors
///
/// Propagates the I/O error on any failure, including the variable being absent. Returns
/// [`InstallError::MalformedRecord`] if the file is smaller than the attribute prefix or
/// larger than the firmware could plausibly have written.
pub fn read_variable(name: &str, vendor_guid: &str) -> InstallResult<Vec<u8>> {
    let path = variable_path(name, vendor_guid);
    let mut raw = fs::read(&path).map_err(|e| InstallError::io(path, e))?;

    if raw.len() < 4 {
        return Err(InstallError::MalformedRecord("efivarfs entry shorter than its attribute header"));
    }
    if raw.len() > MAX_VARIABLE_SIZE {
        return Err(InstallError::MalformedRecord("efivarfs entry larger than the maximum variable size"));
    }

    let value = raw.split_off(4);
    Ok(value)
}

/// Writes a variable with the standard non-volatile, boot-service, and runtime access
/// attributes.
///
/// # Errors
///
/// Propagates the I/O error on any failure to create or write the file.
pub fn write_variable(name: &str, vendor_guid: &str, value: &[u8]) -> InstallResult<()> {
    let path = variable_path(name, vendor_guid);
    let attrs = ATTR_NON_VOLATILE | ATTR_BOOTSERVICE_ACCESS | ATTR_RUNTIME_ACCESS;

    let mut buf = Vec::with_capacity(4 + value.len());
    buf.extend_from_slice(&attrs.to_le_bytes());
    buf.extend_from_slice(value);

    fs::write(&path, buf).map_err(|e| InstallError::io(path, e))
}

/// Deletes a variable, treating "already absent" as success.
///
/// # Errors
///
/// Propagates any I/O error other than the variable not existing.
pub fn delete_variable(name: &str, vendor_guid: &str) -> InstallResult<()> {
    let path = variable_path(name, vendor_guid);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallError::io(path, e)),
    }
}

/// Lists every defined `Boot####` slot, sorted ascending.
///
/// Every 4-digit hex suffix is accepted, unlike the original implementation this is adapted
/// from, which happened to only recognize slots whose hex digits were all decimal (a ``Boot0100``
/// with a hex letter was silently invisible to it). See `DESIGN.md`.
///
/// # Errors
///
/// Propagates an I/O error if the efivarfs directory itself could not be listed.
pub fn list_boot_slots() -> InstallResult<Vec<u16>> {
    let dir = Path::new(EFIVARS_DIR);
    let entries = fs::read_dir(dir).map_err(|e| InstallError::io(dir, e))?;

    let mut slots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| InstallError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };

        let Some(rest) = name.strip_prefix("Boot") else { continue };
        let Some((digits, guid)) = rest.split_once('-') else { continue };
        if digits.len() != 4 || guid != EFI_GLOBAL_GUID {
            continue;
        }
        if let Ok(slot) = u16::from_str_radix(digits, 16) {
            slots.push(slot);
        }
    }

    slots.sort_unstable();
    Ok(slots)
}

/// Reads and decodes the `Boot####` entry for `slot`.
///
/// # Errors
///
/// Propagates I/O and decode errors.
pub fn get_boot_option(slot: u16) -> InstallResult<BootOption> {
    let raw = read_variable(&format!("Boot{slot:04X}"), EFI_GLOBAL_GUID)?;
    boot_option::decode(&raw)
}

/// Writes a new `Boot####` entry for `slot` pointing at `file_path` on the named partition.
///
/// # Errors
///
/// Propagates the underlying I/O error.
pub fn set_boot_option(
    slot: u16,
    title: &str,
    part_number: u32,
    part_start: u64,
    part_size: u64,
    part_uuid: Uuid,
    file_path: &str,
) -> InstallResult<()> {
    let bytes = boot_option::encode(title, part_number, part_start, part_size, part_uuid, file_path);
    write_variable(&format!("Boot{slot:04X}"), EFI_GLOBAL_GUID, &bytes)
}

/// Deletes the `Boot####` entry for `slot`.
///
/// # Errors
///
/// Propagates the underlying I/O error.
pub fn remove_boot_option(slot: u16) -> InstallResult<()> {
    delete_variable(&format!("Boot{slot:04X}"), EFI_GLOBAL_GUID)
}

/// Reads `BootOrder` as a list of slots, in firmware order.
///
/// Returns an empty `Vec` if the variable is absent, matching the "absent-but-expected"
/// category.
///
/// # Errors
///
/// Returns [`InstallError::MalformedRecord`] if the value's length is not a multiple of 2.
pub fn get_boot_order() -> InstallResult<Vec<u16>> {
    let value = match read_variable("BootOrder", EFI_GLOBAL_GUID) {
        Ok(v) => v,
        Err(InstallError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    if value.len() % 2 != 0 {
        return Err(InstallError::MalformedRecord("BootOrder length is not a multiple of 2"));
    }

    Ok(value
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Writes `BootOrder`.
///
/// # Errors
///
/// Propagates the underlying I/O error.
pub fn set_boot_order(order: &[u16]) -> InstallResult<()> {
    let bytes: Vec<u8> = order.iter().flat_map(|s| s.to_le_bytes()).collect();
    write_variable("BootOrder", EFI_GLOBAL_GUID, &bytes)
}

/// Finds an existing `Boot####` slot pointing at the same partition and file path, or the
/// smallest unused slot if none matches.
///
/// Returns `(slot, already_existed)`.
///
/// # Errors
///
/// Propagates any I/O error encountered while listing or reading existing slots.
pub fn find_slot(part_uuid: Uuid, file_path: &str) -> InstallResult<(u16, bool)> {
    let slots = list_boot_slots()?;

    for &slot in &slots {
        if let Ok(option) = get_boot_option(slot) {
            if option.part_uuid == Some(part_uuid) && option.file_path.as_deref() == Some(file_path) {
                return Ok((slot, true));
            }
        }
    }

    for (i, &slot) in slots.iter().enumerate() {
        let expected = u16::try_from(i).unwrap_or(u16::MAX);
        if slot != expected {
            return Ok((expected, false));
        }
    }

    let next = u16::try_from(slots.len()).map_err(|_| InstallError::NoFreeSlot)?;
    Ok((next, false))
}

/// Inserts `slot` into `BootOrder`: at the head on a first install, at the tail on an update,
/// or not at all if it is already present.
///
/// # Errors
///
/// Propagates any I/O error from reading or writing `BootOrder`.
pub fn insert_into_order(slot: u16, first: bool) -> InstallResult<()> {
    let mut order = get_boot_order()?;
    if order.contains(&slot) {
        return Ok(());
    }
    if first {
        order.insert(0, slot);
    } else {
        order.push(slot);
    }
    set_boot_order(&order)
}

/// Removes `slot` from `BootOrder`, preserving the relative order of the rest.
///
/// # Errors
///
/// Propagates any I/O error from reading or writing `BootOrder`.
pub fn remove_from_order(slot: u16) -> InstallResult<()> {
    let mut order = get_boot_order()?;
    let before = order.len();
    order.retain(|&s| s != slot);
    if order.len() != before {
        set_boot_order(&order)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_option_active_bit_matches_spec() {
        assert_eq!(LOAD_OPTION_ACTIVE, 1);
    }
}
