// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Encoding and decoding of the `Boot####` variable binary layout:
//!
//! ```text
//! u32 attributes
//! u16 device_path_length
//! u16 title[]         // NUL-terminated UTF-16LE
//! device_path[device_path_length]
//! optional_data[]      // remainder, unused here
//! ```

use bootctl_codec::{utf16le_to_utf8, utf8_capacity_for, utf8_to_utf16le};
use uuid::Uuid;

use crate::device_path;
use crate::error::{InstallError, InstallResult};

/// `LOAD_OPTION_ACTIVE`: the entry is a candidate for `BootOrder`.
pub const LOAD_OPTION_ACTIVE: u32 = 0x0000_0001;

/// A decoded `Boot####` entry, as far as this installer needs to understand one.
#[derive(Debug, Clone)]
pub struct BootOption {
    pub attributes: u32,
    pub title: String,
    pub part_uuid: Option<Uuid>,
    pub file_path: Option<String>,
}

/// Builds the binary payload for a new `Boot####` variable pointing at `file_path` on the
/// partition identified by `part_uuid`/`part_number`/`part_start`/`part_size`.
#[must_use = "Has no effect if the result is unused"]
pub fn encode(
    title: &str,
    part_number: u32,
    part_start: u64,
    part_size: u64,
    part_uuid: Uuid,
    file_path: &str,
) -> Vec<u8> {
    let device_path = device_path::build(part_number, part_start, part_size, part_uuid, file_path);

    let mut title_utf16 = vec![0u8; 2 * (title.chars().count() + 1)];
    let units = utf8_to_utf16le(title, &mut title_utf16);
    title_utf16.truncate(units * 2);
    title_utf16.extend_from_slice(&0u16.to_le_bytes());

    let device_path_length = u16::try_from(device_path.len()).unwrap_or(u16::MAX);

    let mut out = Vec::with_capacity(4 + 2 + title_utf16.len() + device_path.len());
    out.extend_from_slice(&LOAD_OPTION_ACTIVE.to_le_bytes());
    out.extend_from_slice(&device_path_length.to_le_bytes());
    out.extend_from_slice(&title_utf16);
    out.extend_from_slice(&device_path);
    out
}

/// Decodes a `Boot####` variable's raw bytes.
///
/// # Errors
///
/// Returns [`InstallError::MalformedRecord`] if `bytes` is shorter than the fixed header, or
/// the title is not NUL-terminated within the buffer.
pub fn decode(bytes: &[u8]) -> InstallResult<BootOption> {
    if bytes.len() < 6 {
        return Err(InstallError::MalformedRecord("Boot#### entry shorter than its header"));
    }

    let attributes = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let device_path_length = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;

    let title_bytes = &bytes[6..];
    let title_unit_count = title_bytes
        .chunks_exact(2)
        .take_while(|c| u16::from_le_bytes([c[0], c[1]]) != 0)
        .count();
    let title_byte_len = title_unit_count * 2 + 2; // + NUL terminator

    let mut utf8 = vec![0u8; utf8_capacity_for(title_unit_count * 2)];
    let written = utf16le_to_utf8(&title_bytes[..title_unit_count * 2], &mut utf8);
    utf8.truncate(written);
    let title = String::from_utf8_lossy(&utf8).into_owned();

    let device_path_start = 6 + title_byte_len;
    let device_path_end = device_path_start + device_path_length;
    if device_path_end > bytes.len() {
        return Err(InstallError::MalformedRecord("Boot#### device path length exceeds buffer"));
    }

    let parsed = device_path::walk(&bytes[device_path_start..device_path_end])?;

    Ok(BootOption {
        attributes,
        title,
        part_uuid: parsed.part_uuid,
        file_path: parsed.file_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let uuid = Uuid::parse_str("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee").unwrap();
        let bytes = encode("Linux Boot Manager", 1, 2048, 532_480, uuid, "/EFI/gummiboot/gummibootx64.efi");
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.title, "Linux Boot Manager");
        assert_eq!(decoded.part_uuid, Some(uuid));
        assert_eq!(decoded.file_path.as_deref(), Some("/EFI/gummiboot/gummibootx64.efi"));
        assert_eq!(decoded.attributes, LOAD_OPTION_ACTIVE);
    }

    #[test]
    fn rejects_too_short() {
        assert!(decode(&[0, 0, 0]).is_err());
    }
}
