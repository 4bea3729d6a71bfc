// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Building and walking the UEFI device-path bytes embedded in a `Boot####` variable.
//!
//! Only the two node kinds the installer ever writes or needs to recognize are handled: the
//! GPT Hard Drive Media node and the File Path Media node, terminated by the End-of-Path node.
//! Unknown node kinds are skipped by their declared length, exactly as the firmware itself does.

use bootctl_codec::{tilt_slashes, utf16le_to_utf8, utf8_capacity_for, utf8_to_utf16le};
use uuid::Uuid;

use crate::error::InstallResult;

const TYPE_MEDIA: u8 = 0x04;
const SUBTYPE_HARD_DRIVE: u8 = 0x01;
const SUBTYPE_FILE_PATH: u8 = 0x04;
const TYPE_END: u8 = 0x7f;
const SUBTYPE_END_ENTIRE: u8 = 0xff;

const MBR_TYPE_GPT: u8 = 0x02;
const SIGNATURE_TYPE_GUID: u8 = 0x02;

/// Converts a canonical (big-endian, RFC 4122) GUID into the mixed-endian layout EFI stores on
/// the wire, or back again — the transform is its own inverse.
#[must_use = "Has no effect if the result is unused"]
pub fn swap_guid_endianness(guid: &[u8; 16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[0..4].copy_from_slice(&[guid[3], guid[2], guid[1], guid[0]]);
    out[4..6].copy_from_slice(&[guid[5], guid[4]]);
    out[6..8].copy_from_slice(&[guid[7], guid[6]]);
    out[8..16].copy_from_slice(&guid[8..16]);
    out
}

/// Builds the device-path bytes for `<GPT hard drive>/<file path>/<end>`.
#[must_use = "Has no effect if the result is unused"]
pub fn build(part_number: u32, part_start: u64, part_size: u64, part_uuid: Uuid, file_path: &str) -> Vec<u8> {
    let mut out = Vec::new();

    let signature = swap_guid_endianness(part_uuid.as_bytes());
    let drive_len: u16 = 4 + 4 + 8 + 8 + 16 + 1 + 1;
    out.push(TYPE_MEDIA);
    out.push(SUBTYPE_HARD_DRIVE);
    out.extend_from_slice(&drive_len.to_le_bytes());
    out.extend_from_slice(&part_number.to_le_bytes());
    out.extend_from_slice(&part_start.to_le_bytes());
    out.extend_from_slice(&part_size.to_le_bytes());
    out.extend_from_slice(&signature);
    out.push(MBR_TYPE_GPT);
    out.push(SIGNATURE_TYPE_GUID);

    let mut backslashed = file_path.as_bytes().to_vec();
    bootctl_codec::normalize_slashes(&mut backslashed);
    let backslashed = String::from_utf8_lossy(&backslashed);

    let mut utf16 = vec![0u8; 2 * (backslashed.chars().count() + 1)];
    let units = utf8_to_utf16le(&backslashed, &mut utf16);
    utf16.truncate(units * 2);
    utf16.extend_from_slice(&0u16.to_le_bytes());

    let file_len = u16::try_from(4 + utf16.len()).unwrap_or(u16::MAX);
    out.push(TYPE_MEDIA);
    out.push(SUBTYPE_FILE_PATH);
    out.extend_from_slice(&file_len.to_le_bytes());
    out.extend_from_slice(&utf16);

    out.push(TYPE_END);
    out.push(SUBTYPE_END_ENTIRE);
    out.extend_from_slice(&4u16.to_le_bytes());

    out
}

/// What [`walk`] extracts from a device path: the partition's canonical GUID and, if present,
/// the file path (slashes normalized to forward slashes).
#[derive(Debug, Default, Clone)]
pub struct ParsedDevicePath {
    pub part_uuid: Option<Uuid>,
    pub file_path: Option<String>,
}

/// Walks device-path nodes, extracting the GPT signature and file path, stopping at the first
/// malformed node (`length < 4`) or the end-of-path marker.
///
/// # Errors
///
/// Never actually errors today; malformed nodes are silently treated as the end of the path,
/// matching the "malformed record is skipped" handling used throughout the installer. The
/// `Result` is kept so a future stricter mode can reject instead.
pub fn walk(bytes: &[u8]) -> InstallResult<ParsedDevicePath> {
    let mut parsed = ParsedDevicePath::default();
    let mut offset = 0usize;

    while offset + 4 <= bytes.len() {
        let node_type = bytes[offset];
        let sub_type = bytes[offset + 1];
        let length = u16::from_le_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;

        if length < 4 {
            break;
        }
        if node_type == TYPE_END && sub_type == SUBTYPE_END_ENTIRE {
            break;
        }
        if offset + length > bytes.len() {
            break;
        }

        if node_type == TYPE_MEDIA && sub_type == SUBTYPE_HARD_DRIVE && length >= 4 + 38 {
            let sig_start = offset + 4 + 20;
            let mbr_type = bytes[offset + 4 + 36];
            let signature_type = bytes[offset + 4 + 37];
            if mbr_type == MBR_TYPE_GPT && signature_type == SIGNATURE_TYPE_GUID {
                let mut raw = [0u8; 16];
                raw.copy_from_slice(&bytes[sig_start..sig_start + 16]);
                parsed.part_uuid = Some(Uuid::from_bytes(swap_guid_endianness(&raw)));
            }
        } else if node_type == TYPE_MEDIA && sub_type == SUBTYPE_FILE_PATH {
            let path_bytes = &bytes[offset + 4..offset + length];
            let mut utf8 = vec![0u8; utf8_capacity_for(path_bytes.len())];
            let written = utf16le_to_utf8(path_bytes, &mut utf8);
            utf8.truncate(written);
            tilt_slashes(&mut utf8);
            parsed.file_path = Some(String::from_utf8_lossy(&utf8).into_owned());
        }

        offset += length;
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_swap_is_its_own_inverse() {
        let original = *uuid::Uuid::parse_str("c12a7328-f81f-11d2-ba4b-00a0c93ec93b").unwrap().as_bytes();
        let swapped = swap_guid_endianness(&original);
        let back = swap_guid_endianness(&swapped);
        assert_eq!(original, back);
        assert_ne!(original, swapped);
    }

    #[test]
    fn round_trips_through_build_and_walk() {
        let uuid = Uuid::parse_str("11111111-2222-3333-4444-555555555555").unwrap();
        let bytes = build(2, 2048, 1_000_000, uuid, "/EFI/gummiboot/gummibootx64.efi");
        let parsed = walk(&bytes).unwrap();
        assert_eq!(parsed.part_uuid, Some(uuid));
        assert_eq!(parsed.file_path.as_deref(), Some("/EFI/gummiboot/gummibootx64.efi"));
    }

    #[test]
    fn stops_at_malformed_node() {
        let bytes = [0x01, 0x02, 0x00, 0x00];
        let parsed = walk(&bytes).unwrap();
        assert!(parsed.part_uuid.is_none());
        assert!(parsed.file_path.is_none());
    }
}
