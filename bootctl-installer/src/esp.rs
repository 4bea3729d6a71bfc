// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Verifies that a path is the root of a mounted EFI System Partition.

use std::os::unix::fs::MetadataExt;
use std::path::Path;

use nix::sys::statfs;
use uuid::Uuid;

use crate::error::{InstallError, InstallResult};
use crate::udev::BlockInfo;

/// GPT partition type GUID of the EFI System Partition.
const ESP_PARTITION_TYPE: &str = "c12a7328-f81f-11d2-ba4b-00a0c93ec93b";

/// The FAT/MS-DOS superblock magic reported by `statfs(2)`.
const MSDOS_SUPER_MAGIC: i64 = 0x4d44;

/// The partition geometry and identity needed to build a `Boot####` device path.
#[derive(Debug, Clone)]
pub struct EspInfo {
    pub part_uuid: Uuid,
    pub part_number: u32,
    pub part_start: u64,
    pub part_size: u64,
}

/// Verifies that `path` is the mounted root of a GPT EFI System Partition, returning its
/// partition geometry on success.
///
/// # Errors
///
/// Returns [`InstallError::NotEsp`] naming the first violated check, or an I/O error if any of
/// the probes themselves could not be performed.
pub fn verify(path: &Path) -> InstallResult<EspInfo> {
    let sfs = statfs::statfs(path).map_err(|e| InstallError::io(path, e.into()))?;
    if sfs.filesystem_type().0 != MSDOS_SUPER_MAGIC {
        return Err(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "not a FAT filesystem",
        });
    }

    let meta = std::fs::metadata(path).map_err(|e| InstallError::io(path, e))?;
    let parent = path.join("..");
    let parent_meta = std::fs::metadata(&parent).map_err(|e| InstallError::io(parent, e))?;
    if meta.dev() == parent_meta.dev() {
        return Err(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "not the root of a mounted filesystem",
        });
    }

    let major = unsafe { libc::major(meta.dev()) };
    let minor = unsafe { libc::minor(meta.dev()) };
    if major == 0 {
        return Err(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "not backed by a real block device",
        });
    }

    let info = BlockInfo::probe(major, minor)?;
    info_from_block(&info, path)
}

/// Validates a [`BlockInfo`] against the ESP checks and parses its geometry fields, given the
/// path being verified (used only to name the violation on error). Pure: no syscalls.
///
/// # Errors
///
/// Returns [`InstallError::NotEsp`] naming the first violated check or unparseable field.
fn info_from_block(info: &BlockInfo, path: &Path) -> InstallResult<EspInfo> {
    if info.fs_type.as_deref() != Some("vfat") {
        return Err(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "block device is not vfat",
        });
    }
    if info.part_entry_scheme.as_deref() != Some("gpt") {
        return Err(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "partition table is not GPT",
        });
    }
    if info.part_entry_type.as_deref() != Some(ESP_PARTITION_TYPE) {
        return Err(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "partition type is not the EFI System Partition GUID",
        });
    }

    let part_uuid = info
        .part_entry_uuid
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "missing or malformed partition UUID",
        })?;
    let part_number = info
        .part_entry_number
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "missing or malformed partition number",
        })?;
    let part_start = info
        .part_entry_offset
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "missing or malformed partition offset",
        })?;
    let part_size = info
        .part_entry_size
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or(InstallError::NotEsp {
            path: path.to_path_buf(),
            reason: "missing or malformed partition size",
        })?;

    Ok(EspInfo {
        part_uuid,
        part_number,
        part_start,
        part_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_block_info() -> BlockInfo {
        BlockInfo {
            fs_type: Some("vfat".to_string()),
            part_entry_scheme: Some("gpt".to_string()),
            part_entry_type: Some(ESP_PARTITION_TYPE.to_string()),
            part_entry_uuid: Some("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee".to_string()),
            part_entry_number: Some("1".to_string()),
            part_entry_offset: Some("2048".to_string()),
            part_entry_size: Some("532480".to_string()),
        }
    }

    #[test]
    fn accepts_a_well_formed_esp() {
        let info = info_from_block(&valid_block_info(), Path::new("/boot")).unwrap();
        assert_eq!(info.part_number, 1);
        assert_eq!(info.part_start, 2048);
        assert_eq!(info.part_size, 532_480);
    }

    #[test]
    fn rejects_non_vfat_filesystem() {
        let info = BlockInfo {
            fs_type: Some("ext4".to_string()),
            ..valid_block_info()
        };
        assert!(matches!(
            info_from_block(&info, Path::new("/boot")),
            Err(InstallError::NotEsp { reason: "block device is not vfat", .. })
        ));
    }

    #[test]
    fn rejects_non_gpt_partition_table() {
        let info = BlockInfo {
            part_entry_scheme: Some("mbr".to_string()),
            ..valid_block_info()
        };
        assert!(matches!(
            info_from_block(&info, Path::new("/boot")),
            Err(InstallError::NotEsp { reason: "partition table is not GPT", .. })
        ));
    }

    #[test]
    fn rejects_non_esp_partition_type() {
        let info = BlockInfo {
            part_entry_type: Some("0fc63daf-8483-4772-8e79-3d69d8477de4".to_string()),
            ..valid_block_info()
        };
        assert!(matches!(
            info_from_block(&info, Path::new("/boot")),
            Err(InstallError::NotEsp { reason: "partition type is not the EFI System Partition GUID", .. })
        ));
    }

    #[test]
    fn rejects_malformed_partition_uuid() {
        let info = BlockInfo {
            part_entry_uuid: Some("not-a-uuid".to_string()),
            ..valid_block_info()
        };
        assert!(matches!(
            info_from_block(&info, Path::new("/boot")),
            Err(InstallError::NotEsp { reason: "missing or malformed partition UUID", .. })
        ));
    }

    #[test]
    fn rejects_missing_partition_number() {
        let info = BlockInfo {
            part_entry_number: None,
            ..valid_block_info()
        };
        assert!(matches!(
            info_from_block(&info, Path::new("/boot")),
            Err(InstallError::NotEsp { reason: "missing or malformed partition number", .. })
        ));
    }
}
