// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Partition metadata lookup via the udev device database.
//!
//! The original probed the block device directly with libblkid. No blkid binding exists in
//! this workspace's dependency stack, but the kernel's `udevd` already runs the same superblock
//! and partition-table probes at device-add time and caches the results at
//! `/run/udev/data/b<major>:<minor>`, one `KEY=value` pair per line. Reading that file gives the
//! same `ID_FS_TYPE` / `ID_PART_ENTRY_*` properties blkid would have reported, without linking a
//! new library.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::error::{InstallError, InstallResult};

/// The subset of a block device's udev properties this installer cares about.
#[derive(Debug, Default)]
pub struct BlockInfo {
    pub fs_type: Option<String>,
    pub part_entry_scheme: Option<String>,
    pub part_entry_type: Option<String>,
    pub part_entry_uuid: Option<String>,
    pub part_entry_number: Option<String>,
    pub part_entry_offset: Option<String>,
    pub part_entry_size: Option<String>,
}

impl BlockInfo {
    /// Looks up the udev record for the block device `major:minor`.
    ///
    /// # Errors
    ///
    /// May return an `Error` if the udev database entry for the device does not exist or could
    /// not be read.
    pub fn probe(major: u32, minor: u32) -> InstallResult<Self> {
        let path = PathBuf::from(format!("/run/udev/data/b{major}:{minor}"));
        let content = fs::read_to_string(&path).map_err(|e| InstallError::io(path, e))?;

        let props: HashMap<&str, &str> = content
            .lines()
            .filter_map(|line| line.strip_prefix("E:"))
            .filter_map(|line| line.split_once('='))
            .collect();

        Ok(Self {
            fs_type: props.get("ID_FS_TYPE").map(|s| (*s).to_string()),
            part_entry_scheme: props.get("ID_PART_ENTRY_SCHEME").map(|s| (*s).to_string()),
            part_entry_type: props.get("ID_PART_ENTRY_TYPE").map(|s| (*s).to_string()),
            part_entry_uuid: props.get("ID_PART_ENTRY_UUID").map(|s| (*s).to_string()),
            part_entry_number: props.get("ID_PART_ENTRY_NUMBER").map(|s| (*s).to_string()),
            part_entry_offset: props.get("ID_PART_ENTRY_OFFSET").map(|s| (*s).to_string()),
            part_entry_size: props.get("ID_PART_ENTRY_SIZE").map(|s| (*s).to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_e_prefixed_properties_only() {
        let content = "S:disk/by-partuuid/abc\nE:ID_FS_TYPE=vfat\nE:ID_PART_ENTRY_SCHEME=gpt\nG:disk\n";
        let props: HashMap<&str, &str> = content
            .lines()
            .filter_map(|line| line.strip_prefix("E:"))
            .filter_map(|line| line.split_once('='))
            .collect();
        assert_eq!(props.get("ID_FS_TYPE"), Some(&"vfat"));
        assert_eq!(props.get("ID_PART_ENTRY_SCHEME"), Some(&"gpt"));
        assert_eq!(props.len(), 2);
    }
}
