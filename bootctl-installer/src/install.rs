// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Orchestrates the `status`/`install`/`update`/`remove` verbs over an EFI System Partition.

use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::copy;
use crate::error::InstallResult;
use crate::esp::{self, EspInfo};
use crate::fw_vars;
use crate::loader_info;

const LOADER_PATH: &str = "/EFI/gummiboot/gummibootx64.efi";
const LOADER_TITLE: &str = "Linux Boot Manager";

/// Reports the loader binaries present on the ESP and, when `touch_variables` is set, the
/// `Boot####`/`BootOrder` state in NVRAM.
///
/// # Errors
///
/// Propagates I/O errors encountered while listing the ESP's directories or reading firmware
/// variables.
pub fn status(esp_path: &Path, touch_variables: bool) -> InstallResult<()> {
    info!("Boot loader binaries found in ESP:");
    report_binaries(&esp_path.join("EFI/gummiboot"))?;
    report_binaries(&esp_path.join("EFI/BOOT"))?;

    if !touch_variables {
        return Ok(());
    }
    if !fw_vars::is_efi_boot() {
        warn!("Not booted with EFI, not showing EFI variables.");
        return Ok(());
    }

    let order = fw_vars::get_boot_order()?;
    info!("Boot entries found in EFI variables:");
    for &slot in &order {
        if let Ok(option) = fw_vars::get_boot_option(slot) {
            info!("\t{} [ENABLED]", option.title);
        }
    }
    for &slot in &fw_vars::list_boot_slots()? {
        if order.contains(&slot) {
            continue;
        }
        if let Ok(option) = fw_vars::get_boot_option(slot) {
            info!("\t{}", option.title);
        }
    }

    Ok(())
}

fn report_binaries(dir: &Path) -> InstallResult<()> {
    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if name.to_lowercase().ends_with(".efi") {
                        info!("\t{}", dir.join(name).display());
                    }
                }
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(crate::error::InstallError::io(dir, e)),
    }
}

/// Installs or updates the loader on the ESP at `esp_path`.
///
/// `first_install` selects between install semantics (always overwrite, create directories,
/// write a default `loader.conf`, insert the new `Boot####` slot at the head of `BootOrder`)
/// and update semantics (version-gated overwrite, append to the tail of `BootOrder` only if
/// absent).
///
/// # Errors
///
/// Propagates errors from ESP verification, binary copying, or firmware variable access.
pub fn install_or_update(esp_path: &Path, first_install: bool, touch_variables: bool) -> InstallResult<()> {
    let esp_info = esp::verify(esp_path)?;

    copy::install_binaries(esp_path, first_install)?;

    if first_install {
        install_loader_config(esp_path);
    }

    if !touch_variables {
        return Ok(());
    }
    install_variables(esp_path, &esp_info, first_install)
}

fn install_variables(esp_path: &Path, esp_info: &EspInfo, first_install: bool) -> InstallResult<()> {
    if !fw_vars::is_efi_boot() {
        warn!("Not booted with EFI, skipping EFI variable checks.");
        return Ok(());
    }

    let full_path = esp_path.join(LOADER_PATH.trim_start_matches('/'));
    if !full_path.exists() {
        return Ok(());
    }

    let (slot, existed) = fw_vars::find_slot(esp_info.part_uuid, LOADER_PATH)?;

    if first_install || !existed {
        fw_vars::set_boot_option(
            slot,
            LOADER_TITLE,
            esp_info.part_number,
            esp_info.part_start,
            esp_info.part_size,
            esp_info.part_uuid,
            LOADER_PATH,
        )?;
        info!("Created EFI boot entry \"{LOADER_TITLE}\".");
    }

    fw_vars::insert_into_order(slot, first_install)
}

fn install_loader_config(esp_path: &Path) {
    let Ok(os_release) = fs::read_to_string("/etc/os-release") else {
        return;
    };
    let Some(vendor) = os_release
        .lines()
        .find_map(|line| line.strip_prefix("ID="))
        .map(|id| id.trim_matches('"'))
    else {
        return;
    };

    let conf_path = esp_path.join("loader/loader.conf");
    if conf_path.exists() {
        return;
    }
    let contents = format!("#timeout 3\ndefault {vendor}-*\n");
    if let Err(e) = fs::write(&conf_path, contents) {
        warn!("Failed to write {}: {e}", conf_path.display());
    }
}

/// Removes the loader's binaries, directories, and (when `touch_variables` is set) its
/// `Boot####`/`BootOrder` entries from `esp_path`.
///
/// # Errors
///
/// Propagates I/O errors from removing the ESP's directories or firmware variable access.
pub fn remove(esp_path: &Path, touch_variables: bool) -> InstallResult<()> {
    let esp_info = esp::verify(esp_path).ok();

    remove_binaries(esp_path)?;

    if !touch_variables {
        return Ok(());
    }
    if !fw_vars::is_efi_boot() {
        return Ok(());
    }
    let Some(esp_info) = esp_info else {
        return Ok(());
    };

    let (slot, existed) = fw_vars::find_slot(esp_info.part_uuid, LOADER_PATH)?;
    if existed {
        fw_vars::remove_boot_option(slot)?;
        fw_vars::remove_from_order(slot)?;
    }
    Ok(())
}

fn remove_binaries(esp_path: &Path) -> InstallResult<()> {
    let loader_dir = esp_path.join("EFI/gummiboot");
    if loader_dir.exists() {
        fs::remove_dir_all(&loader_dir).map_err(|e| crate::error::InstallError::io(loader_dir, e))?;
    }

    let boot_dir = esp_path.join("EFI/BOOT");
    if let Ok(entries) = fs::read_dir(&boot_dir) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.to_uppercase().starts_with("BOOT") || !name.to_uppercase().ends_with(".EFI") {
                continue;
            }
            let path = entry.path();
            let Ok(Some(info)) = loader_info::read_marker(&path) else {
                continue;
            };
            if info.product == "gummiboot" {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Failed to remove {}: {e}", path.display());
                } else {
                    info!("Removed {}.", path.display());
                }
            }
        }
    }

    for rel in ["loader/entries", "loader", "EFI/BOOT", "EFI/gummiboot", "EFI"] {
        let dir = esp_path.join(rel);
        match fs::remove_dir(&dir) {
            Ok(()) => info!("Removed {}.", dir.display()),
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    || e.raw_os_error() == Some(libc::ENOTEMPTY) => {}
            Err(e) => warn!("Failed to remove {}: {e}", dir.display()),
        }
    }

    Ok(())
}
