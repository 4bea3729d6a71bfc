// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Loads and starts the entry the menu selected.
//!
//! Builds a device path from `(entry.device, entry.loader_path)`, loads the image through the
//! firmware's image-loading service, sets `LoadOptions` from (in order of precedence)
//! `options_edit`, `entry.options` (already augmented with `LoaderEntryOptions-<machine_id>` by
//! the catalog build), further augmented with `LoaderEntryOptionsOneShot-<machine_id>` for this
//! boot only, records [`fw_vars::LOADER_TICKS_EXEC`], then starts the image and unloads it on
//! return.

use core::cell::RefCell;

use alloc::string::String;
use thiserror::Error;
use uefi::{
    CString16, Handle, Status,
    boot::{self, ScopedProtocol},
    proto::{device_path::DevicePath, loaded_image::LoadedImage},
};

use crate::{
    BootResult,
    entry::Entry,
    fw_vars::{self, LOADER_TICKS_EXEC},
    system::helper::{join_to_device_path, str_to_cstr},
};

/// An `Error` that may result from loading or starting an image.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The entry did not carry a device handle.
    #[error("Entry \"{0}\" attempted to boot without a device handle")]
    MissingDevice(String),

    /// The entry's `kind` was not a bootable kind (or the image rejected the load for policy
    /// reasons: access denied or security violation). This is non-retriable for the session.
    #[error("Entry \"{0}\" was rejected by firmware policy: {1:?}")]
    PolicyRejected(String, Status),
}

/// Storage for `LoadOptions`, kept alive for the lifetime of the loaded image.
///
/// The UEFI loaded-image protocol only stores a pointer and a size; the buffer it points to must
/// outlive the call to `boot::start_image`, so it cannot live on the stack of the function that
/// sets it up.
static LOAD_OPTIONS: LoadOptions = LoadOptions {
    options: RefCell::new(None),
};

/// Wraps a [`CString16`] with load options behind a [`RefCell`] so it can be replaced on every
/// boot attempt without requiring `&mut` access to a `static`.
struct LoadOptions {
    /// The currently active load options, if any.
    options: RefCell<Option<CString16>>,
}

impl LoadOptions {
    /// Replaces the stored load options.
    fn set(&self, s: &uefi::CStr16) {
        *self.options.borrow_mut() = Some(s.into());
    }

    /// The raw pointer to pass to [`LoadedImage::set_load_options`].
    fn ptr(&self) -> Option<*const u8> {
        self.options
            .borrow()
            .as_ref()
            .map(|x| x.as_ptr().cast::<u8>())
    }

    /// The byte length to pass to [`LoadedImage::set_load_options`].
    fn size(&self) -> u32 {
        self.options
            .borrow()
            .as_ref()
            .map_or(0, |x| u32::try_from(x.num_bytes()).unwrap_or(u32::MAX))
    }

    /// Installs the stored options onto `image`, if any are set.
    fn apply(&self, image: &mut ScopedProtocol<LoadedImage>) {
        if let Some(ptr) = self.ptr() {
            // SAFETY: `LOAD_OPTIONS` is a `static`, so the buffer outlives the loaded image.
            unsafe {
                image.set_load_options(ptr, self.size());
            }
        }
    }
}

// SAFETY: the firmware execution environment is single-threaded.
unsafe impl Sync for LoadOptions {}

/// Loads `entry`, sets its load options, starts it, and records the exec telemetry tick.
///
/// `options_edit`, if given, overrides `entry.options` for this boot only.
///
/// # Errors
///
/// Returns [`LoadError::MissingDevice`] if the entry has no device handle, or wraps the
/// underlying UEFI error (image-load or image-start failure) otherwise. Callers should treat
/// [`uefi::Status::ACCESS_DENIED`] and [`uefi::Status::SECURITY_VIOLATION`] as fatal for the
/// session; every other error should redisplay the menu with the countdown disabled.
pub fn load_and_start(entry: &Entry, options_edit: Option<&str>) -> BootResult<()> {
    let device = entry
        .device
        .ok_or_else(|| crate::error::BootError::LoadError(LoadError::MissingDevice(entry.id.clone())))?;

    let image_handle = load_image(device, &entry.loader_path)?;

    let effective_options = match options_edit {
        Some(edit) => String::from(edit),
        None => {
            let mut options = entry.options.clone();
            if let Some(machine_id) = entry.machine_id.as_deref()
                && let Some(oneshot) = fw_vars::take_entry_options_oneshot(machine_id)?
            {
                fw_vars::append_options(&mut options, &oneshot);
            }
            options
        }
    };
    apply_options(image_handle, Some(effective_options.as_str()))?;

    let _ = fw_vars::record_ticks(LOADER_TICKS_EXEC);

    let result = boot::start_image(image_handle);
    // the image is only ever unloaded if starting it failed; a successful start hands control
    // to the loaded image, which never returns.
    if result.is_err() {
        let _ = boot::unload_image(image_handle);
    }
    Ok(result?)
}

/// Builds a device path to `path` on `device` and loads the resulting image.
fn load_image(device: Handle, path: &str) -> BootResult<Handle> {
    let dev_path = boot::open_protocol_exclusive::<DevicePath>(device)?;
    let cpath = str_to_cstr(path)?;
    let mut buf = [0; 2048];
    let full_path = join_to_device_path(&dev_path, &cpath, &mut buf)?;

    let src = boot::LoadImageSource::FromDevicePath {
        device_path: &full_path,
        boot_policy: uefi::proto::BootPolicy::BootSelection,
    };
    Ok(boot::load_image(boot::image_handle(), src)?)
}

/// Sets `LoadOptions` on the just-loaded image.
fn apply_options(image_handle: Handle, options: Option<&str>) -> BootResult<()> {
    let mut image = boot::open_protocol_exclusive::<LoadedImage>(image_handle)?;
    if let Some(options) = options
        && !options.is_empty()
    {
        LOAD_OPTIONS.set(&str_to_cstr(options)?);
        LOAD_OPTIONS.apply(&mut image);
    }
    Ok(())
}

/// Returns true if `status` indicates a signed-image policy rejection that should abort the
/// session rather than fall back to redisplaying the menu.
#[must_use = "Has no effect if the result is unused"]
pub fn is_policy_fatal(status: Status) -> bool {
    matches!(status, Status::ACCESS_DENIED | Status::SECURITY_VIOLATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_and_security_violation_are_policy_fatal() {
        assert!(is_policy_fatal(Status::ACCESS_DENIED));
        assert!(is_policy_fatal(Status::SECURITY_VIOLATION));
        assert!(!is_policy_fatal(Status::NOT_FOUND));
    }
}
