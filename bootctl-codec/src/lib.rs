// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! UTF-16LE/UTF-8 conversion and path slash canonicalization.
//!
//! Both the firmware loader and the host installer need to move strings between UTF-16LE
//! (as used by UEFI variables and device path nodes) and UTF-8 (as used everywhere else).
//! This crate has no knowledge of either environment; it only operates on byte slices.

#![no_std]

/// Returns the minimum output buffer capacity required to decode `len` bytes of UTF-16LE.
///
/// Every UTF-16 code unit expands to at most 3 UTF-8 bytes, plus a terminating NUL.
#[must_use = "Has no effect if the result is unused"]
pub const fn utf8_capacity_for(len: usize) -> usize {
    3 * len / 2 + 1
}

/// Decodes a UTF-16LE byte buffer into `out` as UTF-8, stopping at the first NUL code unit
/// or when `input` is exhausted, whichever comes first.
///
/// This does not combine surrogate pairs: each 16-bit code unit is encoded independently,
/// exactly like [`char::from_u32`] would if surrogates were accepted. This preserves
/// firmware strings that may already be ill-formed rather than rejecting them.
///
/// Returns the number of bytes written to `out`, not including any terminator.
///
/// # Panics
///
/// Panics if `out` is smaller than [`utf8_capacity_for`] applied to `input.len()`.
pub fn utf16le_to_utf8(input: &[u8], out: &mut [u8]) -> usize {
    assert!(out.len() >= utf8_capacity_for(input.len()));

    let mut written = 0;
    for unit in input.chunks_exact(2) {
        let code = u16::from_le_bytes([unit[0], unit[1]]);
        if code == 0 {
            break;
        }
        written += encode_code_unit(code, &mut out[written..]);
    }
    written
}

/// Encodes a single UTF-16 code unit (surrogate or not) as WTF-8-style UTF-8 bytes.
fn encode_code_unit(code: u16, out: &mut [u8]) -> usize {
    let code = u32::from(code);
    if code < 0x80 {
        out[0] = code as u8;
        1
    } else if code < 0x800 {
        out[0] = 0xC0 | (code >> 6) as u8;
        out[1] = 0x80 | (code & 0x3F) as u8;
        2
    } else {
        out[0] = 0xE0 | (code >> 12) as u8;
        out[1] = 0x80 | ((code >> 6) & 0x3F) as u8;
        out[2] = 0x80 | (code & 0x3F) as u8;
        3
    }
}

/// Encodes a UTF-8 string back into UTF-16LE, writing each code unit as two bytes into `out`.
///
/// Returns the number of code units written. `out` must be at least `2 * input.chars().count()`
/// bytes, which the caller is expected to size generously since this is only used for round-trip
/// tests and for building loader variable payloads from known-good UTF-8.
pub fn utf8_to_utf16le(input: &str, out: &mut [u8]) -> usize {
    let mut units = 0;
    for ch in input.encode_utf16() {
        let bytes = ch.to_le_bytes();
        out[units * 2] = bytes[0];
        out[units * 2 + 1] = bytes[1];
        units += 1;
    }
    units
}

/// Replaces every backslash with a forward slash, in place, returning the number of bytes in
/// `buf` that hold the result (callers pass an owned, mutable copy of the path bytes).
///
/// Used when a device-path file-path node is converted to a host-side path.
pub fn tilt_slashes(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        if *b == b'\\' {
            *b = b'/';
        }
    }
}

/// Replaces every forward slash with a backslash, in place.
///
/// Used when a host-side or user-supplied path is normalized for use in a UEFI device path
/// or `.conf` file.
pub fn normalize_slashes(buf: &mut [u8]) {
    for b in buf.iter_mut() {
        if *b == b'/' {
            *b = b'\\';
        }
    }
}

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::{vec, vec::Vec};

    #[test]
    fn ascii_round_trips() {
        let input = "hello world";
        let mut utf16 = [0u8; 64];
        let units = utf8_to_utf16le(input, &mut utf16);

        let mut utf8 = [0u8; 64];
        let written = utf16le_to_utf8(&utf16[..units * 2], &mut utf8);
        assert_eq!(&utf8[..written], input.as_bytes());
    }

    #[test]
    fn stops_at_nul() {
        let mut utf16 = [0u8; 16];
        utf8_to_utf16le("ab", &mut utf16);
        // append an explicit NUL code unit followed by garbage that must never be decoded.
        utf16[4] = 0;
        utf16[5] = 0;
        utf16[6] = b'X';
        utf16[7] = 0;

        let mut out = [0u8; 32];
        let written = utf16le_to_utf8(&utf16, &mut out);
        assert_eq!(&out[..written], b"ab");
    }

    #[test]
    fn tilts_and_normalizes() {
        let mut buf = *b"\\EFI\\BOOT\\BOOTX64.EFI";
        tilt_slashes(&mut buf);
        assert_eq!(&buf, b"/EFI/BOOT/BOOTX64.EFI");
        normalize_slashes(&mut buf);
        assert_eq!(&buf, b"\\EFI\\BOOT\\BOOTX64.EFI");
    }

    #[test]
    fn capacity_matches_spec_formula() {
        assert_eq!(utf8_capacity_for(10), 3 * 10 / 2 + 1);
    }

    proptest! {
        #[test]
        fn round_trip_preserves_printable_ascii(s in "[ -~]{0,32}") {
            let mut utf16 = vec![0u8; 2 * (s.chars().count() + 1)];
            let units = utf8_to_utf16le(&s, &mut utf16);

            let mut utf8 = vec![0u8; utf8_capacity_for(units * 2)];
            let written = utf16le_to_utf8(&utf16[..units * 2], &mut utf8);

            prop_assert_eq!(&utf8[..written], s.as_bytes());
        }

        #[test]
        fn tilt_slashes_never_leaves_a_backslash(bytes in any::<Vec<u8>>()) {
            let mut buf = bytes;
            tilt_slashes(&mut buf);
            prop_assert!(!buf.contains(&b'\\'));
        }

        #[test]
        fn normalize_slashes_never_leaves_a_forward_slash(bytes in any::<Vec<u8>>()) {
            let mut buf = bytes;
            normalize_slashes(&mut buf);
            prop_assert!(!buf.contains(&b'/'));
        }

        #[test]
        fn tilt_then_normalize_round_trips_backslash_only_paths(bytes in prop::collection::vec(prop_oneof![Just(b'\\'), 1u8..0x7f], 0..32)) {
            let mut buf: Vec<u8> = bytes.into_iter().filter(|b| *b != b'/').collect();
            let original = buf.clone();
            tilt_slashes(&mut buf);
            normalize_slashes(&mut buf);
            prop_assert_eq!(buf, original);
        }
    }
}
