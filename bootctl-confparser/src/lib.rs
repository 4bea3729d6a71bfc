// SPDX-FileCopyrightText: 2025 some100 <ootinnyoo@outlook.com>
// SPDX-License-Identifier: MIT

//! Line-oriented key/value scanning for `loader.conf` and `entries/*.conf`, and the natural
//! version comparison used both to sort the entry catalog and to compare `LoaderInfo` markers
//! during installation.
//!
//! This crate touches neither a filesystem nor a UEFI variable; it is handed a byte buffer by
//! whichever side read it and yields borrowed `&str` slices into that buffer. This keeps it
//! usable from both the `no_std` firmware loader and the host installer binary.

#![no_std]

use core::cmp::Ordering;

/// An iterator over the key/value lines of a `.conf`-style buffer.
///
/// For each line: leading/trailing tab and space are stripped; blank lines and lines starting
/// with `#` are skipped; the remainder is split on the first run of tab/space into `(key,
/// value)`, with `value` itself stripped of any further leading whitespace. Lines without a
/// whitespace run (a bare key) are skipped, since every recognized key in this format takes a
/// value.
pub struct ConfLines<'a> {
    rest: &'a str,
}

impl<'a> ConfLines<'a> {
    /// Creates a scanner over `content`, which need not be valid UTF-8 in its entirety: only
    /// the valid-UTF-8 prefix is scanned, matching firmware buffers that may contain trailing
    /// garbage past the number of bytes actually read.
    #[must_use = "Has no effect if the result is unused"]
    pub fn new(content: &'a [u8]) -> Self {
        let rest = core::str::from_utf8(content)
            .unwrap_or_else(|e| core::str::from_utf8(&content[..e.valid_up_to()]).unwrap_or(""));
        Self { rest }
    }
}

impl<'a> Iterator for ConfLines<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.is_empty() {
                return None;
            }

            let (line, remainder) = match self.rest.split_once(['\n', '\r']) {
                Some((line, remainder)) => (line, remainder),
                None => (self.rest, ""),
            };
            self.rest = remainder;

            let line = line.trim_matches([' ', '\t']);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once([' ', '\t']) else {
                continue;
            };
            let value = value.trim_start_matches([' ', '\t']);

            return Some((key, value));
        }
    }
}

/// Returns `0` for a byte index past the end of `s`, matching the NUL terminator of a C string.
fn byte_at(s: &[u8], i: usize) -> u8 {
    s.get(i).copied().unwrap_or(0)
}

/// Ranks a byte for the non-digit-run comparison phase of [`natural_cmp`].
///
/// NUL sorts first, digits all rank equal (and below letters), lowercase letters rank by their
/// code unit, and everything else ranks above letters.
fn rank(c: u8) -> u32 {
    if c == 0 {
        0
    } else if c.is_ascii_digit() {
        1
    } else if c.is_ascii_lowercase() {
        2 + u32::from(c)
    } else {
        0x10000 + u32::from(c)
    }
}

/// Compares two strings under natural (version-aware) ordering.
///
/// Digit runs compare numerically rather than lexicographically, so `"arch-4"` sorts before
/// `"arch-10"`. This is the same comparison used to sort the entry catalog by id (the `.conf`
/// file name stem) and to compare the version component of a `LoaderInfo` marker.
///
/// Equivalent to glibc's `strverscmp`.
#[must_use = "Has no effect if the result is unused"]
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    loop {
        // Step 1: consume a non-digit run from each side, comparing as we go.
        loop {
            let ca = byte_at(a, i);
            let cb = byte_at(b, j);
            if ca.is_ascii_digit() && cb.is_ascii_digit() {
                break;
            }
            let (ra, rb) = (rank(ca), rank(cb));
            if ra != rb {
                return ra.cmp(&rb);
            }
            if ca == 0 && cb == 0 {
                // Numerically identical throughout: fall back to a plain byte-wise
                // comparison of the two original strings (e.g. "img09" vs "img009"
                // are the same number but not the same string).
                return a.cmp(b);
            }
            i += 1;
            j += 1;
        }

        // Step 2: skip leading zero runs on both sides independently.
        while byte_at(a, i) == b'0' {
            i += 1;
        }
        while byte_at(b, j) == b'0' {
            j += 1;
        }

        // Step 3: consume the longest digit run common to both sides, remembering the first
        // digit difference as a tiebreaker.
        let mut tie = None;
        loop {
            let ca = byte_at(a, i);
            let cb = byte_at(b, j);
            if ca.is_ascii_digit() && cb.is_ascii_digit() {
                if tie.is_none() && ca != cb {
                    tie = Some(ca.cmp(&cb));
                }
                i += 1;
                j += 1;
            } else {
                break;
            }
        }

        // Step 4: whichever side still has digits remaining is the longer number.
        let a_more = byte_at(a, i).is_ascii_digit();
        let b_more = byte_at(b, j).is_ascii_digit();
        if a_more != b_more {
            return if a_more {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        // Step 5: otherwise the first differing digit (if any) decides it.
        if let Some(tie) = tie {
            return tie;
        }

        // Both digit runs were numerically identical; go back to step 1 from here.
    }
}

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod tests {
    use super::*;
    use core::cmp::Ordering;
    use proptest::prelude::*;
    use std::vec;

    #[test]
    fn scans_entry_conf() {
        let content = b"# a comment\n\ntitle Arch Linux\nversion 6.1.0\nlinux /vmlinuz-linux\noptions root=/dev/sda1\noptions quiet\n";
        let lines: std::vec::Vec<(&str, &str)> = ConfLines::new(content).collect();
        assert_eq!(
            lines,
            vec![
                ("title", "Arch Linux"),
                ("version", "6.1.0"),
                ("linux", "/vmlinuz-linux"),
                ("options", "root=/dev/sda1"),
                ("options", "quiet"),
            ]
        );
    }

    #[test]
    fn natural_order_matches_scenario_1() {
        assert_eq!(natural_cmp("arch-4", "arch-10"), Ordering::Less);
        assert_eq!(natural_cmp("arch-10", "arch-4"), Ordering::Greater);
        assert_eq!(natural_cmp("arch-4", "arch-4"), Ordering::Equal);
    }

    #[test]
    fn leading_zeroes_do_not_change_numeric_value() {
        assert_eq!(natural_cmp("img009", "img0010"), Ordering::Less);
        // Same numeric value (9 == 09) but not the same string: the byte-wise
        // fallback makes the extra leading zero in "img009" win.
        assert_eq!(natural_cmp("img09", "img009"), Ordering::Greater);
        assert_eq!(natural_cmp("img09", "img09"), Ordering::Equal);
    }

    #[test]
    fn falls_back_to_lexicographic_when_no_digits_differ() {
        assert_eq!(natural_cmp("abc", "abd"), Ordering::Less);
    }

    proptest! {
        #[test]
        fn natural_cmp_is_reflexive(s in "[ -~]{0,32}") {
            prop_assert_eq!(natural_cmp(&s, &s), Ordering::Equal);
        }

        #[test]
        fn natural_cmp_is_antisymmetric(a in "[ -~]{0,16}", b in "[ -~]{0,16}") {
            prop_assert_eq!(natural_cmp(&a, &b).reverse(), natural_cmp(&b, &a));
        }

        #[test]
        fn natural_cmp_ignores_leading_zeroes_in_equal_length_runs(n in 0u32..1000) {
            // "imgNNN" and "img0NNN" name the same number; the byte-wise fallback still orders
            // them (more leading zeroes sorts later), but neither is ever Equal to the other.
            let short = std::format!("img{n}");
            let padded = std::format!("img0{n}");
            prop_assert_ne!(natural_cmp(&short, &padded), Ordering::Equal);
        }
    }
}
