//! Identifier helpers: MAC addresses, device-letter sequences, wire strings.

use crate::error::{Error, Result};
use uuid::Uuid;

/// Convert a boolean to the libvirt `yes`/`no` literal.
pub fn bool_to_str(val: bool) -> &'static str {
    if val { "yes" } else { "no" }
}

/// Generate a random, locally administered, unicast MAC address.
///
/// Six octets of UUIDv4 entropy; the first octet has the multicast bit
/// cleared and the locally-administered bit set, then everything is
/// formatted as colon-separated lowercase hex pairs.
pub fn generate_mac() -> String {
    let uuid = Uuid::new_v4();
    let mut octets = [0u8; 6];
    octets.copy_from_slice(&uuid.as_bytes()[..6]);

    octets[0] &= !0x01;
    octets[0] |= 0x02;

    octets
        .iter()
        .map(|octet| format!("{octet:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

// 1-based "Excel column" base-26: 1 -> a, 26 -> z, 27 -> aa.
fn base26(mut value: u32) -> String {
    let mut letters = Vec::new();
    while value > 0 {
        value -= 1;
        letters.push(b'a' + (value % 26) as u8);
        value /= 26;
    }
    letters.iter().rev().map(|b| *b as char).collect()
}

/// Convert a 1-based ordinal to a device-letter suffix (`1 -> "a"`,
/// `26 -> "z"`, `27 -> "aa"`).
///
/// # Errors
///
/// [`Error::Range`] for ordinal 0. Negative ordinals are unrepresentable.
pub fn device_letters(ordinal: u32) -> Result<String> {
    if ordinal == 0 {
        return Err(Error::Range { value: ordinal });
    }
    Ok(base26(ordinal))
}

/// Infinite iterator over letter-based device names: `vda`, `vdb`, ...
#[derive(Debug, Clone)]
pub struct DiskLetters {
    prefix: String,
    next: u32,
}

impl DiskLetters {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Iterator for DiskLetters {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let name = format!("{}{}", self.prefix, base26(self.next));
        self.next += 1;
        Some(name)
    }
}

/// Infinite iterator over number-based device names: `sr0`, `sr1`, ...
#[derive(Debug, Clone)]
pub struct DiskNumbers {
    prefix: String,
    next: u64,
}

impl DiskNumbers {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl Iterator for DiskNumbers {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let name = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_letters_excel_numbering() {
        assert_eq!(device_letters(1).unwrap(), "a");
        assert_eq!(device_letters(26).unwrap(), "z");
        assert_eq!(device_letters(27).unwrap(), "aa");
        assert_eq!(device_letters(52).unwrap(), "az");
        assert_eq!(device_letters(53).unwrap(), "ba");
        assert_eq!(device_letters(702).unwrap(), "zz");
        assert_eq!(device_letters(703).unwrap(), "aaa");
    }

    #[test]
    fn test_device_letters_zero_is_out_of_range() {
        assert!(matches!(device_letters(0), Err(Error::Range { value: 0 })));
    }

    #[test]
    fn test_disk_letters_sequence() {
        let names: Vec<String> = DiskLetters::new("vd").take(3).collect();
        assert_eq!(names, ["vda", "vdb", "vdc"]);
    }

    #[test]
    fn test_disk_numbers_sequence() {
        let names: Vec<String> = DiskNumbers::new("sr").take(2).collect();
        assert_eq!(names, ["sr0", "sr1"]);
    }

    #[test]
    fn test_generate_mac_is_local_unicast() {
        for _ in 0..10_000 {
            let mac = generate_mac();
            assert_eq!(mac.len(), 17);
            let first = u8::from_str_radix(&mac[..2], 16).unwrap();
            assert_eq!(first & 0x01, 0, "multicast bit must be clear: {mac}");
            assert_eq!(first & 0x02, 0x02, "local bit must be set: {mac}");
        }
    }

    #[test]
    fn test_generate_mac_format() {
        let mac = generate_mac();
        let groups: Vec<&str> = mac.split(':').collect();
        assert_eq!(groups.len(), 6);
        for group in groups {
            assert_eq!(group.len(), 2);
            assert!(u8::from_str_radix(group, 16).is_ok());
            assert_eq!(group, group.to_lowercase());
        }
    }
}
