//! Bluetooth Device Address
//!
//! [`BluetoothAddress`] is stored in display order: `AA:BB:CC:DD:EE:FF` is
//! `[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Marker preceding the address in a BlueZ device object path
const DEVICE_MARKER: &str = "/dev_";

/// Address text was not `XX:XX:XX:XX:XX:XX`
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Invalid Bluetooth address '{0}': expected XX:XX:XX:XX:XX:XX")]
pub struct AddressParseError(pub String);

/// A Bluetooth Device Address (`BD_ADDR`) wrapper for type safety
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BluetoothAddress(pub [u8; 6]);

impl BluetoothAddress {
    /// The wildcard address `00:00:00:00:00:00`
    pub const ANY: Self = Self([0; 6]);

    /// Create a new Bluetooth address from bytes
    #[must_use]
    pub const fn new(addr: [u8; 6]) -> Self {
        Self(addr)
    }

    /// Get the raw address bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Whether this is the wildcard address
    #[must_use]
    pub fn is_any(&self) -> bool {
        *self == Self::ANY
    }

    /// Address digits without separators, uppercase (`AABBCCDDEEFF`)
    #[must_use]
    pub fn to_hex_compact(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Extract the address from a device object path
    ///
    /// Looks for `/dev_` followed by six `_`- or `:`-separated hex octets,
    /// e.g. `/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF`. Anything after the last
    /// octet is ignored. Returns `None` when no address can be read.
    #[must_use]
    pub fn from_device_path(path: &str) -> Option<Self> {
        let start = path.find(DEVICE_MARKER)? + DEVICE_MARKER.len();
        let mut rest = &path[start..];
        let mut bytes = [0u8; 6];

        for (i, byte) in bytes.iter_mut().enumerate() {
            if i > 0 {
                rest = rest
                    .strip_prefix('_')
                    .or_else(|| rest.strip_prefix(':'))?;
            }
            let digits = rest
                .bytes()
                .take(2)
                .take_while(u8::is_ascii_hexdigit)
                .count();
            if digits == 0 {
                return None;
            }
            *byte = u8::from_str_radix(&rest[..digits], 16).ok()?;
            rest = &rest[digits..];
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for BluetoothAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for BluetoothAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressParseError(s.to_string());
        if s.len() != 17 || !s.chars().all(|c| c.is_ascii_hexdigit() || c == ':') {
            return Err(invalid());
        }

        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in &mut bytes {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(bytes))
    }
}

impl TryFrom<&str> for BluetoothAddress {
    type Error = AddressParseError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<[u8; 6]> for BluetoothAddress {
    fn from(addr: [u8; 6]) -> Self {
        Self(addr)
    }
}

impl From<BluetoothAddress> for [u8; 6] {
    fn from(addr: BluetoothAddress) -> Self {
        addr.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uppercase_with_colons() {
        let addr = BluetoothAddress::new([0x0A, 0xB1, 0x2C, 0xD3, 0x4E, 0xF5]);
        assert_eq!(addr.to_string(), "0A:B1:2C:D3:4E:F5");
        assert_eq!(BluetoothAddress::ANY.to_string(), "00:00:00:00:00:00");
    }

    #[test]
    fn test_parse_valid() {
        let addr: BluetoothAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(addr.as_bytes(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

        let addr = BluetoothAddress::try_from("00:00:00:00:00:00").unwrap();
        assert!(addr.is_any());
    }

    #[test]
    fn test_parse_invalid() {
        for bad in [
            "",
            "AA:BB:CC:DD:EE",
            "AA:BB:CC:DD:EE:FF:00",
            "AA-BB-CC-DD-EE-FF",
            "AAA:B:CC:DD:EE:FF",
            "GG:BB:CC:DD:EE:FF",
            "AA:BB:CC:DD:EE:F:",
        ] {
            assert!(bad.parse::<BluetoothAddress>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_compact_hex() {
        let addr: BluetoothAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(addr.to_hex_compact(), "AABBCCDDEEFF");
        let addr = BluetoothAddress::new([0x00, 0x1a, 0x7d, 0xda, 0x71, 0x13]);
        assert_eq!(addr.to_hex_compact(), "001A7DDA7113");
    }

    #[test]
    fn test_from_device_path() {
        let addr = BluetoothAddress::from_device_path("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF");
        assert_eq!(addr, Some(BluetoothAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])));

        // Trailing path components are ignored
        let addr = BluetoothAddress::from_device_path(
            "/org/bluealsa/hci1/dev_00_11_22_33_44_55/hfpag/sink",
        );
        assert_eq!(addr, Some(BluetoothAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])));

        // Colon separators
        let addr = BluetoothAddress::from_device_path("/dev_01:02:03:04:05:06");
        assert_eq!(addr, Some(BluetoothAddress::new([1, 2, 3, 4, 5, 6])));

        // Single-digit octets
        let addr = BluetoothAddress::from_device_path("/dev_1_2_3_4_5_A");
        assert_eq!(addr, Some(BluetoothAddress::new([1, 2, 3, 4, 5, 0x0A])));
    }

    #[test]
    fn test_from_device_path_without_address() {
        assert_eq!(BluetoothAddress::from_device_path("/org/bluez/hci0"), None);
        assert_eq!(BluetoothAddress::from_device_path("/org/bluez/hci0/dev_"), None);
        assert_eq!(
            BluetoothAddress::from_device_path("/org/bluez/hci0/dev_AA_BB_CC"),
            None
        );
        assert_eq!(
            BluetoothAddress::from_device_path("/org/bluez/hci0/dev_AA_BB_CC_DD_EE_ZZ"),
            None
        );
    }
}
