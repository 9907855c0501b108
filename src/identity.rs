//! Static random device address.

use core::fmt;
use core::str::FromStr;

use crate::error::IdentityError;

/// A static random address: the two most significant bits are `0b11`.
///
/// Octets are held most significant first, as written in text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAddress([u8; 6]);

impl StaticAddress {
    pub fn new(octets: [u8; 6]) -> Result<Self, IdentityError> {
        if octets[0] & 0xC0 != 0xC0 {
            return Err(IdentityError::NotStaticRandom);
        }
        Ok(Self(octets))
    }

    /// Most significant octet first.
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Least significant octet first, the order the controller expects.
    pub fn to_le_bytes(&self) -> [u8; 6] {
        let mut b = self.0;
        b.reverse();
        b
    }
}

impl FromStr for StaticAddress {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for slot in &mut octets {
            let part = parts.next().ok_or(IdentityError::Malformed)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(IdentityError::Malformed);
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| IdentityError::Malformed)?;
        }
        if parts.next().is_some() {
            return Err(IdentityError::Malformed);
        }
        Self::new(octets)
    }
}

impl fmt::Display for StaticAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}
