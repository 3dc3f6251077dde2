// 20-byte account identity rendered as 0x-prefixed lowercase hex.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::{Error, ErrorKind};

pub const ADDRESS_LEN: usize = 20;

/// Identity of a pool owner, funder, or ledger owner.
///
/// [`Address::ZERO`] is the null sentinel and is never accepted where an
/// identity is required.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Rejects the zero sentinel; `role` names the field in the error.
    pub fn require_non_zero(self, role: &str) -> Result<Self, Error> {
        if self.is_zero() {
            return Err(Error::new(ErrorKind::InvalidAddress)
                .with_message(format!("{role} address cannot be zero")));
        }
        Ok(self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(malformed(input));
        }
        let mut bytes = [0u8; ADDRESS_LEN];
        for (idx, chunk) in digits.as_bytes().chunks(2).enumerate() {
            let hi = hex_value(chunk[0]).ok_or_else(|| malformed(input))?;
            let lo = hex_value(chunk[1]).ok_or_else(|| malformed(input))?;
            bytes[idx] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

fn hex_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        _ => None,
    }
}

fn malformed(input: &str) -> Error {
    Error::new(ErrorKind::InvalidAddress)
        .with_message(format!("malformed address `{input}`"))
        .with_hint("Use 0x followed by 40 hex digits.")
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::Address;
    use crate::core::error::ErrorKind;

    #[test]
    fn display_and_parse_agree() {
        let addr = Address::from_bytes([0xab; 20]);
        let text = addr.to_string();
        assert_eq!(text, format!("0x{}", "ab".repeat(20)));
        assert_eq!(text.parse::<Address>().expect("parse"), addr);
    }

    #[test]
    fn parse_accepts_uppercase_and_missing_prefix() {
        let upper = format!("0X{}", "CD".repeat(20));
        let bare = "cd".repeat(20);
        assert_eq!(
            upper.parse::<Address>().expect("upper"),
            bare.parse::<Address>().expect("bare")
        );
    }

    #[test]
    fn parse_rejects_bad_length_and_digits() {
        let short = "0x1234".parse::<Address>().expect_err("short");
        assert_eq!(short.kind(), ErrorKind::InvalidAddress);
        let bad = format!("0x{}zz", "00".repeat(19))
            .parse::<Address>()
            .expect_err("bad digit");
        assert_eq!(bad.kind(), ErrorKind::InvalidAddress);
    }

    #[test]
    fn zero_is_rejected_where_identity_is_required() {
        assert!(Address::ZERO.is_zero());
        let err = Address::ZERO.require_non_zero("owner").expect_err("zero");
        assert_eq!(err.kind(), ErrorKind::InvalidAddress);
        assert_eq!(err.message(), Some("owner address cannot be zero"));
        let one = Address::from_bytes([1; 20]);
        assert_eq!(one.require_non_zero("owner").expect("non-zero"), one);
    }

    #[test]
    fn serde_uses_string_form() {
        let addr = Address::from_bytes([7; 20]);
        let json = serde_json::to_string(&addr).expect("encode");
        assert_eq!(json, format!("\"0x{}\"", "07".repeat(20)));
        let back: Address = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, addr);
    }
}
