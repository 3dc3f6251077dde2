// Unit-of-value newtype: base units, checked arithmetic, ether-style display.
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::{Error, ErrorKind};

pub const UNITS_PER_ETHER: u128 = 1_000_000_000_000_000_000;
pub const UNITS_PER_GWEI: u128 = 1_000_000_000;
const ETHER_DECIMALS: usize = 18;

/// Non-negative quantity of the ledger's single fungible unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    pub const fn get(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// Renders the amount in ether with trailing zeros trimmed (`0.001`, `4.0`).
    pub fn format_ether(self) -> String {
        let whole = self.0 / UNITS_PER_ETHER;
        let frac = self.0 % UNITS_PER_ETHER;
        if frac == 0 {
            return format!("{whole}.0");
        }
        let digits = format!("{frac:0width$}", width = ETHER_DECIMALS);
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }

    /// Parses base units (`1500`) or a decimal with a unit suffix
    /// (`0.001ether`, `2 gwei`, `7wei`).
    pub fn parse(input: &str) -> Result<Amount, Error> {
        let trimmed = input.trim();
        let split = trimmed
            .char_indices()
            .find(|(_, ch)| !(ch.is_ascii_digit() || *ch == '.'))
            .map(|(idx, _)| idx)
            .unwrap_or(trimmed.len());
        let number = trimmed[..split].trim();
        let suffix = trimmed[split..].trim();

        let decimals = match suffix.to_ascii_lowercase().as_str() {
            "" | "wei" => 0,
            "gwei" => 9,
            "ether" | "eth" => ETHER_DECIMALS,
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("invalid amount unit `{suffix}`"))
                    .with_hint("Use base units or a wei/gwei/ether suffix (e.g. 0.001ether)."));
            }
        };

        let (whole, frac) = match number.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (number, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid_amount(input));
        }
        if frac.len() > decimals {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("amount `{input}` is finer than one base unit"))
                .with_hint("Reduce the number of decimal places."));
        }

        let scale = 10u128.pow(decimals as u32);
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|err| invalid_amount(input).with_source(err))?
        };
        let frac_units = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = decimals);
            padded.parse::<u128>().map_err(|err| invalid_amount(input).with_source(err))?
        };

        whole_units
            .checked_mul(scale)
            .and_then(|units| units.checked_add(frac_units))
            .map(Amount)
            .ok_or_else(|| {
                Error::new(ErrorKind::AmountOverflow)
                    .with_message(format!("amount `{input}` is too large"))
            })
    }
}

fn invalid_amount(input: &str) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("invalid amount `{input}`"))
        .with_hint("Use base units or a wei/gwei/ether suffix (e.g. 0.001ether).")
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Amount {
    fn from(units: u128) -> Self {
        Self(units)
    }
}

// JSON numbers lose precision past 2^53, so amounts travel as decimal strings.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>().map(Amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{Amount, UNITS_PER_ETHER, UNITS_PER_GWEI};
    use crate::core::error::ErrorKind;

    #[test]
    fn parse_accepts_units_and_suffixes() {
        assert_eq!(Amount::parse("42").unwrap(), Amount::new(42));
        assert_eq!(Amount::parse("7wei").unwrap(), Amount::new(7));
        assert_eq!(Amount::parse("2 gwei").unwrap(), Amount::new(2 * UNITS_PER_GWEI));
        assert_eq!(
            Amount::parse("0.001ether").unwrap(),
            Amount::new(UNITS_PER_ETHER / 1000)
        );
        assert_eq!(Amount::parse("1.5ETH").unwrap(), Amount::new(UNITS_PER_ETHER * 3 / 2));
        assert_eq!(Amount::parse(".5gwei").unwrap(), Amount::new(UNITS_PER_GWEI / 2));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(Amount::parse("abc").unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(Amount::parse("1.5").unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(Amount::parse("1btc").unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(Amount::parse(".").unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(Amount::parse("-1").unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(
            Amount::parse("999999999999999999999999ether").unwrap_err().kind(),
            ErrorKind::AmountOverflow
        );
    }

    #[test]
    fn format_ether_trims_trailing_zeros() {
        assert_eq!(Amount::ZERO.format_ether(), "0.0");
        assert_eq!(Amount::new(UNITS_PER_ETHER * 4).format_ether(), "4.0");
        assert_eq!(Amount::new(UNITS_PER_ETHER / 1000).format_ether(), "0.001");
        assert_eq!(Amount::new(UNITS_PER_ETHER + 1).format_ether(), "1.000000000000000001");
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        assert_eq!(Amount::new(u128::MAX).checked_add(Amount::new(1)), None);
        assert_eq!(Amount::new(1).checked_sub(Amount::new(2)), None);
        assert_eq!(Amount::new(3).checked_add(Amount::new(4)), Some(Amount::new(7)));
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let amount = Amount::new(u128::MAX);
        let json = serde_json::to_string(&amount).expect("encode");
        assert_eq!(json, format!("\"{}\"", u128::MAX));
        let back: Amount = serde_json::from_str(&json).expect("decode");
        assert_eq!(back, amount);
    }
}
