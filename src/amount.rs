use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Rupee amount with 2 decimal places, stored as a scaled integer (paise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Amount(i64);

impl Amount {
    const SCALE: i64 = 100;

    pub const ZERO: Amount = Amount(0);

    pub const fn from_scaled(value: i64) -> Self {
        Amount(value)
    }

    pub const fn from_rupees(rupees: i64) -> Self {
        Amount(rupees * Self::SCALE)
    }

    /// Convert rupees to paise. `None` when the value is not finite or does not fit.
    pub fn from_float(value: f64) -> Option<Self> {
        let scaled = (value * Self::SCALE as f64).round();
        // i64::MAX is not representable, 2^63 is the first value out of range
        if !scaled.is_finite() || scaled.abs() >= 9_223_372_036_854_775_808.0 {
            return None;
        }
        Some(Amount(scaled as i64))
    }

    pub fn to_float(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// Parse keypad digits as a whole number of rupees.
    ///
    /// Returns `None` for an empty buffer, anything that is not ASCII digits,
    /// or a value that does not fit.
    pub fn parse_rupees(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits
            .parse::<i64>()
            .ok()
            .and_then(|rupees| rupees.checked_mul(Self::SCALE))
            .map(Amount)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// True when the amount is an exact multiple of `step` (a zero step never matches).
    pub fn is_multiple_of(self, step: Amount) -> bool {
        step.0 != 0 && self.0 % step.0 == 0
    }
}

/// Group the integer part the way `en-IN` does: last three digits, then pairs.
fn group_indian(whole: u64) -> String {
    let digits = whole.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let lead = head.len() % 2;
    let mut out = String::with_capacity(digits.len() + digits.len() / 2);
    for (i, ch) in head.chars().enumerate() {
        if i > 0 && (i - lead) % 2 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push(',');
    out.push_str(tail);
    out
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / Self::SCALE as u64;
        let frac = abs % Self::SCALE as u64;
        write!(f, "{sign}₹{}.{frac:02}", group_indian(whole))
    }
}

// Documents keep the balance as a plain number of rupees.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_float())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::from_float(value)
            .ok_or_else(|| serde::de::Error::custom(format!("amount {value} out of range")))
    }
}
