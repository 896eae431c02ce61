//! Monetary amounts and currency codes.
//!
//! The gateway takes amounts as JSON numbers in major units (naira, not kobo)
//! with at most two decimal places. [`Amount`] enforces that on construction
//! and keeps the value as a [`Decimal`] so nothing is lost to binary floating
//! point on the way in. Amounts are capped at [`Amount::MAX`], which keeps
//! every valid value within the 15 significant digits an `f64` holds exactly,
//! so the JSON number sent on the wire reads back as the same amount.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Maximum number of decimal places the gateway accepts.
pub const MAX_SCALE: u32 = 2;

/// Reasons an amount can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// Zero or negative.
    #[error("amount must be greater than zero")]
    NotPositive,
    /// More than [`MAX_SCALE`] decimal places.
    #[error("amount must have at most {MAX_SCALE} decimal places")]
    TooPrecise,
    /// Above [`Amount::MAX`].
    #[error("amount must not exceed {}", Amount::MAX)]
    TooLarge,
    /// Not a decimal number at all.
    #[error("not a decimal number: {0}")]
    Parse(String),
}

/// A strictly positive amount in major currency units.
///
/// ```rust
/// use ercaspay::Amount;
///
/// let amount: Amount = "1500.50".parse().unwrap();
/// assert_eq!(amount.to_string(), "1500.50");
/// assert!("0".parse::<Amount>().is_err());
/// assert!("10.005".parse::<Amount>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// Largest accepted amount, 9 999 999 999 999.99.
    pub const MAX: Self = Self(Decimal::from_parts(2_764_472_319, 232_830, 0, false, MAX_SCALE));

    /// Validates `value` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] if the value is not positive, carries more
    /// than two decimal places, or exceeds [`Amount::MAX`].
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive);
        }
        if value > Self::MAX.0 {
            return Err(AmountError::TooLarge);
        }
        let value = value.normalize();
        if value.scale() > MAX_SCALE {
            return Err(AmountError::TooPrecise);
        }
        Ok(Self(value))
    }

    /// Builds an amount from minor units (kobo for NGN).
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::NotPositive`] for zero and
    /// [`AmountError::TooLarge`] above [`Amount::MAX`].
    pub fn from_minor_units(minor: u64) -> Result<Self, AmountError> {
        Self::new(Decimal::from(minor) / Decimal::ONE_HUNDRED)
    }

    /// Returns the underlying decimal value.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = parse_decimal(s).ok_or_else(|| AmountError::Parse(s.to_owned()))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Parsing the decimal text rounds correctly; within `MAX` that is exact.
        let value = self.0.to_string().parse::<f64>().map_err(|_| {
            <S::Error as serde::ser::Error>::custom("amount does not fit in a JSON number")
        })?;
        serializer.serialize_f64(value)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = deserialize_decimal(deserializer)?;
        Self::new(value).map_err(D::Error::custom)
    }
}

/// Parses a decimal from plain or scientific notation.
fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Deserializes a decimal that the gateway may send as a JSON number or as a
/// numeric string.
///
/// Numbers are read through their textual form, so `1000.1` arrives as
/// exactly `1000.1`.
///
/// # Errors
///
/// Fails for anything that is not a number or a numeric string.
pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let text = match &raw {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => {
            return Err(D::Error::custom(format!(
                "expected a number or numeric string, found {other}"
            )));
        }
    };
    parse_decimal(&text).ok_or_else(|| D::Error::custom(format!("invalid decimal: {text}")))
}

/// Optional counterpart of [`deserialize_decimal`]; `null` and absent fields
/// become `None`.
///
/// # Errors
///
/// Fails for anything that is not `null`, a number, or a numeric string.
pub fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_decimal")] Decimal);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(d)| d))
}

/// An ISO 4217 currency code, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Nigerian naira, the gateway default.
    #[must_use]
    pub fn ngn() -> Self {
        Self("NGN".to_owned())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::ngn()
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(format!("`{s}` is not a three-letter currency code"))
        }
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
