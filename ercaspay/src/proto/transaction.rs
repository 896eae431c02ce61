//! Transaction lookups.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use super::FeeBearer;
use crate::amount::{Currency, deserialize_decimal, deserialize_optional_decimal};

/// Where a payment stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    /// Created or in progress; may still succeed or fail.
    Pending,
    /// Paid.
    Success,
    /// Failed, declined, cancelled, expired or reversed.
    Failed,
}

impl PaymentStatus {
    /// Returns the canonical gateway spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESSFUL",
            Self::Failed => "FAILED",
        }
    }

    /// Whether the status can no longer change.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "INITIATED" | "PROCESSING" => Ok(Self::Pending),
            "SUCCESSFUL" | "SUCCESS" | "PAID" | "COMPLETED" => Ok(Self::Success),
            "FAILED" | "DECLINED" | "CANCELLED" | "CANCELED" | "EXPIRED" | "ABANDONED"
            | "REVERSED" => Ok(Self::Failed),
            _ => Err(format!("unknown payment status `{s}`")),
        }
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Customer details attached to a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// E-mail address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "phoneNumber"
    )]
    pub phone_number: Option<String>,
    /// Gateway customer reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// A transaction as reported by the gateway.
///
/// Only ever produced by decoding a gateway reply; there is no public
/// constructor. The verify endpoint answers in `snake_case` with gateway
/// field names (`ercs_reference`, `tx_reference`), the details endpoint in
/// `camelCase`; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    #[serde(
        alias = "ercs_reference",
        alias = "transactionReference",
        deserialize_with = "non_empty_string"
    )]
    transaction_reference: String,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "tx_reference",
        alias = "paymentReference"
    )]
    payment_reference: Option<String>,

    #[serde(alias = "paymentStatus")]
    status: PaymentStatus,

    #[serde(deserialize_with = "deserialize_decimal")]
    amount: Decimal,

    #[serde(default)]
    currency: Currency,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_decimal"
    )]
    fee: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "feeBearer")]
    fee_bearer: Option<FeeBearer>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "settledAmount",
        deserialize_with = "deserialize_optional_decimal"
    )]
    settled_amount: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    customer: Option<Customer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Value>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "createdAt",
        serialize_with = "time::serde::rfc3339::option::serialize",
        deserialize_with = "deserialize_timestamp"
    )]
    created_at: Option<OffsetDateTime>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "paidAt",
        serialize_with = "time::serde::rfc3339::option::serialize",
        deserialize_with = "deserialize_timestamp"
    )]
    paid_at: Option<OffsetDateTime>,
}

impl PaymentResponse {
    /// Gateway-assigned transaction reference.
    #[must_use]
    pub fn transaction_reference(&self) -> &str {
        &self.transaction_reference
    }

    /// Merchant reference sent at initiation.
    #[must_use]
    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> PaymentStatus {
        self.status
    }

    /// Charged amount in major units.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Currency of [`Self::amount`].
    #[must_use]
    pub const fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Channel the customer paid with, e.g. `CARD`.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Description sent at initiation.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Gateway fee.
    #[must_use]
    pub const fn fee(&self) -> Option<Decimal> {
        self.fee
    }

    /// Who paid the fee.
    #[must_use]
    pub const fn fee_bearer(&self) -> Option<FeeBearer> {
        self.fee_bearer
    }

    /// Amount settled to the merchant.
    #[must_use]
    pub const fn settled_amount(&self) -> Option<Decimal> {
        self.settled_amount
    }

    /// Customer details.
    #[must_use]
    pub const fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    /// Metadata sent at initiation.
    #[must_use]
    pub const fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    /// When the transaction was created.
    #[must_use]
    pub const fn created_at(&self) -> Option<OffsetDateTime> {
        self.created_at
    }

    /// When the transaction was paid.
    #[must_use]
    pub const fn paid_at(&self) -> Option<OffsetDateTime> {
        self.paid_at
    }
}

/// The gateway's reply to a cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledTransaction {
    /// Gateway reference of the cancelled transaction.
    #[serde(
        alias = "ercs_reference",
        alias = "transactionReference",
        deserialize_with = "non_empty_string"
    )]
    pub transaction_reference: String,
    /// Amount that was due.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_decimal"
    )]
    pub amount: Option<Decimal>,
    /// Status after cancellation.
    #[serde(alias = "paymentStatus")]
    pub status: PaymentStatus,
    /// Where the gateway would send the customer next.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "callbackUrl",
        alias = "redirect_url"
    )]
    pub callback_url: Option<String>,
}

fn non_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.trim().is_empty() {
        return Err(D::Error::custom("transaction reference is empty"));
    }
    Ok(s)
}

/// Reads RFC 3339, falling back to `YYYY-MM-DD HH:MM:SS` in UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339) {
        return Ok(Some(ts));
    }
    PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .map(|ts| Some(ts.assume_utc()))
        .map_err(|e| D::Error::custom(format!("invalid timestamp `{raw}`: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn verify_body() -> Value {
        json!({
            "domain": "test",
            "status": "SUCCESSFUL",
            "ercs_reference": "ERCS|20241008144651|1728395211584",
            "tx_reference": "ORDER-42",
            "amount": 100_000,
            "description": null,
            "paid_at": "2024-10-08T14:47:24.000000Z",
            "created_at": "2024-10-08T14:46:51.000000Z",
            "channel": "CARD",
            "currency": "NGN",
            "metadata": null,
            "fee": 1_075.5,
            "fee_bearer": "customer",
            "settled_amount": "100000.00",
            "customer": {
                "name": "Ada Lovelace",
                "phone_number": "08012345678",
                "email": "ada@example.com",
                "reference": "CUS-1"
            }
        })
    }

    #[test]
    fn test_parses_verify_body() {
        let response: PaymentResponse = serde_json::from_value(verify_body()).unwrap();
        assert_eq!(response.transaction_reference(), "ERCS|20241008144651|1728395211584");
        assert_eq!(response.payment_reference(), Some("ORDER-42"));
        assert_eq!(response.status(), PaymentStatus::Success);
        assert_eq!(response.amount(), Decimal::from(100_000));
        assert_eq!(response.fee(), Some(Decimal::new(10_755, 1)));
        assert_eq!(response.fee_bearer(), Some(FeeBearer::Customer));
        assert_eq!(response.settled_amount(), Some(Decimal::from(100_000)));
        assert_eq!(response.paid_at(), Some(datetime!(2024-10-08 14:47:24 UTC)));
        assert_eq!(response.description(), None);
        assert_eq!(
            response.customer().and_then(|c| c.phone_number.as_deref()),
            Some("08012345678")
        );
    }

    #[test]
    fn test_parses_camel_case_details_body() {
        let response: PaymentResponse = serde_json::from_value(json!({
            "transactionReference": "ERCS|1",
            "paymentReference": "ORDER-43",
            "status": "pending",
            "amount": "2500.50",
            "currency": "ngn",
            "createdAt": "2024-10-08 14:46:51"
        }))
        .unwrap();
        assert_eq!(response.status(), PaymentStatus::Pending);
        assert_eq!(response.amount(), Decimal::new(250_050, 2));
        assert_eq!(response.currency().as_str(), "NGN");
        assert_eq!(response.created_at(), Some(datetime!(2024-10-08 14:46:51 UTC)));
        assert_eq!(response.paid_at(), None);
    }

    #[test]
    fn test_rejects_unexpected_shapes() {
        let mut unknown_status = verify_body();
        unknown_status["status"] = json!("TELEPORTED");
        assert!(serde_json::from_value::<PaymentResponse>(unknown_status).is_err());

        let mut empty_reference = verify_body();
        empty_reference["ercs_reference"] = json!("");
        assert!(serde_json::from_value::<PaymentResponse>(empty_reference).is_err());

        let mut no_amount = verify_body();
        no_amount.as_object_mut().unwrap().remove("amount");
        assert!(serde_json::from_value::<PaymentResponse>(no_amount).is_err());

        let mut bad_time = verify_body();
        bad_time["paid_at"] = json!("yesterday");
        assert!(serde_json::from_value::<PaymentResponse>(bad_time).is_err());
    }

    #[test]
    fn test_cancellation_requires_reference_and_status() {
        let cancelled: CancelledTransaction = serde_json::from_value(json!({
            "transactionReference": "ERCS-1",
            "status": "CANCELLED",
            "callbackUrl": "https://shop.example/return"
        }))
        .unwrap();
        assert_eq!(cancelled.transaction_reference, "ERCS-1");
        assert_eq!(cancelled.status, PaymentStatus::Failed);
        assert_eq!(cancelled.amount, None);

        for body in [
            json!({"unexpected": 1}),
            json!({"transactionReference": "ERCS-1"}),
            json!({"transactionReference": " ", "status": "CANCELLED"}),
            json!({"status": "CANCELLED"}),
        ] {
            assert!(serde_json::from_value::<CancelledTransaction>(body).is_err());
        }
    }

    #[test]
    fn test_roundtrip_through_own_serialization() {
        let response: PaymentResponse = serde_json::from_value(verify_body()).unwrap();
        let json = serde_json::to_string(&response).unwrap();
        let back: PaymentResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn test_status_mapping() {
        for (raw, expected) in [
            ("initiated", PaymentStatus::Pending),
            ("PAID", PaymentStatus::Success),
            ("Cancelled", PaymentStatus::Failed),
            ("EXPIRED", PaymentStatus::Failed),
        ] {
            assert_eq!(raw.parse::<PaymentStatus>(), Ok(expected));
        }
        assert!(!PaymentStatus::Pending.is_final());
        assert!(PaymentStatus::Failed.is_final());
    }
}
