//! Payment initiation.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::formats::CommaSeparator;
use serde_with::{StringWithSeparator, serde_as};
use url::Url;

use crate::amount::{Amount, Currency, deserialize_optional_decimal};
use crate::error::ValidationError;
use crate::validate;

/// A payment channel offered on the hosted checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    /// Debit or credit card.
    Card,
    /// Transfer to a one-off virtual account.
    BankTransfer,
    /// Bank USSD short code.
    Ussd,
    /// QR code scan.
    QrCode,
}

impl PaymentMethod {
    /// Returns the wire name of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::BankTransfer => "bank-transfer",
            Self::Ussd => "ussd",
            Self::QrCode => "qrcode",
        }
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Self::Card),
            "bank-transfer" | "bank_transfer" | "banktransfer" => Ok(Self::BankTransfer),
            "ussd" => Ok(Self::Ussd),
            "qrcode" | "qr-code" | "qr" => Ok(Self::QrCode),
            other => Err(format!("unknown payment method `{other}`")),
        }
    }
}

/// Who pays the gateway fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeBearer {
    /// Fee is added on top of the amount.
    #[serde(alias = "CUSTOMER")]
    Customer,
    /// Fee is deducted from the settled amount.
    #[serde(alias = "MERCHANT")]
    Merchant,
}

/// A validated request to initiate a payment.
///
/// Built with [`PaymentRequest::builder`]; every field constraint is checked
/// in [`PaymentRequestBuilder::build`], so a `PaymentRequest` that exists is
/// one the gateway will accept as well-formed. Fields are read-only.
/// Deserializing runs the same checks.
///
/// ```rust
/// use ercaspay::PaymentRequest;
/// use rust_decimal::Decimal;
///
/// let request = PaymentRequest::builder()
///     .amount(Decimal::new(150_000, 2))
///     .payment_reference("ORDER-1001")
///     .customer_name("Ada Lovelace")
///     .customer_email("ada@example.com")
///     .redirect_url("https://shop.example/return")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.amount().to_string(), "1500.00");
/// assert_eq!(request.currency().as_str(), "NGN");
/// ```
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPaymentRequest")]
pub struct PaymentRequest {
    amount: Amount,
    currency: Currency,
    payment_reference: String,
    customer_name: String,
    customer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde_as(as = "Option<StringWithSeparator::<CommaSeparator, PaymentMethod>>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_methods: Option<Vec<PaymentMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_bearer: Option<FeeBearer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

impl PaymentRequest {
    /// Starts building a request.
    #[must_use]
    pub fn builder() -> PaymentRequestBuilder {
        PaymentRequestBuilder::default()
    }

    /// Amount to charge, in major units.
    #[must_use]
    pub const fn amount(&self) -> Amount {
        self.amount
    }

    /// Currency of [`Self::amount`].
    #[must_use]
    pub const fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Merchant reference, unique per payment.
    #[must_use]
    pub fn payment_reference(&self) -> &str {
        &self.payment_reference
    }

    /// Customer full name.
    #[must_use]
    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    /// Customer e-mail address.
    #[must_use]
    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    /// Customer phone number, separators stripped.
    #[must_use]
    pub fn customer_phone_number(&self) -> Option<&str> {
        self.customer_phone_number.as_deref()
    }

    /// Where the checkout page sends the customer afterwards.
    #[must_use]
    pub const fn redirect_url(&self) -> Option<&Url> {
        self.redirect_url.as_ref()
    }

    /// Free-text description shown at checkout.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Channels offered at checkout; `None` means the merchant default.
    #[must_use]
    pub fn payment_methods(&self) -> Option<&[PaymentMethod]> {
        self.payment_methods.as_deref()
    }

    /// Who pays the gateway fee.
    #[must_use]
    pub const fn fee_bearer(&self) -> Option<FeeBearer> {
        self.fee_bearer
    }

    /// Arbitrary merchant metadata echoed back on lookups.
    #[must_use]
    pub const fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }
}

/// Builder for [`PaymentRequest`].
///
/// Setters only record values; all checks run in [`Self::build`].
#[derive(Debug, Clone, Default)]
pub struct PaymentRequestBuilder {
    amount: Option<Decimal>,
    currency: Option<String>,
    payment_reference: Option<String>,
    customer_name: Option<String>,
    customer_email: Option<String>,
    customer_phone_number: Option<String>,
    redirect_url: Option<String>,
    description: Option<String>,
    payment_methods: Option<Vec<PaymentMethod>>,
    fee_bearer: Option<FeeBearer>,
    metadata: Option<Value>,
}

impl PaymentRequestBuilder {
    /// Sets the amount in major units (e.g. naira).
    #[must_use]
    pub fn amount(mut self, amount: impl Into<Decimal>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    /// Sets the ISO 4217 currency code. Defaults to `NGN`.
    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Sets the merchant reference.
    #[must_use]
    pub fn payment_reference(mut self, reference: impl Into<String>) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    /// Sets the customer name.
    #[must_use]
    pub fn customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    /// Sets the customer e-mail address.
    #[must_use]
    pub fn customer_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    /// Sets the customer phone number.
    #[must_use]
    pub fn customer_phone_number(mut self, phone: impl Into<String>) -> Self {
        self.customer_phone_number = Some(phone.into());
        self
    }

    /// Sets the post-checkout redirect URL.
    #[must_use]
    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Restricts the checkout page to the given channels.
    #[must_use]
    pub fn payment_methods(mut self, methods: impl IntoIterator<Item = PaymentMethod>) -> Self {
        self.payment_methods = Some(methods.into_iter().collect());
        self
    }

    /// Sets who pays the gateway fee.
    #[must_use]
    pub const fn fee_bearer(mut self, fee_bearer: FeeBearer) -> Self {
        self.fee_bearer = Some(fee_bearer);
        self
    }

    /// Attaches metadata; must be a JSON object.
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Validates every field and produces the request.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, naming the offending
    /// field by its wire name (`amount`, `customerEmail`, ...).
    pub fn build(self) -> Result<PaymentRequest, ValidationError> {
        let amount = self.amount.ok_or(ValidationError::missing("amount"))?;
        let amount = Amount::new(amount).map_err(|e| ValidationError::invalid("amount", e))?;

        let currency = match self.currency {
            Some(code) => code
                .parse::<Currency>()
                .map_err(|e| ValidationError::invalid("currency", e))?,
            None => Currency::default(),
        };

        let payment_reference = validate::reference(
            "paymentReference",
            self.payment_reference
                .as_deref()
                .ok_or(ValidationError::missing("paymentReference"))?,
        )?;

        let customer_name = validate::non_empty(
            "customerName",
            self.customer_name
                .as_deref()
                .ok_or(ValidationError::missing("customerName"))?,
        )?;
        validate::max_len("customerName", &customer_name, validate::MAX_DESCRIPTION_LEN)?;

        let customer_email = validate::email(
            "customerEmail",
            self.customer_email
                .as_deref()
                .ok_or(ValidationError::missing("customerEmail"))?,
        )?;

        let customer_phone_number = self
            .customer_phone_number
            .as_deref()
            .map(|phone| validate::phone("customerPhoneNumber", phone))
            .transpose()?;

        let redirect_url = self
            .redirect_url
            .as_deref()
            .map(|url| validate::http_url("redirectUrl", url))
            .transpose()?;

        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());
        if let Some(description) = &description {
            validate::max_len("description", description, validate::MAX_DESCRIPTION_LEN)?;
        }

        let payment_methods = match self.payment_methods {
            Some(methods) if methods.is_empty() => {
                return Err(ValidationError::invalid(
                    "paymentMethods",
                    "must list at least one method",
                ));
            }
            Some(mut methods) => {
                let mut seen = Vec::with_capacity(methods.len());
                methods.retain(|m| {
                    let fresh = !seen.contains(m);
                    seen.push(*m);
                    fresh
                });
                Some(methods)
            }
            None => None,
        };

        let metadata = match self.metadata {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(ValidationError::invalid("metadata", "must be a JSON object"));
            }
        };

        Ok(PaymentRequest {
            amount,
            currency,
            payment_reference,
            customer_name,
            customer_email,
            customer_phone_number,
            redirect_url,
            description,
            payment_methods,
            fee_bearer: self.fee_bearer,
            metadata,
        })
    }
}

/// Unvalidated wire form, used only on the way in.
#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPaymentRequest {
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    amount: Option<Decimal>,
    currency: Option<String>,
    payment_reference: Option<String>,
    customer_name: Option<String>,
    customer_email: Option<String>,
    customer_phone_number: Option<String>,
    redirect_url: Option<String>,
    description: Option<String>,
    #[serde_as(as = "Option<StringWithSeparator::<CommaSeparator, PaymentMethod>>")]
    payment_methods: Option<Vec<PaymentMethod>>,
    fee_bearer: Option<FeeBearer>,
    metadata: Option<Value>,
}

impl TryFrom<RawPaymentRequest> for PaymentRequest {
    type Error = ValidationError;

    fn try_from(raw: RawPaymentRequest) -> Result<Self, Self::Error> {
        let RawPaymentRequest {
            amount,
            currency,
            payment_reference,
            customer_name,
            customer_email,
            customer_phone_number,
            redirect_url,
            description,
            payment_methods,
            fee_bearer,
            metadata,
        } = raw;

        PaymentRequestBuilder {
            amount,
            currency,
            payment_reference,
            customer_name,
            customer_email,
            customer_phone_number,
            redirect_url,
            description,
            payment_methods,
            fee_bearer,
            metadata,
        }
        .build()
    }
}

/// The gateway's reply to a payment initiation.
///
/// The payment is pending until the customer completes checkout at
/// [`Self::checkout_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedPayment {
    /// The merchant reference sent with the request.
    pub payment_reference: String,
    /// Gateway-assigned transaction reference, used for all later lookups.
    pub transaction_reference: String,
    /// Hosted checkout page for the customer.
    pub checkout_url: Url,
}
