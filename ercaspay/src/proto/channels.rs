//! Bank transfer and USSD payment channels.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::{Amount, deserialize_decimal};
use crate::error::ValidationError;
use crate::validate;

/// A virtual account the customer can pay into by bank transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransferDetails {
    /// Transaction the account is bound to.
    #[serde(alias = "transactionReference")]
    pub transaction_reference: String,
    /// Account to transfer into.
    #[serde(alias = "accountNumber")]
    pub account_number: String,
    /// Name the bank shows for the account.
    #[serde(alias = "accountName")]
    pub account_name: String,
    /// Bank holding the account.
    #[serde(alias = "bankName")]
    pub bank_name: String,
    /// Exact amount expected, in major units.
    #[serde(deserialize_with = "deserialize_decimal")]
    pub amount: Decimal,
    /// Seconds until the account stops accepting transfers.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        alias = "expiresIn",
        alias = "accountExpires"
    )]
    pub expires_in: Option<u64>,
}

/// A request for a USSD code to dial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UssdCodeRequest {
    transaction_reference: String,
    bank_name: String,
    amount: Amount,
}

impl UssdCodeRequest {
    /// Validates and assembles a request.
    ///
    /// `bank_name` should be one of the names returned by the supported
    /// banks lookup.
    ///
    /// # Errors
    ///
    /// Fails when the transaction reference or bank name is blank or
    /// malformed.
    pub fn new(
        transaction_reference: impl AsRef<str>,
        bank_name: impl AsRef<str>,
        amount: Amount,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            transaction_reference: validate::transaction_reference(
                "transactionReference",
                transaction_reference.as_ref(),
            )?,
            bank_name: validate::non_empty("bankName", bank_name.as_ref())?,
            amount,
        })
    }

    /// Transaction the code pays for.
    #[must_use]
    pub fn transaction_reference(&self) -> &str {
        &self.transaction_reference
    }

    /// Bank the customer will dial.
    #[must_use]
    pub fn bank_name(&self) -> &str {
        &self.bank_name
    }

    /// Amount to pay.
    #[must_use]
    pub const fn amount(&self) -> Amount {
        self.amount
    }
}

/// A USSD code the customer dials to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UssdCode {
    /// Transaction the code pays for.
    #[serde(alias = "transactionReference")]
    pub transaction_reference: String,
    /// The string to dial, e.g. `*737*000*1234#`.
    #[serde(alias = "ussdCode")]
    pub ussd_code: String,
    /// Amount the code charges, in major units.
    #[serde(deserialize_with = "deserialize_decimal")]
    pub amount: Decimal,
    /// Seconds until the code expires.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "expiresIn")]
    pub expires_in: Option<u64>,
}
