//! The Ercaspay API client.
//!
//! Each method validates its input, sends one call through the
//! [`Transport`], and decodes the reply:
//!
//! - malformed input fails with [`Error::Validation`] before anything is sent
//! - a reply that is not a success is normalized into [`Error::Auth`],
//!   [`Error::Validation`] or [`Error::Gateway`]
//! - a success reply that does not match the model fails with
//!   [`Error::Schema`]
//! - no reply at all fails with [`Error::Network`]

use ercaspay::config::{ClientConfig, ConfigError};
use ercaspay::proto::{
    BankTransferDetails, CancelledTransaction, InitiatedPayment, PaymentRequest, PaymentResponse,
    UssdCode, UssdCodeRequest, decode_response,
};
use ercaspay::{Error, Result, SchemaError, validate};
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::endpoint::Endpoint;
use crate::transport::Transport;

/// A client for the Ercaspay payment gateway.
///
/// Cheap to clone; clones share the connection pool. Holds no mutable state.
#[derive(Clone, Debug)]
pub struct ErcaspayClient {
    transport: Transport,
}

impl ErcaspayClient {
    /// Creates a client from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be used.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    /// Creates a client configured from `ERCASPAY_*` environment variables,
    /// loading `.env` first if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the environment is incomplete or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&ClientConfig::from_dotenv()?)
    }

    /// Creates a client on top of an existing reqwest client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be used.
    pub fn with_http_client(
        config: &ClientConfig,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            transport: Transport::with_client(config, client)?,
        })
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Starts a payment and returns the checkout URL to send the customer to.
    ///
    /// Never retried: a lost reply may still have created the payment, so
    /// look it up by its payment reference before trying again.
    ///
    /// # Errors
    ///
    /// See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "ercaspay.initiate_payment",
            skip_all,
            fields(payment_reference = request.payment_reference()),
            err
        )
    )]
    pub async fn initiate_payment(&self, request: &PaymentRequest) -> Result<InitiatedPayment> {
        self.call(Endpoint::InitiatePayment, Some(request)).await
    }

    /// Looks up the final state of a transaction.
    ///
    /// # Errors
    ///
    /// See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "ercaspay.verify_transaction", skip(self), err)
    )]
    pub async fn verify_transaction(&self, transaction_reference: &str) -> Result<PaymentResponse> {
        let reference = transaction_reference_arg(transaction_reference)?;
        self.get(Endpoint::VerifyTransaction(&reference)).await
    }

    /// Fetches a transaction's full details.
    ///
    /// # Errors
    ///
    /// See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "ercaspay.transaction_details", skip(self), err)
    )]
    pub async fn transaction_details(&self, transaction_reference: &str) -> Result<PaymentResponse> {
        let reference = transaction_reference_arg(transaction_reference)?;
        self.get(Endpoint::TransactionDetails(&reference)).await
    }

    /// Cancels a pending transaction.
    ///
    /// # Errors
    ///
    /// See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "ercaspay.cancel_transaction", skip(self), err)
    )]
    pub async fn cancel_transaction(
        &self,
        transaction_reference: &str,
    ) -> Result<CancelledTransaction> {
        let reference = transaction_reference_arg(transaction_reference)?;
        self.get(Endpoint::CancelTransaction(&reference)).await
    }

    /// Allocates a virtual account the customer pays into by bank transfer.
    ///
    /// # Errors
    ///
    /// See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "ercaspay.request_bank_account", skip(self), err)
    )]
    pub async fn request_bank_account(
        &self,
        transaction_reference: &str,
    ) -> Result<BankTransferDetails> {
        let reference = transaction_reference_arg(transaction_reference)?;
        self.get(Endpoint::RequestBankAccount(&reference)).await
    }

    /// Requests a USSD code for the customer to dial.
    ///
    /// # Errors
    ///
    /// See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "ercaspay.request_ussd_code",
            skip_all,
            fields(
                transaction_reference = request.transaction_reference(),
                bank = request.bank_name(),
            ),
            err
        )
    )]
    pub async fn request_ussd_code(&self, request: &UssdCodeRequest) -> Result<UssdCode> {
        self.call(Endpoint::RequestUssdCode, Some(request)).await
    }

    /// Lists the banks that accept USSD payments.
    ///
    /// # Errors
    ///
    /// See the [module docs](self).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "ercaspay.ussd_supported_banks", skip_all, err)
    )]
    pub async fn ussd_supported_banks(&self) -> Result<Vec<String>> {
        let banks: Vec<UssdBank> = self.get(Endpoint::UssdSupportedBanks).await?;
        Ok(banks.into_iter().map(UssdBank::into_name).collect())
    }

    async fn get<R>(&self, endpoint: Endpoint<'_>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.call::<(), R>(endpoint, None).await
    }

    async fn call<T, R>(&self, endpoint: Endpoint<'_>, payload: Option<&T>) -> Result<R>
    where
        T: serde::Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let context = endpoint.context();
        let body = payload
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| SchemaError::from_json(context, e))?;
        let response = self.transport.send(endpoint, body.as_ref()).await?;
        decode_response(context, response.status, &response.body)
    }
}

fn transaction_reference_arg(value: &str) -> Result<String> {
    validate::transaction_reference("transactionReference", value).map_err(Error::from)
}

/// The supported banks list holds either names or `{name}` objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum UssdBank {
    Name(String),
    Entry {
        #[serde(alias = "bank_name", alias = "bankName")]
        name: String,
    },
}

impl UssdBank {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Entry { name } => name,
        }
    }
}
