#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP client for the Ercaspay payment gateway.
//!
//! Wraps the models and error taxonomy of the [`ercaspay`] crate around a
//! `reqwest` transport with bounded retries for idempotent calls.
//!
//! ```no_run
//! use ercaspay_http::{ClientConfig, Credentials, ErcaspayClient, PaymentRequest};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new(Credentials::new("ECRS-TEST-SK...")?);
//! let client = ErcaspayClient::new(&config)?;
//!
//! let request = PaymentRequest::builder()
//!     .amount(rust_decimal::Decimal::new(1_000, 0))
//!     .payment_reference("ORDER-42")
//!     .customer_name("Ada Lovelace")
//!     .customer_email("ada@example.com")
//!     .build()?;
//! let payment = client.initiate_payment(&request).await?;
//! println!("send the customer to {}", payment.checkout_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`client`] - [`ErcaspayClient`], one method per gateway operation
//! - [`endpoint`] - Endpoint paths, methods and retry safety
//! - [`transport`] - Request sending with timeouts and retries
//!
//! # Feature Flags
//!
//! - `telemetry` (default) - Enables tracing instrumentation for debugging and monitoring

pub mod client;
pub mod endpoint;
pub mod transport;

pub use client::ErcaspayClient;
pub use endpoint::Endpoint;
pub use ercaspay::proto::{
    BankTransferDetails, CancelledTransaction, InitiatedPayment, UssdCode, UssdCodeRequest,
};
pub use ercaspay::{
    Amount, ClientConfig, ConfigError, Credentials, Environment, Error, ErrorKind,
    PaymentRequest, PaymentResponse, PaymentStatus, Result, RetryPolicy,
};
pub use transport::{RawResponse, Transport};
