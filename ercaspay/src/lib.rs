#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the Ercaspay payment gateway.
//!
//! This crate holds everything that does not touch the network: typed request
//! and response models with field-level validation, the gateway envelope
//! decoder, the error normalizer that folds HTTP statuses and gateway error
//! codes into a closed set of error kinds, and client configuration.
//!
//! The HTTP transport and the client itself live in `ercaspay-http`.
//!
//! # Modules
//!
//! - [`amount`] - Validated monetary amounts and currency codes
//! - [`config`] - Credentials, environment selection and client configuration
//! - [`error`] - Error taxonomy shared by every layer of the SDK
//! - [`normalize`] - Maps gateway failures onto [`error::ErrorKind`]
//! - [`proto`] - Wire format types and the response envelope
//! - [`validate`] - Field validation rules applied at construction time
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod amount;
pub mod config;
pub mod error;
pub mod normalize;
pub mod proto;
pub mod validate;

pub use amount::{Amount, Currency};
pub use config::{ClientConfig, ConfigError, Credentials, Environment, RetryPolicy};
pub use error::{
    ApiError, Error, ErrorKind, FieldError, NetworkError, NetworkErrorKind, Result, SchemaError,
    ValidationError,
};
pub use proto::{PaymentRequest, PaymentResponse, PaymentStatus};
