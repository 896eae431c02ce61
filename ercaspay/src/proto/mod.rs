//! Wire format types for the Ercaspay API.
//!
//! Every gateway reply is wrapped in the same envelope:
//!
//! ```json
//! {
//!   "requestSuccessful": true,
//!   "responseCode": "success",
//!   "responseMessage": "success",
//!   "responseBody": { ... }
//! }
//! ```
//!
//! Failed replies carry `requestSuccessful: false` and may add an `errorCode`
//! and an `errors` collection. [`decode_response`] unwraps the envelope and
//! hands failures to the [normalizer](crate::normalize).
//!
//! # Key Types
//!
//! - [`PaymentRequest`] / [`InitiatedPayment`] - payment initiation
//! - [`PaymentResponse`] / [`PaymentStatus`] - transaction lookups
//! - [`BankTransferDetails`], [`UssdCodeRequest`], [`UssdCode`] - payment channels

use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, SchemaError};
use crate::normalize;

mod channels;
mod payment;
mod transaction;

pub use channels::{BankTransferDetails, UssdCode, UssdCodeRequest};
pub use payment::{FeeBearer, InitiatedPayment, PaymentMethod, PaymentRequest, PaymentRequestBuilder};
pub use transaction::{CancelledTransaction, Customer, PaymentResponse, PaymentStatus};

/// The envelope wrapped around every gateway reply.
///
/// All fields are optional so that malformed failure bodies still yield
/// whatever context they carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Gateway verdict on the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_successful: Option<bool>,

    /// Short response code, e.g. `"success"` or `"failed"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<String>,

    /// Human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "message")]
    pub response_message: Option<String>,

    /// Machine-readable error code on failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Field errors on failures; shape varies between endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,

    /// The payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
}

/// Decodes a raw gateway reply into `T`.
///
/// Non-2xx statuses and envelopes with `requestSuccessful: false` are
/// normalized into [`Error::Auth`], [`Error::Validation`] or
/// [`Error::Gateway`]. A 2xx reply that does not match the envelope or `T`
/// becomes [`Error::Schema`].
///
/// `context` names the operation in error messages, e.g.
/// `"GET payment/details"`.
///
/// # Errors
///
/// See above.
pub fn decode_response<T>(context: &'static str, status: StatusCode, body: &[u8]) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    if !status.is_success() {
        return Err(normalize::normalize(status, body));
    }

    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| SchemaError::from_json(context, e))?;

    match envelope.request_successful {
        Some(true) => {}
        Some(false) => return Err(normalize::normalize_envelope(status, envelope)),
        None => {
            return Err(SchemaError::new(context, "missing field `requestSuccessful`").into());
        }
    }

    let payload = envelope
        .response_body
        .ok_or_else(|| SchemaError::new(context, "missing field `responseBody`"))?;

    serde_json::from_value(payload).map_err(|e| SchemaError::from_json(context, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        value: u32,
    }

    fn bytes(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn test_decode_success() {
        let body = bytes(&json!({
            "requestSuccessful": true,
            "responseCode": "success",
            "responseMessage": "success",
            "responseBody": {"value": 7}
        }));
        let echo: Echo = decode_response("GET echo", StatusCode::OK, &body).unwrap();
        assert_eq!(echo, Echo { value: 7 });
    }

    #[test]
    fn test_decode_unexpected_shape_is_schema_error() {
        let body = bytes(&json!({
            "requestSuccessful": true,
            "responseBody": {"value": "seven"}
        }));
        let err = decode_response::<Echo>("GET echo", StatusCode::OK, &body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_decode_missing_envelope_fields_is_schema_error() {
        let err = decode_response::<Echo>("GET echo", StatusCode::OK, br#"{"value": 7}"#)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);

        let body = bytes(&json!({"requestSuccessful": true}));
        let err = decode_response::<Echo>("GET echo", StatusCode::OK, &body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_decode_non_json_success_is_schema_error() {
        let err =
            decode_response::<Echo>("GET echo", StatusCode::OK, b"<html>ok</html>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.to_string().contains("GET echo"));
    }

    #[test]
    fn test_decode_unsuccessful_envelope_is_normalized() {
        let body = bytes(&json!({
            "requestSuccessful": false,
            "responseCode": "failed",
            "errorCode": "INVALID_SECRET_KEY",
            "responseMessage": "Invalid secret key"
        }));
        let err = decode_response::<Echo>("GET echo", StatusCode::OK, &body).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.gateway_message(), Some("Invalid secret key"));
    }

    #[test]
    fn test_decode_error_status_is_normalized() {
        let err = decode_response::<Echo>("GET echo", StatusCode::SERVICE_UNAVAILABLE, b"")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Gateway);
    }
}
