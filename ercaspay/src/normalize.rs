//! Error normalization.
//!
//! Folds HTTP statuses and gateway error codes into [`ErrorKind::Auth`],
//! [`ErrorKind::Validation`] or [`ErrorKind::Gateway`]. Rules, in order:
//!
//! 1. `401` and `403` are always [`ErrorKind::Auth`].
//! 2. `5xx` is always [`ErrorKind::Gateway`].
//! 3. Other `4xx`: an authentication error code makes it
//!    [`ErrorKind::Auth`]; `408` and `429` are [`ErrorKind::Gateway`];
//!    anything else is [`ErrorKind::Validation`].
//! 4. `2xx` with `requestSuccessful: false`: authentication codes are
//!    [`ErrorKind::Auth`], validation codes or listed field errors are
//!    [`ErrorKind::Validation`], the rest is [`ErrorKind::Gateway`].
//! 5. Anything else (`1xx`, `3xx`) is [`ErrorKind::Gateway`].

use http::StatusCode;
use serde_json::Value;

use crate::error::{ApiError, Error, ErrorKind, FieldError, ValidationError};
use crate::proto::Envelope;

/// Error codes that mean the credentials were rejected.
const AUTH_CODES: &[&str] = &[
    "UNAUTHORIZED",
    "UNAUTHENTICATED",
    "INVALID_API_KEY",
    "INVALID_SECRET_KEY",
    "INVALID_TOKEN",
    "AUTHENTICATION_FAILED",
    "FORBIDDEN",
];

/// Error codes that mean the request itself was malformed.
const VALIDATION_CODES: &[&str] = &[
    "VALIDATION_ERROR",
    "VALIDATION_FAILED",
    "INVALID_REQUEST",
    "BAD_REQUEST",
];

/// Longest slice of a non-JSON body kept as the error message.
const MAX_RAW_MESSAGE_LEN: usize = 512;

/// Normalizes a failed reply from its status and raw body.
///
/// The body is parsed as an [`Envelope`] when possible; otherwise its text
/// (truncated) becomes the message.
#[must_use]
pub fn normalize(status: StatusCode, body: &[u8]) -> Error {
    match serde_json::from_slice::<Envelope>(body) {
        Ok(envelope) => normalize_envelope(status, envelope),
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            let message = if text.is_empty() {
                canonical_message(status)
            } else {
                text.chars().take(MAX_RAW_MESSAGE_LEN).collect()
            };
            into_error(classify(status, None, false), ApiError::new(status, message))
        }
    }
}

/// Normalizes a failed reply whose body already parsed as an envelope.
#[must_use]
pub fn normalize_envelope(status: StatusCode, envelope: Envelope) -> Error {
    let Envelope {
        response_code,
        response_message,
        error_code,
        errors,
        ..
    } = envelope;

    let field_errors = errors.as_ref().map(field_errors).unwrap_or_default();
    let code = error_code.or(response_code).filter(|c| !c.trim().is_empty());
    let message = response_message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| canonical_message(status));

    let kind = classify(status, code.as_deref(), !field_errors.is_empty());
    let mut api = ApiError::new(status, message).with_field_errors(field_errors);
    if let Some(code) = code {
        api = api.with_code(code);
    }
    into_error(kind, api)
}

/// Classifies a failed reply.
///
/// Only ever returns [`ErrorKind::Auth`], [`ErrorKind::Validation`] or
/// [`ErrorKind::Gateway`]; the other kinds never originate from a reply.
#[must_use]
pub fn classify(status: StatusCode, code: Option<&str>, has_field_errors: bool) -> ErrorKind {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ErrorKind::Auth;
    }
    if status.is_server_error() {
        return ErrorKind::Gateway;
    }

    let code = code.map(normalize_code);
    let is_auth_code = code.as_deref().is_some_and(|c| AUTH_CODES.contains(&c));

    if status.is_client_error() {
        if is_auth_code {
            ErrorKind::Auth
        } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS
        {
            ErrorKind::Gateway
        } else {
            ErrorKind::Validation
        }
    } else if status.is_success() {
        let is_validation_code = code
            .as_deref()
            .is_some_and(|c| VALIDATION_CODES.contains(&c));
        if is_auth_code {
            ErrorKind::Auth
        } else if is_validation_code || has_field_errors {
            ErrorKind::Validation
        } else {
            ErrorKind::Gateway
        }
    } else {
        ErrorKind::Gateway
    }
}

fn into_error(kind: ErrorKind, api: ApiError) -> Error {
    #[cfg(feature = "telemetry")]
    tracing::debug!(
        status = api.status.as_u16(),
        kind = %kind,
        code = api.code.as_deref().unwrap_or_default(),
        "Normalized gateway failure"
    );

    match kind {
        ErrorKind::Auth => Error::Auth(api),
        ErrorKind::Validation => Error::Validation(ValidationError::Rejected(api)),
        ErrorKind::Gateway | ErrorKind::Network | ErrorKind::Schema => Error::Gateway(api),
    }
}

/// `invalid-api key` and `Invalid API Key` both become `INVALID_API_KEY`.
fn normalize_code(code: &str) -> String {
    code.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' | '.' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

fn canonical_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), ToOwned::to_owned)
}

/// Flattens the gateway's `errors` value, which may be a map of field to
/// message(s), a list of messages or `{field, message}` objects, or a string.
fn field_errors(errors: &Value) -> Vec<FieldError> {
    fn message_of(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    match errors {
        Value::Object(map) => map
            .iter()
            .flat_map(|(field, value)| {
                let messages = match value {
                    Value::Array(items) => items.iter().map(message_of).collect(),
                    other => vec![message_of(other)],
                };
                messages.into_iter().map(move |message| FieldError {
                    field: Some(field.clone()),
                    message,
                })
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let field = item
                    .get("field")
                    .or_else(|| item.get("fieldName"))
                    .and_then(Value::as_str)
                    .map(ToOwned::to_owned);
                let message = item.get("message").map_or_else(|| message_of(item), message_of);
                FieldError { field, message }
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![FieldError {
            field: None,
            message: s.clone(),
        }],
        _ => Vec::new(),
    }
}
