//! Error types for the Ercaspay SDK.
//!
//! Every failure a caller can observe is an [`Error`], and every [`Error`]
//! has exactly one [`ErrorKind`]. Callers branch on the kind, never on raw
//! HTTP status codes; the status, gateway code and gateway message are still
//! carried along for logging and support tickets.

use std::fmt;

use http::StatusCode;

/// Result alias used throughout the SDK.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The closed set of error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials were missing, malformed or rejected by the gateway.
    Auth,
    /// The request failed validation, locally or at the gateway.
    Validation,
    /// The gateway failed to process a well-formed request.
    Gateway,
    /// The gateway could not be reached or the connection broke.
    Network,
    /// The gateway replied with a body of unexpected shape.
    Schema,
}

impl ErrorKind {
    /// Returns the `snake_case` name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth_error",
            Self::Validation => "validation_error",
            Self::Gateway => "gateway_error",
            Self::Network => "network_error",
            Self::Schema => "schema_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level SDK error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// See [`ErrorKind::Auth`].
    #[error("authentication failed: {0}")]
    Auth(ApiError),

    /// See [`ErrorKind::Validation`].
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// See [`ErrorKind::Gateway`].
    #[error("gateway error: {0}")]
    Gateway(ApiError),

    /// See [`ErrorKind::Network`].
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// See [`ErrorKind::Schema`].
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl Error {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Gateway(_) => ErrorKind::Gateway,
            Self::Network(_) => ErrorKind::Network,
            Self::Schema(_) => ErrorKind::Schema,
        }
    }

    /// Returns the gateway reply behind this error, if there was one.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Auth(api) | Self::Gateway(api) | Self::Validation(ValidationError::Rejected(api)) => {
                Some(api)
            }
            Self::Validation(_) | Self::Network(_) | Self::Schema(_) => None,
        }
    }

    /// Returns the HTTP status of the gateway reply, if there was one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.api_error().map(|api| api.status)
    }

    /// Returns the gateway's human-readable message, if there was one.
    #[must_use]
    pub fn gateway_message(&self) -> Option<&str> {
        self.api_error().map(|api| api.message.as_str())
    }
}

/// A single field-level complaint returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Offending field, when the gateway named one.
    pub field: Option<String>,
    /// What was wrong with it.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A failed gateway reply, reduced to what callers need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status of the reply.
    pub status: StatusCode,
    /// Gateway error code (`errorCode`, falling back to `responseCode`).
    pub code: Option<String>,
    /// Gateway message, or the canonical status reason when the body had none.
    pub message: String,
    /// Field-level errors, if the gateway listed any.
    pub field_errors: Vec<FieldError>,
}

impl ApiError {
    /// Creates an error with no code and no field errors.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
            field_errors: Vec::new(),
        }
    }

    /// Sets the gateway error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Sets the field-level errors.
    #[must_use]
    pub fn with_field_errors(mut self, field_errors: Vec<FieldError>) -> Self {
        self.field_errors = field_errors;
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (HTTP {}", self.message, self.status.as_u16())?;
        if let Some(code) = &self.code {
            write!(f, ", code {code}")?;
        }
        f.write_str(")")?;
        for field_error in &self.field_errors {
            write!(f, "; {field_error}")?;
        }
        Ok(())
    }
}

/// A request that must not be sent, or that the gateway refused as invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was not provided.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Wire name of the field.
        field: &'static str,
    },

    /// A field was provided but breaks its constraints.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Wire name of the field.
        field: &'static str,
        /// Which constraint was broken.
        reason: String,
    },

    /// The gateway rejected the request as invalid.
    #[error("gateway rejected the request: {0}")]
    Rejected(ApiError),
}

impl ValidationError {
    /// Shorthand for [`ValidationError::MissingField`].
    #[must_use]
    pub const fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    /// Shorthand for [`ValidationError::InvalidField`].
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl fmt::Display) -> Self {
        Self::InvalidField {
            field,
            reason: reason.to_string(),
        }
    }

    /// Returns the offending field, if one is known.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field } | Self::InvalidField { field, .. } => Some(*field),
            Self::Rejected(api) => api.field_errors.iter().find_map(|e| e.field.as_deref()),
        }
    }
}

/// Coarse classification of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkErrorKind {
    /// Connection could not be established (refused, DNS, TLS).
    Connect,
    /// Connecting or waiting for the reply took too long.
    Timeout,
    /// Any other failure while sending the request.
    Request,
    /// The reply body could not be read.
    Body,
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Timeout => "timeout",
            Self::Request => "request",
            Self::Body => "body",
        })
    }
}

/// The gateway could not be reached, or the exchange broke mid-way.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {context}: {source}")]
pub struct NetworkError {
    kind: NetworkErrorKind,
    context: &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl NetworkError {
    /// Wraps a transport error.
    ///
    /// `context` names the operation, e.g. `"GET payment/details"`.
    #[must_use]
    pub fn new(
        kind: NetworkErrorKind,
        context: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            context,
            source: source.into(),
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub const fn kind(&self) -> NetworkErrorKind {
        self.kind
    }

    /// Returns the operation the failure happened in.
    #[must_use]
    pub const fn context(&self) -> &'static str {
        self.context
    }
}

/// A gateway reply that does not match the expected model.
#[derive(Debug, thiserror::Error)]
#[error("unexpected response shape: {context}: {message}")]
pub struct SchemaError {
    context: &'static str,
    message: String,
    #[source]
    source: Option<serde_json::Error>,
}

impl SchemaError {
    /// Creates a schema error without an underlying parse error.
    pub fn new(context: &'static str, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a JSON decoding failure.
    #[must_use]
    pub fn from_json(context: &'static str, source: serde_json::Error) -> Self {
        Self {
            context,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Returns the operation whose reply failed to decode.
    #[must_use]
    pub const fn context(&self) -> &'static str {
        self.context
    }

    /// Returns the decoding message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        let api = ApiError::new(StatusCode::UNAUTHORIZED, "Invalid secret key");
        assert_eq!(Error::Auth(api.clone()).kind(), ErrorKind::Auth);
        assert_eq!(Error::Gateway(api.clone()).kind(), ErrorKind::Gateway);
        assert_eq!(
            Error::from(ValidationError::Rejected(api)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::from(SchemaError::new("GET payment/details", "missing body")).kind(),
            ErrorKind::Schema
        );
    }

    #[test]
    fn test_status_and_message_are_exposed() {
        let api = ApiError::new(StatusCode::BAD_GATEWAY, "Upstream unavailable").with_code("E502");
        let err = Error::Gateway(api);
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.gateway_message(), Some("Upstream unavailable"));
        assert_eq!(
            err.to_string(),
            "gateway error: Upstream unavailable (HTTP 502, code E502)"
        );
    }

    #[test]
    fn test_local_validation_has_no_status() {
        let err = Error::from(ValidationError::missing("amount"));
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "missing required field `amount`");
    }

    #[test]
    fn test_rejected_validation_names_first_field() {
        let api = ApiError::new(StatusCode::BAD_REQUEST, "Validation failed").with_field_errors(vec![
            FieldError {
                field: None,
                message: "general".into(),
            },
            FieldError {
                field: Some("customerEmail".into()),
                message: "must be a valid email".into(),
            },
        ]);
        assert_eq!(ValidationError::Rejected(api).field(), Some("customerEmail"));
    }

    #[test]
    fn test_network_error_display() {
        let err = NetworkError::new(
            NetworkErrorKind::Timeout,
            "POST payment/initiate",
            "operation timed out",
        );
        assert_eq!(
            err.to_string(),
            "timeout error: POST payment/initiate: operation timed out"
        );
        assert_eq!(err.kind(), NetworkErrorKind::Timeout);
    }
}
