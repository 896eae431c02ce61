//! Field validation rules.
//!
//! Each rule takes the wire name of the field it checks so that a failure
//! names the offending field exactly as the gateway would.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::ValidationError;

/// Longest merchant reference the gateway stores.
pub const MAX_REFERENCE_LEN: usize = 100;

/// Longest free-text description the gateway stores.
pub const MAX_DESCRIPTION_LEN: usize = 255;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone pattern is valid"));

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("reference pattern is valid"));

/// Trims `value` and rejects it if nothing is left.
///
/// # Errors
///
/// [`ValidationError::MissingField`] for blank input.
pub fn non_empty(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(value.to_owned())
}

/// Rejects values longer than `max` characters.
///
/// # Errors
///
/// [`ValidationError::InvalidField`] when `value` is too long.
pub fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::invalid(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

/// Validates a merchant or gateway reference.
///
/// # Errors
///
/// Fails for blank, overlong, or non `[A-Za-z0-9_-]` references.
pub fn reference(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = non_empty(field, value)?;
    max_len(field, &value, MAX_REFERENCE_LEN)?;
    if !REFERENCE.is_match(&value) {
        return Err(ValidationError::invalid(
            field,
            "may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(value)
}

/// Validates a gateway transaction reference before it is put in a URL path.
///
/// Gateway references contain `|`, so only blanks, whitespace, overlong
/// values and dot segments are rejected; the transport percent-encodes the
/// rest. `.` and `..` stay dot segments even when percent-encoded, so they
/// would resolve to a different endpoint.
///
/// # Errors
///
/// Fails for blank, overlong, whitespace-containing or dots-only references.
pub fn transaction_reference(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = non_empty(field, value)?;
    max_len(field, &value, MAX_REFERENCE_LEN)?;
    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid(field, "must not contain whitespace"));
    }
    if value.chars().all(|c| c == '.') {
        return Err(ValidationError::invalid(field, "must not consist of dots only"));
    }
    Ok(value)
}

/// Validates an e-mail address.
///
/// # Errors
///
/// Fails for blank input or input that is not shaped like an address.
pub fn email(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = non_empty(field, value)?;
    if !EMAIL.is_match(&value) {
        return Err(ValidationError::invalid(field, "must be a valid e-mail address"));
    }
    Ok(value)
}

/// Validates a phone number, ignoring spaces and dashes.
///
/// # Errors
///
/// Fails unless 7 to 15 digits remain, optionally prefixed with `+`.
pub fn phone(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if compact.is_empty() {
        return Err(ValidationError::missing(field));
    }
    if !PHONE.is_match(&compact) {
        return Err(ValidationError::invalid(
            field,
            "must be 7 to 15 digits with an optional leading '+'",
        ));
    }
    Ok(compact)
}

/// Parses an absolute `http` or `https` URL.
///
/// # Errors
///
/// Fails for unparsable URLs and other schemes.
pub fn http_url(field: &'static str, value: &str) -> Result<Url, ValidationError> {
    let value = non_empty(field, value)?;
    let url = Url::parse(&value).map_err(|e| ValidationError::invalid(field, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ValidationError::invalid(
            field,
            format!("scheme `{other}` is not http or https"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("customerName", "  Ada  ").unwrap(), "Ada");
        assert_eq!(
            non_empty("customerName", "   "),
            Err(ValidationError::missing("customerName"))
        );
    }

    #[test]
    fn test_reference_charset_and_length() {
        assert!(reference("paymentReference", "ORD_2024-001").is_ok());
        assert!(reference("paymentReference", "ORD 001").is_err());
        assert!(reference("paymentReference", &"a".repeat(MAX_REFERENCE_LEN + 1)).is_err());
    }

    #[test]
    fn test_transaction_reference_allows_gateway_separators() {
        assert_eq!(
            transaction_reference("transactionReference", "ERCS|2024 1008").unwrap_err(),
            ValidationError::invalid("transactionReference", "must not contain whitespace")
        );
        assert!(transaction_reference("transactionReference", "ERCS|20241008144651|1728").is_ok());
        assert!(transaction_reference("transactionReference", "").is_err());
        assert!(transaction_reference("transactionReference", "1.2").is_ok());
    }

    #[test]
    fn test_transaction_reference_rejects_dot_segments() {
        for reference in [".", "..", "..."] {
            assert_eq!(
                transaction_reference("transactionReference", reference).unwrap_err(),
                ValidationError::invalid("transactionReference", "must not consist of dots only")
            );
        }
    }

    #[test]
    fn test_email() {
        assert!(email("customerEmail", "ada@example.com").is_ok());
        let err = email("customerEmail", "ada.example.com").unwrap_err();
        assert_eq!(err.field(), Some("customerEmail"));
    }

    #[test]
    fn test_phone_strips_separators() {
        assert_eq!(phone("customerPhoneNumber", "+234 801-234-5678").unwrap(), "+2348012345678");
        assert!(phone("customerPhoneNumber", "12ab").is_err());
        assert!(phone("customerPhoneNumber", "123").is_err());
    }

    #[test]
    fn test_http_url() {
        assert!(http_url("redirectUrl", "https://shop.example/return").is_ok());
        assert!(http_url("redirectUrl", "ftp://shop.example").is_err());
        assert!(http_url("redirectUrl", "/relative").is_err());
    }
}
