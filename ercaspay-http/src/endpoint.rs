//! Gateway endpoints and their retry safety.

use ercaspay::NetworkError;
use ercaspay::error::NetworkErrorKind;
use reqwest::Method;
use url::Url;
use url::form_urlencoded::byte_serialize;

/// One gateway operation, with the transaction reference it targets where
/// the path carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// `POST payment/initiate`
    InitiatePayment,
    /// `GET payment/transaction/verify/{reference}`
    VerifyTransaction(&'a str),
    /// `GET payment/details/{reference}`
    TransactionDetails(&'a str),
    /// `GET payment/cancel/{reference}`
    CancelTransaction(&'a str),
    /// `GET payment/bank-transfer/request-bank-account/{reference}`
    RequestBankAccount(&'a str),
    /// `POST payment/ussd/request-ussd-code`
    RequestUssdCode,
    /// `GET payment/ussd/supported-banks`
    UssdSupportedBanks,
}

impl Endpoint<'_> {
    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            Self::InitiatePayment | Self::RequestUssdCode => Method::POST,
            _ => Method::GET,
        }
    }

    /// Whether repeating the call cannot change gateway state.
    ///
    /// Only idempotent endpoints are retried. Cancellation and the channel
    /// requests are `GET`s on the wire but allocate or mutate state, so they
    /// count as non-idempotent.
    #[must_use]
    pub const fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Self::VerifyTransaction(_) | Self::TransactionDetails(_) | Self::UssdSupportedBanks
        )
    }

    /// Method and path template, used in logs and error messages.
    #[must_use]
    pub const fn context(&self) -> &'static str {
        match self {
            Self::InitiatePayment => "POST payment/initiate",
            Self::VerifyTransaction(_) => "GET payment/transaction/verify",
            Self::TransactionDetails(_) => "GET payment/details",
            Self::CancelTransaction(_) => "GET payment/cancel",
            Self::RequestBankAccount(_) => "GET payment/bank-transfer/request-bank-account",
            Self::RequestUssdCode => "POST payment/ussd/request-ussd-code",
            Self::UssdSupportedBanks => "GET payment/ussd/supported-banks",
        }
    }

    const fn path(&self) -> &'static str {
        match self {
            Self::InitiatePayment => "payment/initiate",
            Self::VerifyTransaction(_) => "payment/transaction/verify",
            Self::TransactionDetails(_) => "payment/details",
            Self::CancelTransaction(_) => "payment/cancel",
            Self::RequestBankAccount(_) => "payment/bank-transfer/request-bank-account",
            Self::RequestUssdCode => "payment/ussd/request-ussd-code",
            Self::UssdSupportedBanks => "payment/ussd/supported-banks",
        }
    }

    /// The transaction reference in the path, if any.
    #[must_use]
    pub const fn reference(&self) -> Option<&str> {
        match self {
            Self::VerifyTransaction(r)
            | Self::TransactionDetails(r)
            | Self::CancelTransaction(r)
            | Self::RequestBankAccount(r) => Some(*r),
            Self::InitiatePayment | Self::RequestUssdCode | Self::UssdSupportedBanks => None,
        }
    }

    /// Resolves the endpoint beneath `base`. The reference is percent-encoded
    /// into a single path segment.
    ///
    /// # Errors
    ///
    /// Fails if `base` cannot be a base URL, or if the reference is a dot
    /// segment that would resolve to another endpoint.
    pub fn url(&self, base: &Url) -> Result<Url, NetworkError> {
        let path = match self.reference() {
            Some(reference) if reference.chars().all(|c| c == '.') => {
                return Err(NetworkError::new(
                    NetworkErrorKind::Request,
                    self.context(),
                    format!("`{reference}` is not a usable path segment"),
                ));
            }
            Some(reference) => format!("{}/{}", self.path(), encode_segment(reference)),
            None => self.path().to_owned(),
        };
        base.join(&path)
            .map_err(|e| NetworkError::new(NetworkErrorKind::Request, self.context(), e))
    }
}

/// Encodes everything but ASCII alphanumerics and `*-._`.
fn encode_segment(raw: &str) -> String {
    byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://api.merchant.staging.ercaspay.com/api/v1/").unwrap()
    }

    #[test]
    fn test_reference_is_one_encoded_segment() {
        let url = Endpoint::VerifyTransaction("ERCS|20241008|1/2")
            .url(&base())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.merchant.staging.ercaspay.com/api/v1/payment/transaction/verify/ERCS%7C20241008%7C1%2F2"
        );
        assert_eq!(
            Endpoint::CancelTransaction("v1.2").url(&base()).unwrap().path(),
            "/api/v1/payment/cancel/v1.2"
        );
        assert_eq!(encode_segment("a b+c"), "a%20b%2Bc");
    }

    #[test]
    fn test_dot_segments_are_refused() {
        for reference in [".", ".."] {
            let err = Endpoint::CancelTransaction(reference)
                .url(&base())
                .unwrap_err();
            assert_eq!(err.kind(), NetworkErrorKind::Request);
        }
    }

    #[test]
    fn test_paths_without_reference() {
        assert_eq!(
            Endpoint::InitiatePayment.url(&base()).unwrap().path(),
            "/api/v1/payment/initiate"
        );
        assert_eq!(
            Endpoint::UssdSupportedBanks.url(&base()).unwrap().path(),
            "/api/v1/payment/ussd/supported-banks"
        );
    }

    #[test]
    fn test_idempotency() {
        let idempotent = [
            Endpoint::VerifyTransaction("r"),
            Endpoint::TransactionDetails("r"),
            Endpoint::UssdSupportedBanks,
        ];
        let not_idempotent = [
            Endpoint::InitiatePayment,
            Endpoint::CancelTransaction("r"),
            Endpoint::RequestBankAccount("r"),
            Endpoint::RequestUssdCode,
        ];
        assert!(idempotent.iter().all(Endpoint::is_idempotent));
        assert!(!not_idempotent.iter().any(Endpoint::is_idempotent));
        assert_eq!(Endpoint::InitiatePayment.method(), Method::POST);
        assert_eq!(Endpoint::CancelTransaction("r").method(), Method::GET);
    }
}
