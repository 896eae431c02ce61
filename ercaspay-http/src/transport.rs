//! HTTP transport for the Ercaspay API.
//!
//! [`Transport`] sends one [`Endpoint`] call and hands back the raw status
//! and body. It knows nothing about the envelope or response models; a
//! reply with any status is a successful exchange here. It fails only with
//! a [`NetworkError`], when the gateway cannot be reached or the exchange
//! breaks off.
//!
//! ## Retries
//!
//! Idempotent endpoints are retried under the configured [`RetryPolicy`]
//! after connect errors, timeouts, and `429`, `502`, `503` or `504`
//! replies, with exponential backoff and full jitter. Once retries run out
//! the last outcome is returned as is. Non-idempotent endpoints are sent
//! exactly once.

use std::fmt::Display;
use std::time::Duration;

use ercaspay::config::{ClientConfig, ConfigError, RetryPolicy};
use ercaspay::error::NetworkErrorKind;
use ercaspay::NetworkError;
use rand::Rng;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::endpoint::Endpoint;

/// A reply as received, before any decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Body bytes.
    pub body: Vec<u8>,
}

/// Sends endpoint calls to the gateway.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct Transport {
    /// Shared reqwest client
    client: Client,
    /// API root, ending in `/`
    base_url: Url,
    /// Authorization and Accept headers sent with every request
    headers: HeaderMap,
    /// Per-attempt timeout
    timeout: Duration,
    /// Applied to idempotent endpoints only
    retry_policy: RetryPolicy,
}

impl Transport {
    /// Builds a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Fails if the base URL, secret key or user agent cannot be used, or
    /// the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| ConfigError::InvalidHeader("User-Agent"))?;
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(Box::new(e)))?;
        Self::with_client(config, client)
    }

    /// Builds a transport on top of an existing reqwest client.
    ///
    /// The client's own `User-Agent` and connect timeout are kept; the
    /// config's per-request timeout and retry policy still apply.
    ///
    /// # Errors
    ///
    /// Fails if the base URL or secret key cannot be used.
    pub fn with_client(config: &ClientConfig, client: Client) -> Result<Self, ConfigError> {
        let base_url = config.resolved_base_url();
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }

        let mut authorization = HeaderValue::from_str(&config.credentials.bearer_value())
            .map_err(|_| ConfigError::InvalidHeader("Authorization"))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            base_url,
            headers,
            timeout: config.timeout,
            retry_policy: config.retry_policy,
        })
    }

    /// Returns the API root.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the per-attempt timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the retry policy for idempotent endpoints.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Sends `endpoint`, with `body` as JSON when given.
    ///
    /// # Errors
    ///
    /// [`NetworkError`] when no reply was received. HTTP error statuses are
    /// returned as [`RawResponse`]s.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "ercaspay.transport.send",
            skip_all,
            fields(
                endpoint = endpoint.context(),
                idempotent = endpoint.is_idempotent(),
                otel.status_code = tracing::field::Empty,
                error.message = tracing::field::Empty,
            )
        )
    )]
    pub async fn send(
        &self,
        endpoint: Endpoint<'_>,
        body: Option<&Value>,
    ) -> Result<RawResponse, NetworkError> {
        let url = endpoint.url(&self.base_url)?;
        let max_retries = if endpoint.is_idempotent() {
            self.retry_policy.max_retries
        } else {
            0
        };

        let mut retry = 0;
        loop {
            let outcome = self.attempt(&url, endpoint, body).await;
            if retry >= max_retries || !is_retryable(&outcome) {
                record_result_on_span(&outcome);
                return outcome;
            }

            let delay = jitter(self.retry_policy.backoff_ceiling(retry));
            #[cfg(feature = "telemetry")]
            tracing::warn!(
                attempt = retry + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                outcome = %describe(&outcome),
                "Retrying idempotent request"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }

    async fn attempt(
        &self,
        url: &Url,
        endpoint: Endpoint<'_>,
        body: Option<&Value>,
    ) -> Result<RawResponse, NetworkError> {
        let context = endpoint.context();
        let mut req = self
            .client
            .request(endpoint.method(), url.clone())
            .headers(self.headers.clone())
            .timeout(self.timeout);
        if let Some(body) = body {
            req = req.json(body);
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(endpoint = context, "Sending request to gateway");

        let response = req
            .send()
            .await
            .map_err(|e| network_error(context, e, NetworkErrorKind::Request))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| network_error(context, e, NetworkErrorKind::Body))?;

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            endpoint = context,
            status = status.as_u16(),
            bytes = body.len(),
            "Received gateway reply"
        );

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn network_error(
    context: &'static str,
    err: reqwest::Error,
    fallback: NetworkErrorKind,
) -> NetworkError {
    let kind = if err.is_timeout() {
        NetworkErrorKind::Timeout
    } else if err.is_connect() {
        NetworkErrorKind::Connect
    } else {
        fallback
    };
    NetworkError::new(kind, context, err)
}

fn is_retryable(outcome: &Result<RawResponse, NetworkError>) -> bool {
    match outcome {
        Ok(response) => matches!(
            response.status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        ),
        Err(err) => matches!(
            err.kind(),
            NetworkErrorKind::Connect | NetworkErrorKind::Timeout
        ),
    }
}

/// Full jitter: uniform in `0..=ceiling`.
fn jitter(ceiling: Duration) -> Duration {
    let max = u64::try_from(ceiling.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rand::rng().random_range(0..=max))
}

#[cfg(feature = "telemetry")]
fn describe(outcome: &Result<RawResponse, NetworkError>) -> String {
    match outcome {
        Ok(response) => format!("HTTP {}", response.status.as_u16()),
        Err(err) => err.to_string(),
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<E: Display>(result: &Result<RawResponse, E>) {
    let span = Span::current();
    match result {
        Ok(response) if !response.status.is_server_error() => {
            span.record("otel.status_code", "OK");
        }
        Ok(response) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", response.status.as_u16());
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to gateway failed");
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<E: Display>(_result: &Result<RawResponse, E>) {}

#[cfg(test)]
mod tests {
    use super::*;
    use ercaspay::Credentials;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> ClientConfig {
        ClientConfig::new(Credentials::new("ECRS-TEST-SKsecret").unwrap())
            .with_base_url(server.uri().parse::<Url>().unwrap())
            .with_retry_policy(
                RetryPolicy::default()
                    .with_initial_backoff(Duration::from_millis(1))
                    .with_max_backoff(Duration::from_millis(5)),
            )
    }

    #[tokio::test]
    async fn test_sends_auth_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payment/initiate"))
            .and(header("authorization", "Bearer ECRS-TEST-SKsecret"))
            .and(header("accept", "application/json"))
            .and(body_json(serde_json::json!({"amount": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::new(&config(&server)).unwrap();
        let body = serde_json::json!({"amount": 10});
        let response = transport
            .send(Endpoint::InitiatePayment, Some(&body))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, b"ok");
    }

    #[tokio::test]
    async fn test_non_idempotent_is_sent_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment/cancel/ERCS-1"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::new(&config(&server)).unwrap();
        let response = transport
            .send(Endpoint::CancelTransaction("ERCS-1"), None)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_idempotent_retries_until_bound() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment/details/ERCS-1"))
            .respond_with(ResponseTemplate::new(502))
            .expect(4)
            .mount(&server)
            .await;

        let transport = Transport::new(&config(&server)).unwrap();
        let response = transport
            .send(Endpoint::TransactionDetails("ERCS-1"), None)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_idempotent_recovers_after_transient_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment/ussd/supported-banks"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/payment/ussd/supported-banks"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::new(&config(&server)).unwrap();
        let response = transport
            .send(Endpoint::UssdSupportedBanks, None)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_internal_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment/details/ERCS-1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::new(&config(&server)).unwrap();
        let response = transport
            .send(Endpoint::TransactionDetails("ERCS-1"), None)
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payment/transaction/verify/ERCS-1"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(2)
            .mount(&server)
            .await;

        let config = config(&server)
            .with_timeout(Duration::from_millis(50))
            .with_retry_policy(
                RetryPolicy::default()
                    .with_max_retries(1)
                    .with_initial_backoff(Duration::from_millis(1)),
            );
        let transport = Transport::new(&config).unwrap();
        let err = transport
            .send(Endpoint::VerifyTransaction("ERCS-1"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), NetworkErrorKind::Timeout);
        assert_eq!(err.context(), "GET payment/transaction/verify");
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ClientConfig::new(Credentials::new("k").unwrap())
            .with_base_url(format!("http://127.0.0.1:{port}/").parse().unwrap())
            .with_retry_policy(RetryPolicy::none());
        let transport = Transport::new(&config).unwrap();
        let err = transport
            .send(Endpoint::InitiatePayment, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), NetworkErrorKind::Connect);
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = ClientConfig::new(Credentials::new("ECRS-TEST-SKsupersecret").unwrap());
        let transport = Transport::new(&config).unwrap();
        let rendered = format!("{transport:?}");
        assert!(!rendered.contains("SKsupersecret"), "{rendered}");
    }

    #[test]
    fn test_jitter_stays_under_ceiling() {
        let ceiling = Duration::from_millis(20);
        for _ in 0..100 {
            assert!(jitter(ceiling) <= ceiling);
        }
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
    }
}
