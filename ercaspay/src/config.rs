//! Client configuration.
//!
//! A [`ClientConfig`] is built explicitly and handed to the client; there is
//! no global key state. It can also be read from the environment.
//!
//! # Environment Variables
//!
//! - `ERCASPAY_SECRET_KEY` - secret key, required
//! - `ERCASPAY_PUBLIC_KEY` - public key
//! - `ERCASPAY_ENV` - `staging` or `live`; inferred from the secret key when unset
//! - `ERCASPAY_BASE_URL` - overrides the environment's base URL
//! - `ERCASPAY_TIMEOUT_SECS` - per-request timeout in seconds

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use url::Url;

/// Secret key variable.
pub const ENV_SECRET_KEY: &str = "ERCASPAY_SECRET_KEY";
/// Public key variable.
pub const ENV_PUBLIC_KEY: &str = "ERCASPAY_PUBLIC_KEY";
/// Environment selector variable.
pub const ENV_ENVIRONMENT: &str = "ERCASPAY_ENV";
/// Base URL override variable.
pub const ENV_BASE_URL: &str = "ERCASPAY_BASE_URL";
/// Request timeout variable.
pub const ENV_TIMEOUT_SECS: &str = "ERCASPAY_TIMEOUT_SECS";

/// Secret keys issued for the live environment start with this.
pub const LIVE_KEY_PREFIX: &str = "ECRS-LIVE-";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default `User-Agent`.
pub const DEFAULT_USER_AGENT: &str = concat!("ercaspay-rust/", env!("CARGO_PKG_VERSION"));

static STAGING_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://api.merchant.staging.ercaspay.com/api/v1/").expect("staging URL is valid")
});

static LIVE_URL: LazyLock<Url> =
    LazyLock::new(|| Url::parse("https://api.ercaspay.com/api/v1/").expect("live URL is valid"));

/// Errors building a [`ClientConfig`] or a client from it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset.
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    /// An environment variable holds an unusable value.
    #[error("environment variable {name} is invalid: {reason}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// What is wrong with it.
        reason: String,
    },
    /// The secret key is blank or cannot be sent in a header.
    #[error("secret key is {0}")]
    InvalidSecretKey(&'static str),
    /// A configured value cannot be sent as the named header.
    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),
    /// The base URL cannot have paths joined onto it.
    #[error("base URL {0} cannot be used as a base")]
    InvalidBaseUrl(Url),
    /// The `.env` file exists but could not be read.
    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// API credentials.
///
/// `Debug` never prints the secret key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    secret_key: String,
    public_key: Option<String>,
}

impl Credentials {
    /// Wraps a secret key.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidSecretKey`] if the key is blank or contains
    /// characters that cannot appear in an `Authorization` header.
    pub fn new(secret_key: impl Into<String>) -> Result<Self, ConfigError> {
        let secret_key = secret_key.into().trim().to_owned();
        if secret_key.is_empty() {
            return Err(ConfigError::InvalidSecretKey("empty"));
        }
        if !secret_key.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(ConfigError::InvalidSecretKey("not printable ASCII"));
        }
        Ok(Self {
            secret_key,
            public_key: None,
        })
    }

    /// Attaches the public key.
    #[must_use]
    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        let public_key = public_key.into();
        self.public_key = (!public_key.trim().is_empty()).then_some(public_key);
        self
    }

    /// The secret key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    /// The public key, if one was given.
    #[must_use]
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    /// `Authorization` header value.
    #[must_use]
    pub fn bearer_value(&self) -> String {
        format!("Bearer {}", self.secret_key)
    }

    /// Whether the secret key was issued for [`Environment::Live`].
    #[must_use]
    pub fn is_live_key(&self) -> bool {
        self.secret_key.starts_with(LIVE_KEY_PREFIX)
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("secret_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Which gateway deployment to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Sandbox; no real money moves.
    #[default]
    Staging,
    /// Production.
    Live,
}

impl Environment {
    /// The deployment's API root, ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> Url {
        match self {
            Self::Staging => STAGING_URL.clone(),
            Self::Live => LIVE_URL.clone(),
        }
    }

    /// Picks the environment a secret key was issued for.
    #[must_use]
    pub fn for_credentials(credentials: &Credentials) -> Self {
        if credentials.is_live_key() {
            Self::Live
        } else {
            Self::Staging
        }
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Live => "live",
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" | "sandbox" | "test" => Ok(Self::Staging),
            "live" | "production" | "prod" => Ok(Self::Live),
            other => Err(format!("unknown environment `{other}`, expected staging or live")),
        }
    }
}

/// How idempotent calls are retried.
///
/// The delay before retry `n` (0-based) is drawn uniformly from
/// `0..=min(initial_backoff * multiplier^n, max_backoff)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Ceiling of the first delay.
    pub initial_backoff: Duration,
    /// Growth factor of the ceiling.
    pub multiplier: u32,
    /// Largest ceiling.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            multiplier: 2,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            multiplier: 1,
            max_backoff: Duration::ZERO,
        }
    }

    /// Sets the number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the first delay ceiling.
    #[must_use]
    pub const fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Sets the largest delay ceiling.
    #[must_use]
    pub const fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Upper bound of the delay before retry `retry` (0-based).
    #[must_use]
    pub fn backoff_ceiling(&self, retry: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(self.multiplier.saturating_pow(retry))
            .min(self.max_backoff)
    }
}

/// Everything a client needs to talk to the gateway.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// Target deployment.
    pub environment: Environment,
    /// Replaces the environment's base URL when set.
    pub base_url: Option<Url>,
    /// Per-request timeout, covering each attempt separately.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Retry behaviour for idempotent calls.
    pub retry_policy: RetryPolicy,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a config with defaults, targeting the environment the secret
    /// key was issued for.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            environment: Environment::for_credentials(&credentials),
            credentials,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Sets the environment.
    #[must_use]
    pub const fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Overrides the base URL. A trailing `/` is added if missing so that
    /// endpoint paths join beneath it.
    #[must_use]
    pub fn with_base_url(mut self, mut url: Url) -> Self {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = Some(url);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// The URL endpoint paths are joined onto.
    #[must_use]
    pub fn resolved_base_url(&self) -> Url {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.environment.base_url())
    }

    /// Reads the config from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when `ERCASPAY_SECRET_KEY` is unset or any variable is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Loads `.env` from the current directory or its parents, then reads
    /// the config from the environment. A missing `.env` is not an error.
    ///
    /// # Errors
    ///
    /// Fails when `.env` exists but is malformed, or as [`Self::from_env`].
    pub fn from_dotenv() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e.into()),
        }
        Self::from_env()
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let secret = var(ENV_SECRET_KEY).ok_or(ConfigError::MissingVar(ENV_SECRET_KEY))?;
        let mut credentials = Credentials::new(secret)?;
        if let Some(public_key) = var(ENV_PUBLIC_KEY) {
            credentials = credentials.with_public_key(public_key);
        }

        let mut config = Self::new(credentials);

        if let Some(env) = var(ENV_ENVIRONMENT) {
            let environment = env.parse().map_err(|reason| ConfigError::InvalidVar {
                name: ENV_ENVIRONMENT,
                reason,
            })?;
            config = config.with_environment(environment);
        }
        if let Some(url) = var(ENV_BASE_URL) {
            let url = Url::parse(url.trim()).map_err(|e| ConfigError::InvalidVar {
                name: ENV_BASE_URL,
                reason: e.to_string(),
            })?;
            config = config.with_base_url(url);
        }
        if let Some(secs) = var(ENV_TIMEOUT_SECS) {
            let secs = secs
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidVar {
                    name: ENV_TIMEOUT_SECS,
                    reason: format!("`{secs}` is not a positive number of seconds"),
                })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            environment = %config.environment,
            base_url = %config.resolved_base_url(),
            "Loaded Ercaspay configuration from environment"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credentials = Credentials::new("ECRS-TEST-SKabc123secret")
            .unwrap()
            .with_public_key("ECRS-TEST-PKxyz");
        let config = ClientConfig::new(credentials.clone());
        for rendered in [format!("{credentials:?}"), format!("{config:?}"), format!("{config:#?}")] {
            assert!(!rendered.contains("SKabc123secret"), "{rendered}");
            assert!(rendered.contains("[REDACTED]"));
        }
    }

    #[test]
    fn test_credentials_reject_blank_and_unprintable() {
        assert!(matches!(
            Credentials::new("   "),
            Err(ConfigError::InvalidSecretKey(_))
        ));
        assert!(matches!(
            Credentials::new("ECRS key"),
            Err(ConfigError::InvalidSecretKey(_))
        ));
    }

    #[test]
    fn test_environment_from_key_prefix() {
        let live = ClientConfig::new(Credentials::new("ECRS-LIVE-SK123").unwrap());
        assert_eq!(live.environment, Environment::Live);
        assert_eq!(live.resolved_base_url().as_str(), "https://api.ercaspay.com/api/v1/");

        let test = ClientConfig::new(Credentials::new("ECRS-TEST-SK123").unwrap());
        assert_eq!(test.environment, Environment::Staging);
        assert_eq!(
            test.resolved_base_url().as_str(),
            "https://api.merchant.staging.ercaspay.com/api/v1/"
        );
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::new(Credentials::new("k").unwrap())
            .with_base_url(Url::parse("http://127.0.0.1:9000/api/v1").unwrap());
        assert_eq!(config.resolved_base_url().as_str(), "http://127.0.0.1:9000/api/v1/");
    }

    #[test]
    fn test_from_vars() {
        let config = ClientConfig::from_vars(vars(&[
            (ENV_SECRET_KEY, "ECRS-LIVE-SK1"),
            (ENV_PUBLIC_KEY, "ECRS-LIVE-PK1"),
            (ENV_ENVIRONMENT, "Staging"),
            (ENV_BASE_URL, "http://localhost:8080"),
            (ENV_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.credentials.public_key(), Some("ECRS-LIVE-PK1"));
        assert_eq!(config.resolved_base_url().as_str(), "http://localhost:8080/");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_vars_errors() {
        assert!(matches!(
            ClientConfig::from_vars(vars(&[])),
            Err(ConfigError::MissingVar(ENV_SECRET_KEY))
        ));
        assert!(matches!(
            ClientConfig::from_vars(vars(&[(ENV_SECRET_KEY, "k"), (ENV_ENVIRONMENT, "mars")])),
            Err(ConfigError::InvalidVar { name: ENV_ENVIRONMENT, .. })
        ));
        assert!(matches!(
            ClientConfig::from_vars(vars(&[(ENV_SECRET_KEY, "k"), (ENV_TIMEOUT_SECS, "0")])),
            Err(ConfigError::InvalidVar { name: ENV_TIMEOUT_SECS, .. })
        ));
    }

    #[test]
    fn test_backoff_ceiling() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ceiling(0), Duration::from_millis(200));
        assert_eq!(policy.backoff_ceiling(1), Duration::from_millis(400));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_millis(800));
        assert_eq!(policy.backoff_ceiling(10), Duration::from_secs(5));
        assert_eq!(policy.backoff_ceiling(u32::MAX), Duration::from_secs(5));
        assert_eq!(RetryPolicy::none().max_retries, 0);
    }
}
