//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `UNSPLASH_ACCESS_KEY` - Unsplash API access key (image search)
//! - `API_NINJAS_KEY` - API Ninjas key (vehicle catalog)
//!
//! ## Optional
//! - `CAR_FINDER_HOST` - Bind address (default: 127.0.0.1)
//! - `CAR_FINDER_PORT` - Listen port (default: 3000)
//! - `CAR_FINDER_DATASET_PATH` - Car dataset JSON file (default: crates/server/data/cars.json)
//! - `CAR_FINDER_PLACEHOLDER_IMAGE` - Image used when enrichment fails (default: /images/default.jpg)
//! - `UNSPLASH_API_URL` - Unsplash API base URL (default: <https://api.unsplash.com>)
//! - `API_NINJAS_API_URL` - API Ninjas base URL (default: <https://api.api-ninjas.com>)
//! - `OUTBOUND_TIMEOUT_SECS` - Deadline for each upstream call (default: 10)
//! - `OUTBOUND_MAX_CONCURRENCY` - Max in-flight image lookups per process (default: 8)
//! - `IMAGE_CACHE_TTL_SECS` - Image lookup cache TTL, 0 disables (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_UNSPLASH_API_URL: &str = "https://api.unsplash.com";
const DEFAULT_API_NINJAS_API_URL: &str = "https://api.api-ninjas.com";
const DEFAULT_PLACEHOLDER_IMAGE: &str = "/images/default.jpg";
const DEFAULT_DATASET_PATH: &str = "crates/server/data/cars.json";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Path to the car dataset JSON file
    pub dataset_path: PathBuf,
    /// Unsplash image search configuration
    pub unsplash: UnsplashConfig,
    /// API Ninjas vehicle catalog configuration
    pub api_ninjas: ApiNinjasConfig,
    /// Limits applied to every upstream call
    pub outbound: OutboundConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Unsplash API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct UnsplashConfig {
    /// API base URL
    pub base_url: Url,
    /// Access key, sent as the `client_id` query parameter
    pub access_key: SecretString,
    /// Image returned whenever a lookup yields nothing
    pub placeholder_image: String,
}

impl std::fmt::Debug for UnsplashConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsplashConfig")
            .field("base_url", &self.base_url.as_str())
            .field("access_key", &"[REDACTED]")
            .field("placeholder_image", &self.placeholder_image)
            .finish()
    }
}

/// API Ninjas configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ApiNinjasConfig {
    /// API base URL
    pub base_url: Url,
    /// API key, sent in the `X-Api-Key` header
    pub api_key: SecretString,
}

impl std::fmt::Debug for ApiNinjasConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiNinjasConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Limits on upstream calls.
#[derive(Debug, Clone)]
pub struct OutboundConfig {
    /// Deadline for a single upstream request
    pub timeout: Duration,
    /// Max image lookups in flight across all requests
    pub max_concurrency: usize,
    /// How long successful image lookups are cached; `None` disables caching
    pub image_cache_ttl: Option<Duration>,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_concurrency: 8,
            image_cache_ttl: Some(Duration::from_secs(300)),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("CAR_FINDER_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("CAR_FINDER_PORT", "3000")?;
        let dataset_path =
            PathBuf::from(get_env_or_default("CAR_FINDER_DATASET_PATH", DEFAULT_DATASET_PATH));

        let unsplash = UnsplashConfig::from_env()?;
        let api_ninjas = ApiNinjasConfig::from_env()?;
        let outbound = OutboundConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_sample_rate("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate = parse_sample_rate("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            host,
            port,
            dataset_path,
            unsplash,
            api_ninjas,
            outbound,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl UnsplashConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_env_or_default("UNSPLASH_API_URL", DEFAULT_UNSPLASH_API_URL)?,
            access_key: get_validated_secret("UNSPLASH_ACCESS_KEY")?,
            placeholder_image: get_env_or_default(
                "CAR_FINDER_PLACEHOLDER_IMAGE",
                DEFAULT_PLACEHOLDER_IMAGE,
            ),
        })
    }
}

impl ApiNinjasConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_env_or_default("API_NINJAS_API_URL", DEFAULT_API_NINJAS_API_URL)?,
            api_key: get_validated_secret("API_NINJAS_KEY")?,
        })
    }
}

impl OutboundConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = parse_env_or_default::<u64>("OUTBOUND_TIMEOUT_SECS", "10")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "OUTBOUND_TIMEOUT_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let max_concurrency = parse_env_or_default::<usize>("OUTBOUND_MAX_CONCURRENCY", "8")?;
        if max_concurrency == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "OUTBOUND_MAX_CONCURRENCY".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        let cache_ttl_secs = parse_env_or_default::<u64>("IMAGE_CACHE_TTL_SECS", "300")?;

        Ok(Self {
            timeout: Duration::from_secs(timeout_secs),
            max_concurrency,
            image_cache_ttl: (cache_ttl_secs > 0).then(|| Duration::from_secs(cache_ttl_secs)),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a Sentry sample rate, which must lie in `0.0..=1.0`.
fn parse_sample_rate(key: &str, default: &str) -> Result<f32, ConfigError> {
    let rate = parse_env_or_default::<f32>(key, default)?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real API keys are random strings)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Check the key was copied correctly."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            unsplash: UnsplashConfig {
                base_url: Url::parse(DEFAULT_UNSPLASH_API_URL).unwrap(),
                access_key: SecretString::from("super_private_unsplash_key"),
                placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
            },
            api_ninjas: ApiNinjasConfig {
                base_url: Url::parse(DEFAULT_API_NINJAS_API_URL).unwrap(),
                api_key: SecretString::from("super_private_ninjas_key"),
            },
            outbound: OutboundConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-unsplash-key", "UNSPLASH_ACCESS_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "API_NINJAS_KEY");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // Shaped like a real Unsplash access key
        let result =
            validate_secret_strength("Qm7xZ2pLk9vR4tW8yB1nC6dF3gH5jS0aUeIoPq", "UNSPLASH_ACCESS_KEY");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_sample_rate_bounds() {
        let rate = parse_sample_rate("CAR_FINDER_TEST_UNSET_RATE", "0.25").unwrap();
        assert!((rate - 0.25).abs() < f32::EPSILON);
        assert!(parse_sample_rate("CAR_FINDER_TEST_UNSET_RATE", "1.5").is_err());
        assert!(parse_sample_rate("CAR_FINDER_TEST_UNSET_RATE", "abc").is_err());
    }

    #[test]
    fn test_parse_env_or_default_uses_default() {
        let port: u16 = parse_env_or_default("CAR_FINDER_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);

        let url: Result<Url, _> = parse_env_or_default("CAR_FINDER_TEST_UNSET_URL", "not a url");
        assert!(matches!(url, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_socket_addr() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_outbound_defaults() {
        let outbound = OutboundConfig::default();
        assert_eq!(outbound.timeout, Duration::from_secs(10));
        assert_eq!(outbound.max_concurrency, 8);
        assert_eq!(outbound.image_cache_ttl, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let config = test_config();
        let debug_output = format!("{config:?}");

        // Public fields should be visible
        assert!(debug_output.contains("api.unsplash.com"));
        assert!(debug_output.contains("api.api-ninjas.com"));

        // Secret fields should be redacted
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_private_unsplash_key"));
        assert!(!debug_output.contains("super_private_ninjas_key"));
    }
}
