//! Auth service configuration.
//!
//! Configuration is loaded from environment variables once at startup and
//! passed to components explicitly. Static key material is redacted in Debug
//! output.

use crate::auth::VerifierConfig;
use crate::keystore::jwks::DEFAULT_CACHE_TTL_SECONDS;
use crate::keystore::Purpose;
use crate::middleware::auth::DEFAULT_TOKEN_QUERY_PARAM;
use common::jwt::{DEFAULT_CLOCK_SKEW, DEFAULT_MAX_TOKEN_AGE, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Where the keystore comes from.
#[derive(Clone)]
pub enum KeystoreSource {
    /// `AUTH_KEYS`: `id=base64,id=base64`.
    Static(SecretString),

    /// `AUTH_JWKS_URL` with its cache TTL.
    Jwks { url: String, cache_ttl: Duration },
}

impl fmt::Debug for KeystoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeystoreSource::Static(_) => f.debug_tuple("Static").field(&"[REDACTED]").finish(),
            KeystoreSource::Jwks { url, cache_ttl } => f
                .debug_struct("Jwks")
                .field("url", url)
                .field("cache_ttl", cache_ttl)
                .finish(),
        }
    }
}

/// Auth service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Key family and algorithm (default: public).
    pub purpose: Purpose,

    /// Reject requests without a token.
    pub require_auth: bool,

    /// Maximum age of tokens without `exp`.
    pub max_token_age: Duration,

    /// Tolerance for `iat` in the future.
    pub clock_skew: Duration,

    /// Query parameter checked for a token (default: "token").
    pub token_query_param: String,

    pub keystore_source: KeystoreSource,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Config::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// `MissingEnvVar` when neither `AUTH_KEYS` nor `AUTH_JWKS_URL` is set,
    /// `InvalidValue` for anything that does not parse or is out of range.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let purpose = match vars.get("AUTH_PURPOSE") {
            Some(value) => value.parse().map_err(|e| ConfigError::InvalidValue {
                var: "AUTH_PURPOSE",
                reason: format!("{e}"),
            })?,
            None => Purpose::default(),
        };

        let require_auth = resolve_require_auth(vars);

        let max_token_age = match vars.get("TOKEN_MAX_AGE_SECONDS") {
            Some(value) => Duration::from_secs(parse_seconds("TOKEN_MAX_AGE_SECONDS", value)?),
            None => DEFAULT_MAX_TOKEN_AGE,
        };

        let clock_skew = match vars.get("JWT_CLOCK_SKEW_SECONDS") {
            Some(value) => {
                let secs = parse_seconds("JWT_CLOCK_SKEW_SECONDS", value)?;
                if secs > MAX_CLOCK_SKEW.as_secs() {
                    return Err(ConfigError::InvalidValue {
                        var: "JWT_CLOCK_SKEW_SECONDS",
                        reason: format!(
                            "must not exceed {} seconds, got {secs}",
                            MAX_CLOCK_SKEW.as_secs()
                        ),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_CLOCK_SKEW,
        };

        let token_query_param = match vars.get("AUTH_TOKEN_QUERY_PARAM") {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    var: "AUTH_TOKEN_QUERY_PARAM",
                    reason: "must not be empty".to_string(),
                });
            }
            Some(value) => value.trim().to_string(),
            None => DEFAULT_TOKEN_QUERY_PARAM.to_string(),
        };

        let keystore_source = keystore_source(vars, purpose)?;

        Ok(Config {
            bind_address,
            purpose,
            require_auth,
            max_token_age,
            clock_skew,
            token_query_param,
            keystore_source,
        })
    }

    /// Verifier settings derived from this configuration.
    #[must_use]
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            purpose: self.purpose,
            max_token_age: self.max_token_age,
            clock_skew: self.clock_skew,
        }
    }
}

/// Resolve whether authentication is required.
///
/// `AUTH_REQUIRED` wins when set: `"false"` or `"0"` disable, anything else
/// enables. Otherwise authentication is required only when `APP_ENV` is
/// `production` (case-insensitive).
#[must_use]
pub fn resolve_require_auth(vars: &HashMap<String, String>) -> bool {
    if let Some(value) = vars.get("AUTH_REQUIRED") {
        return !matches!(value.trim(), "false" | "0");
    }

    vars.get("APP_ENV")
        .is_some_and(|env| env.trim().eq_ignore_ascii_case("production"))
}

fn keystore_source(
    vars: &HashMap<String, String>,
    purpose: Purpose,
) -> Result<KeystoreSource, ConfigError> {
    if let Some(url) = vars.get("AUTH_JWKS_URL").filter(|u| !u.trim().is_empty()) {
        if purpose != Purpose::Public {
            return Err(ConfigError::InvalidValue {
                var: "AUTH_JWKS_URL",
                reason: "JWKS keys require AUTH_PURPOSE=public".to_string(),
            });
        }

        let cache_ttl = match vars.get("AUTH_JWKS_CACHE_TTL_SECONDS") {
            Some(value) => parse_seconds("AUTH_JWKS_CACHE_TTL_SECONDS", value)?,
            None => DEFAULT_CACHE_TTL_SECONDS,
        };

        return Ok(KeystoreSource::Jwks {
            url: url.trim().to_string(),
            cache_ttl: Duration::from_secs(cache_ttl),
        });
    }

    match vars.get("AUTH_KEYS").filter(|k| !k.trim().is_empty()) {
        Some(keys) => Ok(KeystoreSource::Static(SecretString::from(keys.clone()))),
        None => Err(ConfigError::MissingEnvVar(
            "AUTH_KEYS or AUTH_JWKS_URL".to_string(),
        )),
    }
}

/// Parse a strictly positive number of seconds.
fn parse_seconds(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    let secs: u64 = value.trim().parse().map_err(|e| ConfigError::InvalidValue {
        var,
        reason: format!("must be a positive integer, got '{value}': {e}"),
    })?;

    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            var,
            reason: "must be greater than 0".to_string(),
        });
    }

    Ok(secs)
}
