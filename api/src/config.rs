use std::{str::FromStr, time::Duration};

use url::Url;

use crate::{
    rate_limit::{MAX_WINDOW, RateLimitConfig},
    turnstile::DEFAULT_VERIFY_URL,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

impl Env {
    fn parse(env: &str) -> Self {
        match env {
            "dev" => Env::Dev,
            "staging" => Env::Staging,
            "production" => Env::Production,
            _ => Env::Dev,
        }
    }

    /// Reads `ENVIRONMENT` without going through the logging helpers, so it can
    /// be used before the tracing subscriber is installed.
    pub fn from_env() -> Self {
        std::env::var("ENVIRONMENT")
            .map(|env| Env::parse(&env))
            .unwrap_or(Env::Dev)
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub env: Env,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: usize,
    pub turnstile: TurnstileConfig,
    pub rate_limit: RateLimitConfig,
    pub store_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct TurnstileConfig {
    /// `None` disables the verification gate.
    pub secret_key: Option<String>,
    pub verify_url: Url,
    pub timeout: Duration,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => match e {
            std::env::VarError::NotPresent => Ok(None),
            std::env::VarError::NotUnicode(_) => Err(format!(
                "Could not get the environment variable `{key}` due to unicode error"
            )),
        },
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

/// Parses an optional variable, falling back to `default` when it is missing
/// or malformed.
fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Ok(Some(raw)) => parse_or(key, &raw, default),
        Ok(None) => default,
        Err(e) => {
            tracing::warn!("{e}, using the default value");
            default
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!("Environment variable `{key}` has an invalid value `{raw}`, using the default value");
            default
        }
    }
}

fn non_empty(val: Option<String>) -> Option<String> {
    val.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let secret_key = non_empty(var("TURNSTILE_SECRET_KEY").unwrap_or_default());

        let verify_url = match non_empty(var("TURNSTILE_VERIFY_URL").unwrap_or_default()) {
            Some(raw) => Url::parse(&raw).unwrap_or_else(|e| {
                tracing::error!("TURNSTILE_VERIFY_URL `{raw}` is not a valid URL: {e}");
                std::process::exit(1)
            }),
            None => default_verify_url(),
        };

        let defaults = RateLimitConfig::default();

        ServerConfig {
            env: Env::from_env(),
            port: parsed_var("PORT", 3000),
            database_url: required_var("DATABASE_URL"),
            database_max_connections: parsed_var("DATABASE_MAX_CONNECTIONS", 10),
            turnstile: TurnstileConfig {
                secret_key,
                verify_url,
                timeout: Duration::from_secs(parsed_var("VERIFICATION_TIMEOUT_SECS", 10)),
            },
            rate_limit: RateLimitConfig {
                window: rate_limit_window(parsed_var(
                    "RATE_LIMIT_WINDOW_SECS",
                    defaults.window.as_secs(),
                )),
                max_requests: parsed_var("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests),
            },
            store_timeout: Duration::from_secs(parsed_var("STORE_TIMEOUT_SECS", 10)),
        }
    }
}

/// Keeps the window between one second and [`MAX_WINDOW`].
fn rate_limit_window(secs: u64) -> Duration {
    let window = Duration::from_secs(secs);
    if window.is_zero() {
        tracing::warn!("RATE_LIMIT_WINDOW_SECS must be positive, using the default value");
        return RateLimitConfig::default().window;
    }
    if window > MAX_WINDOW {
        tracing::warn!(
            "RATE_LIMIT_WINDOW_SECS is larger than {}, clamping it",
            MAX_WINDOW.as_secs()
        );
        return MAX_WINDOW;
    }
    window
}

pub fn default_verify_url() -> Url {
    // The constant is a well-formed absolute URL
    Url::parse(DEFAULT_VERIFY_URL).expect("default Turnstile URL must parse")
}
