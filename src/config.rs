//! Configuration types.
//!
//! Everything is read from environment variables once at startup (an
//! optional `.env` file is loaded first) and passed down explicitly.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

pub const DEFAULT_WORKBOOK_DIR: &str = "./workbook";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one CSV file per table.
    pub workbook_dir: PathBuf,
    pub oracle: OracleConfig,
    pub run: RunConfig,
    /// `None` disables email (every send is recorded as skipped).
    pub smtp: Option<SmtpConfig>,
}

/// Decision service configuration.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Missing or blank keys yield a `MISSING_KEY` decision without a request.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Matching run configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Pause after every processed volunteer, keeps us under the oracle's rate limit.
    pub delay: Duration,
    /// Prefixed to 10-digit phone numbers in contact links.
    pub country_code: String,
    /// Addresses containing this are never emailed.
    pub placeholder_domain: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            country_code: "91".to_string(),
            placeholder_domain: "@example.com".to_string(),
        }
    }
}

/// Outbound SMTP configuration.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl Config {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workbook_dir = lookup("VOLUNTEER_MATCH_WORKBOOK")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKBOOK_DIR));

        let oracle = OracleConfig {
            api_key: lookup("GEMINI_API_KEY")
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_secs(parse_or(&lookup, "GEMINI_TIMEOUT_SECS", 60)?),
        };

        let defaults = RunConfig::default();
        let run = RunConfig {
            delay: Duration::from_secs(parse_or(&lookup, "VOLUNTEER_MATCH_DELAY_SECS", 10)?),
            country_code: lookup("VOLUNTEER_MATCH_COUNTRY_CODE").unwrap_or(defaults.country_code),
            placeholder_domain: lookup("VOLUNTEER_MATCH_PLACEHOLDER_DOMAIN")
                .unwrap_or(defaults.placeholder_domain),
        };

        let smtp = match lookup("SMTP_HOST").filter(|h| !h.trim().is_empty()) {
            Some(host) => {
                let username = lookup("SMTP_USERNAME").unwrap_or_default();
                let from_address = lookup("SMTP_FROM_ADDRESS").unwrap_or_else(|| username.clone());
                if from_address.is_empty() {
                    return Err(ConfigError::MissingRequired {
                        key: "SMTP_FROM_ADDRESS".to_string(),
                        hint: "Set SMTP_FROM_ADDRESS or SMTP_USERNAME when SMTP_HOST is set."
                            .to_string(),
                    });
                }
                Some(SmtpConfig {
                    host,
                    port: parse_or(&lookup, "SMTP_PORT", 587)?,
                    username,
                    password: SecretString::from(lookup("SMTP_PASSWORD").unwrap_or_default()),
                    from_address,
                })
            }
            None => None,
        };

        Ok(Self {
            workbook_dir,
            oracle,
            run,
            smtp,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}
