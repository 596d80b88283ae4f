//! Runtime configuration.
//!
//! # Responsibility
//! - Hold tunables for the task store (stride, batch limit, delete retry).
//! - Load collaborator settings (generator endpoint, contact addresses) from
//!   the environment.
//!
//! # Invariants
//! - Store defaults match the documented constants: stride 1000, 25 keys per
//!   batch, 5 delete attempts from 50 ms doubling.
//! - Loading never panics; missing or malformed values are `ConfigError`s.

use crate::ordering::ORDER_STRIDE;
use crate::repo::kv_backend::BATCH_WRITE_LIMIT;
use crate::retry::RetryPolicy;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const ENV_GENERATOR_URL: &str = "GOALSTORE_GENERATOR_URL";
pub const ENV_GENERATOR_API_KEY: &str = "GOALSTORE_GENERATOR_API_KEY";
pub const ENV_GENERATOR_API_KEY_FALLBACK: &str = "HF_API_KEY";
pub const ENV_GENERATOR_MODEL: &str = "GOALSTORE_GENERATOR_MODEL";
pub const ENV_GENERATOR_TIMEOUT_SECS: &str = "GOALSTORE_GENERATOR_TIMEOUT_SECS";
pub const ENV_CONTACT_SENDER: &str = "GOALSTORE_CONTACT_SENDER";
pub const ENV_CONTACT_RECIPIENT: &str = "GOALSTORE_CONTACT_RECIPIENT";

const DEFAULT_GENERATOR_URL: &str = "https://router.huggingface.co/v1";
const DEFAULT_GENERATOR_MODEL: &str = "meta-llama/Llama-3.1-8B-Instruct";
const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "missing configuration `{name}`"),
            Self::Invalid { name, value } => {
                write!(f, "invalid configuration `{name}`: `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Task store tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreConfig {
    pub order_stride: f64,
    pub batch_delete_limit: usize,
    pub delete_retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            order_stride: ORDER_STRIDE,
            batch_delete_limit: BATCH_WRITE_LIMIT,
            delete_retry: RetryPolicy::batch_delete(),
        }
    }
}

/// Text generation endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeneratorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_blank = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = non_blank(ENV_GENERATOR_API_KEY)
            .or_else(|| non_blank(ENV_GENERATOR_API_KEY_FALLBACK))
            .ok_or(ConfigError::Missing(ENV_GENERATOR_API_KEY))?;
        let timeout = match non_blank(ENV_GENERATOR_TIMEOUT_SECS) {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().ok().filter(|secs| *secs > 0);
                match secs {
                    Some(secs) => Duration::from_secs(secs),
                    None => {
                        return Err(ConfigError::Invalid {
                            name: ENV_GENERATOR_TIMEOUT_SECS,
                            value: raw,
                        })
                    }
                }
            }
            None => DEFAULT_GENERATOR_TIMEOUT,
        };

        Ok(Self {
            base_url: non_blank(ENV_GENERATOR_URL)
                .unwrap_or_else(|| DEFAULT_GENERATOR_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: non_blank(ENV_GENERATOR_MODEL)
                .unwrap_or_else(|| DEFAULT_GENERATOR_MODEL.to_string()),
            timeout,
        })
    }
}

/// Addresses used by the contact form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactConfig {
    pub sender: String,
    pub recipient: String,
}

impl ContactConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        Ok(Self {
            sender: required(ENV_CONTACT_SENDER)?,
            recipient: required(ENV_CONTACT_RECIPIENT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, ContactConfig, GeneratorConfig, StoreConfig, ENV_GENERATOR_API_KEY,
        ENV_GENERATOR_API_KEY_FALLBACK, ENV_GENERATOR_TIMEOUT_SECS, ENV_GENERATOR_URL,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn store_defaults_match_documented_constants() {
        let config = StoreConfig::default();
        assert_eq!(config.order_stride, 1000.0);
        assert_eq!(config.batch_delete_limit, 25);
        assert_eq!(config.delete_retry.max_attempts, 5);
        assert_eq!(config.delete_retry.base_delay, Duration::from_millis(50));
    }

    #[test]
    fn generator_config_falls_back_to_hf_key_and_defaults() {
        let env = vars(&[(ENV_GENERATOR_API_KEY_FALLBACK, "hf-secret")]);
        let config = GeneratorConfig::from_lookup(|name| env.get(name).cloned()).unwrap();
        assert_eq!(config.api_key, "hf-secret");
        assert_eq!(config.base_url, "https://router.huggingface.co/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn generator_config_requires_key_and_valid_timeout() {
        let empty = vars(&[]);
        assert_eq!(
            GeneratorConfig::from_lookup(|name| empty.get(name).cloned()).unwrap_err(),
            ConfigError::Missing(ENV_GENERATOR_API_KEY)
        );

        let env = vars(&[
            (ENV_GENERATOR_API_KEY, "k"),
            (ENV_GENERATOR_TIMEOUT_SECS, "soon"),
            (ENV_GENERATOR_URL, "http://localhost:8080/v1/"),
        ]);
        let err = GeneratorConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn contact_config_requires_both_addresses() {
        let env = vars(&[("GOALSTORE_CONTACT_SENDER", "noreply@example.com")]);
        let err = ContactConfig::from_lookup(|name| env.get(name).cloned()).unwrap_err();
        assert_eq!(err, ConfigError::Missing("GOALSTORE_CONTACT_RECIPIENT"));
    }
}
