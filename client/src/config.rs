//! YAML client configuration.

use crate::{
    client::{
        ChunkingConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_CHUNKS, DEFAULT_MAX_QUERY_PAYMENT,
        DEFAULT_MAX_TRANSACTION_SIZE,
    },
    execute::{
        ExecutionConfig, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT,
    },
    health::{MAX_BACKOFF, MIN_BACKOFF},
};
use commonware_codec::DecodeExt;
use commonware_cryptography::ed25519::PrivateKey;
use commonware_utils::{from_hex_formatted, hex};
use meridian_types::{AccountId, LedgerId};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::Level;
use url::Url;

#[derive(Clone, PartialEq, Eq)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    pub fn from_hex_formatted(value: &str) -> Option<Self> {
        from_hex_formatted(value).map(Self)
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for HexBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex(self.as_ref()))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let bytes = from_hex_formatted(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a hex string"))?;
        Ok(Self(bytes))
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    pub account_id: String,
    pub address: String,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct OperatorConfig {
    pub account_id: String,
    pub private_key: HexBytes,
}

/// Configuration for a [crate::Client].
#[derive(Deserialize, Serialize)]
pub struct Config {
    pub ledger: String,
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub operator: Option<OperatorConfig>,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Omit (or set to null) to let calls run until their attempts run out.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: Option<u64>,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    #[serde(default)]
    pub regenerate_transaction_id: bool,

    #[serde(default)]
    pub default_max_transaction_fee: Option<u64>,
    #[serde(default = "default_max_query_payment")]
    pub max_query_payment: u64,
    #[serde(default = "default_max_transaction_size")]
    pub max_transaction_size: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    #[serde(default = "default_auto_validate_checksums")]
    pub auto_validate_checksums: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{field} is invalid: {value}")]
    InvalidDecode {
        field: &'static str,
        value: String,
        #[source]
        source: commonware_codec::Error,
    },
    #[error("invalid ledger: {value}")]
    InvalidLedger { value: String },
    #[error("{field} must be an entity id (shard.realm.num): {value}")]
    InvalidId { field: &'static str, value: String },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("min_backoff_ms ({min}) must not exceed max_backoff_ms ({max})")]
    InvalidBackoff { min: u64, max: u64 },
    #[error("{field} must be a valid URL: {value}")]
    InvalidUrl { field: &'static str, value: String },
    #[error("{field} URL scheme must be http or https: {value}")]
    InvalidUrlScheme { field: &'static str, value: String },
    #[error("at least one node is required")]
    NoNodes,
}

pub struct ValidatedConfig {
    pub ledger: LedgerId,
    pub nodes: Vec<(AccountId, Url)>,
    pub operator: Option<(AccountId, PrivateKey)>,
    pub log_level: Level,
    pub execution: ExecutionConfig,
    pub chunking: ChunkingConfig,
    pub default_max_transaction_fee: Option<u64>,
    pub max_query_payment: u64,
    pub auto_validate_checksums: bool,
}

struct RedactedConfig<'a>(&'a Config);

impl fmt::Debug for RedactedConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = self.0;
        let nodes: Vec<_> = cfg
            .nodes
            .iter()
            .map(|node| format!("{}@{}", node.account_id, node.address))
            .collect();
        f.debug_struct("Config")
            .field("ledger", &cfg.ledger)
            .field("nodes", &nodes)
            .field(
                "operator",
                &cfg.operator.as_ref().map(|operator| &operator.account_id),
            )
            .field("private_key", &"<redacted>")
            .field("log_level", &cfg.log_level)
            .field("max_attempts", &cfg.max_attempts)
            .field("min_backoff_ms", &cfg.min_backoff_ms)
            .field("max_backoff_ms", &cfg.max_backoff_ms)
            .field("request_timeout_ms", &cfg.request_timeout_ms)
            .field("attempt_timeout_ms", &cfg.attempt_timeout_ms)
            .field("regenerate_transaction_id", &cfg.regenerate_transaction_id)
            .field(
                "default_max_transaction_fee",
                &cfg.default_max_transaction_fee,
            )
            .field("max_query_payment", &cfg.max_query_payment)
            .field("max_transaction_size", &cfg.max_transaction_size)
            .field("chunk_size", &cfg.chunk_size)
            .field("max_chunks", &cfg.max_chunks)
            .field("auto_validate_checksums", &cfg.auto_validate_checksums)
            .finish()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_attempts() -> usize {
    DEFAULT_MAX_ATTEMPTS
}

fn default_min_backoff_ms() -> u64 {
    MIN_BACKOFF.as_millis() as u64
}

fn default_max_backoff_ms() -> u64 {
    MAX_BACKOFF.as_millis() as u64
}

fn default_request_timeout_ms() -> Option<u64> {
    Some(DEFAULT_REQUEST_TIMEOUT.as_millis() as u64)
}

fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64
}

fn default_max_query_payment() -> u64 {
    DEFAULT_MAX_QUERY_PAYMENT
}

fn default_max_transaction_size() -> usize {
    DEFAULT_MAX_TRANSACTION_SIZE
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_chunks() -> usize {
    DEFAULT_MAX_CHUNKS
}

fn default_auto_validate_checksums() -> bool {
    true
}

fn redact_value(field: &'static str, value: String) -> String {
    match field {
        "private_key" => "<redacted>".to_string(),
        _ => value,
    }
}

fn decode_bytes<T: DecodeExt<()>>(field: &'static str, value: &HexBytes) -> Result<T, ConfigError> {
    T::decode(value.as_ref()).map_err(|source| ConfigError::InvalidDecode {
        field,
        value: redact_value(field, hex(value.as_ref())),
        source,
    })
}

fn ensure_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(())
}

fn parse_account(field: &'static str, value: &str) -> Result<AccountId, ConfigError> {
    AccountId::from_str(value).map_err(|_| ConfigError::InvalidId {
        field,
        value: value.to_string(),
    })
}

fn validate_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(ConfigError::InvalidUrlScheme {
                field,
                value: value.to_string(),
            })
        }
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        });
    }
    Ok(url)
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn redacted_debug(&self) -> impl fmt::Debug + '_ {
        RedactedConfig(self)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let ledger = LedgerId::from_str(&self.ledger).map_err(|_| ConfigError::InvalidLedger {
            value: self.ledger.clone(),
        })?;
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                Ok((
                    parse_account("nodes.account_id", &node.account_id)?,
                    validate_http_url("nodes.address", &node.address)?,
                ))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        let operator = self
            .operator
            .as_ref()
            .map(|operator| {
                Ok::<_, ConfigError>((
                    parse_account("operator.account_id", &operator.account_id)?,
                    decode_bytes::<PrivateKey>("private_key", &operator.private_key)?,
                ))
            })
            .transpose()?;
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        ensure_nonzero("max_attempts", self.max_attempts as u64)?;
        ensure_nonzero("min_backoff_ms", self.min_backoff_ms)?;
        ensure_nonzero("attempt_timeout_ms", self.attempt_timeout_ms)?;
        if let Some(timeout) = self.request_timeout_ms {
            ensure_nonzero("request_timeout_ms", timeout)?;
        }
        ensure_nonzero("max_transaction_size", self.max_transaction_size as u64)?;
        ensure_nonzero("chunk_size", self.chunk_size as u64)?;
        ensure_nonzero("max_chunks", self.max_chunks as u64)?;
        if self.min_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff {
                min: self.min_backoff_ms,
                max: self.max_backoff_ms,
            });
        }

        let execution = ExecutionConfig::new(
            self.max_attempts,
            Duration::from_millis(self.min_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
        .map_err(|_| ConfigError::InvalidBackoff {
            min: self.min_backoff_ms,
            max: self.max_backoff_ms,
        })?
        .with_request_timeout(self.request_timeout_ms.map(Duration::from_millis))
        .with_attempt_timeout(Duration::from_millis(self.attempt_timeout_ms))
        .with_regenerate_transaction_id(self.regenerate_transaction_id);
        let chunking =
            ChunkingConfig::new(self.max_transaction_size, self.chunk_size, self.max_chunks)
                .map_err(|_| ConfigError::InvalidNonZero {
                    field: "chunking",
                    value: 0,
                })?;

        Ok(ValidatedConfig {
            ledger,
            nodes,
            operator,
            log_level,
            execution,
            chunking,
            default_max_transaction_fee: self.default_max_transaction_fee,
            max_query_payment: self.max_query_payment,
            auto_validate_checksums: self.auto_validate_checksums,
        })
    }
}
