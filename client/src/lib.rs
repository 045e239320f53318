//! Execution engine for submitting transactions to, and querying, a meridian
//! ledger network.
//!
//! Every request runs through the same retry loop ([execute]) against a
//! rotating set of nodes. Per-node health is tracked by [health::NodeHealth] so
//! that a node that recently failed is skipped until its delay has elapsed.

pub mod any;
pub mod client;
pub mod config;
pub mod execute;
pub mod health;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod network;
pub mod payload;
pub mod payloads;
pub mod query;
pub mod receipt;
pub mod transaction;
pub mod transport;

pub use any::AnyTransaction;
pub use client::{ChunkingConfig, Client, Operator};
pub use execute::ExecutionConfig;
pub use query::Query;
pub use receipt::TransactionResponse;
pub use transaction::{Transaction, TransactionSigner};

use commonware_cryptography::ed25519::PublicKey;
use commonware_utils::hex;
use meridian_types::{AccountId, ChecksumError, Status, TransactionId, TransactionKind};
use std::time::Duration;
use thiserror::Error;
use transport::TransportError;

/// Misconfiguration detected before anything is sent. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("max_attempts must be > 0")]
    ZeroAttempts,
    #[error("min backoff {min:?} must not exceed max backoff {max:?}")]
    BackoffRange { min: Duration, max: Duration },
    #[error("{field} must be > 0")]
    ZeroLimit { field: &'static str },
    #[error("node {0} is not part of the network")]
    UnknownNode(AccountId),
    #[error("no nodes to send to")]
    NoNodes,
    #[error("no operator configured")]
    NoOperator,
    #[error("no signer available for key {}", hex_key(.0))]
    SignerUnavailable(PublicKey),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("transaction is already frozen")]
    AlreadyFrozen,
    #[error("transaction is not frozen")]
    NotFrozen,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("transaction is sealed")]
    Sealed,
    #[error("{0}")]
    ChecksumMismatch(#[from] ChecksumError),
    #[error("precheck failed for {} at node {node}: {status}", describe(.transaction_id))]
    PrecheckRejected {
        status: Status,
        transaction_id: Option<TransactionId>,
        node: AccountId,
    },
    #[error(
        "gave up on {} after {attempts} attempts (last status: {})",
        describe(.transaction_id),
        describe_status(.last)
    )]
    Timeout {
        attempts: usize,
        last: Option<Status>,
        transaction_id: Option<TransactionId>,
    },
    #[error("deadline exceeded for {}", describe(.transaction_id))]
    DeadlineExceeded { transaction_id: Option<TransactionId> },
    #[error("{transaction_id} was throttled at consensus twice")]
    ReceiptThrottled { transaction_id: TransactionId },
    #[error("{transaction_id} failed with status {status}")]
    ReceiptStatus {
        status: Status,
        transaction_id: TransactionId,
    },
    #[error("{} transactions cannot be scheduled", kind_name(.0))]
    NotSchedulable(TransactionKind),
    #[error("transaction body is {size} bytes (max {max})")]
    TransactionOversize { size: usize, max: usize },
    #[error("content needs {required} chunks (max {max})")]
    MaxChunksExceeded { required: usize, max: usize },
    #[error("query cost {cost} exceeds max payment {max}")]
    MaxQueryPaymentExceeded { cost: u64, max: u64 },
    #[error("invalid signature")]
    InvalidSignature,
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("request for {} failed at node {node}: {source}", describe(.transaction_id))]
    RequestFailed {
        #[source]
        source: TransportError,
        transaction_id: Option<TransactionId>,
        node: AccountId,
    },
    #[error("invalid data: {0}")]
    InvalidData(#[from] commonware_codec::Error),
    #[error("node {node} answered {} with an undecodable reply: {source}", describe(.transaction_id))]
    InvalidResponse {
        #[source]
        source: commonware_codec::Error,
        transaction_id: Option<TransactionId>,
        node: AccountId,
    },
    #[error("unexpected response")]
    UnexpectedResponse,
}

impl Error {
    /// The transaction this error is about, where one exists.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Self::PrecheckRejected { transaction_id, .. }
            | Self::Timeout { transaction_id, .. }
            | Self::DeadlineExceeded { transaction_id }
            | Self::RequestFailed { transaction_id, .. }
            | Self::InvalidResponse { transaction_id, .. } => *transaction_id,
            Self::ReceiptThrottled { transaction_id }
            | Self::ReceiptStatus { transaction_id, .. } => Some(*transaction_id),
            _ => None,
        }
    }

    /// The network rejected (or never settled) the request, as opposed to a
    /// local misuse of the API.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::PrecheckRejected { .. }
                | Self::Timeout { .. }
                | Self::DeadlineExceeded { .. }
                | Self::ReceiptThrottled { .. }
                | Self::ReceiptStatus { .. }
                | Self::Transport(_)
                | Self::RequestFailed { .. }
                | Self::InvalidResponse { .. }
        )
    }
}

fn describe(transaction_id: &Option<TransactionId>) -> String {
    transaction_id.map_or_else(|| "request".to_string(), |id| id.to_string())
}

fn describe_status(status: &Option<Status>) -> String {
    status.map_or_else(|| "none".to_string(), |status| status.to_string())
}

fn hex_key(key: &PublicKey) -> String {
    hex(key.as_ref())
}

fn kind_name(kind: &TransactionKind) -> &'static str {
    kind.name()
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
