//! Wire model of the meridian ledger protocol.
//!
//! Everything here is encoded with `commonware-codec` and is shared by the
//! client and by anything that needs to inspect frozen transactions.

pub mod checksum;
pub mod codec;
pub mod id;
pub mod query;
pub mod receipt;
pub mod status;
pub mod transaction;

pub use checksum::{ChecksumError, LedgerId};
pub use id::{AccountId, EntityId, FileId, IdError, ScheduleId, TopicId};
pub use query::{
    AccountBalance, AccountInfo, QueryAnswer, QueryData, QueryHeader, QueryRequest,
    QueryResponse, ResponseType,
};
pub use receipt::TransactionReceipt;
pub use status::Status;
pub use transaction::{
    transaction_namespace, AccountAmount, ChunkInfo, SchedulableBody, SignaturePair,
    SignedTransaction, SubmitResponse, Timestamp, TransactionBody, TransactionData,
    TransactionId, TransactionKind, TransactionList, NAMESPACE,
};
