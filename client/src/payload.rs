//! The contract every concrete transaction type implements.

use crate::{transport::Method, Error, Result};
use meridian_types::{
    ChecksumError, LedgerId, SchedulableBody, TransactionData, TransactionId, TransactionKind,
};

/// Where a body sits within a chunked transaction.
#[derive(Clone, Copy, Debug)]
pub struct ChunkContext<'a> {
    /// 0-based.
    pub index: usize,
    pub total: usize,
    /// Id of the first chunk.
    pub initial_transaction_id: TransactionId,
    /// This chunk's slice of [Payload::chunked_content].
    pub content: &'a [u8],
}

/// A concrete transaction type.
pub trait Payload: Clone + Send + Sync + 'static {
    /// Discriminator written into bodies and interchange lists.
    const KIND: TransactionKind;

    /// Fee used when neither the transaction nor the client sets one.
    fn default_max_fee(&self) -> u64;

    fn method(&self) -> Method;

    /// Build the payload-specific part of a body.
    ///
    /// `chunk` is only provided to payloads that return content from
    /// [Payload::chunked_content].
    fn build_data(&self, chunk: Option<&ChunkContext<'_>>) -> TransactionData;

    /// Build the data executed when this payload is wrapped in a schedule.
    fn build_schedulable(&self) -> Result<TransactionData> {
        Ok(self.build_data(None))
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError>;

    /// Content to split across chunks, for payloads that may be chunked.
    fn chunked_content(&self) -> Option<&[u8]> {
        None
    }

    /// Rebuild the payload from the data of every chunk, in order.
    fn from_chunks(chunks: Vec<TransactionData>) -> Result<Self>;
}

/// Wrap the data of `payload` into a schedulable body.
pub(crate) fn schedulable_body<D: Payload>(
    payload: &D,
    max_fee: u64,
    memo: String,
) -> Result<SchedulableBody> {
    Ok(SchedulableBody {
        max_fee,
        memo,
        data: Box::new(payload.build_schedulable()?),
    })
}

/// Extract the single data entry of a payload that is never chunked.
pub(crate) fn single_chunk(mut chunks: Vec<TransactionData>) -> Result<TransactionData> {
    match (chunks.pop(), chunks.is_empty()) {
        (Some(data), true) => Ok(data),
        _ => Err(Error::InvalidData(commonware_codec::Error::Invalid(
            "TransactionList",
            "expected a single chunk",
        ))),
    }
}

/// Error for chunk data whose variant does not match the payload type.
pub(crate) fn wrong_kind() -> Error {
    Error::InvalidData(commonware_codec::Error::Invalid(
        "TransactionList",
        "body does not match transaction kind",
    ))
}
