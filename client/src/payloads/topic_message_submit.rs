use crate::{
    payload::{wrong_kind, ChunkContext, Payload},
    transaction::Transaction,
    transport::{Method, Service},
    Error, Result,
};
use meridian_types::{
    ChecksumError, ChunkInfo, LedgerId, TopicId, TransactionData, TransactionKind,
};

pub type TopicMessageSubmitTransaction = Transaction<TopicMessageSubmit>;

/// Publish a message to a topic.
///
/// Messages longer than one chunk are sent as a sequence of chunks, each
/// carrying its position and the id of the first chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicMessageSubmit {
    pub topic_id: TopicId,
    pub message: Vec<u8>,
}

impl TopicMessageSubmit {
    pub const DEFAULT_MAX_FEE: u64 = 200_000_000;

    pub fn new(topic_id: TopicId, message: impl Into<Vec<u8>>) -> Self {
        Self {
            topic_id,
            message: message.into(),
        }
    }
}

impl Payload for TopicMessageSubmit {
    const KIND: TransactionKind = TransactionKind::TopicMessageSubmit;

    fn default_max_fee(&self) -> u64 {
        Self::DEFAULT_MAX_FEE
    }

    fn method(&self) -> Method {
        Method::new(Service::Consensus, "submitMessage")
    }

    fn build_data(&self, chunk: Option<&ChunkContext<'_>>) -> TransactionData {
        let chunk_info = chunk.filter(|chunk| chunk.total > 1).map(|chunk| ChunkInfo {
            initial_transaction_id: chunk.initial_transaction_id,
            number: chunk.index as u32 + 1,
            total: chunk.total as u32,
        });
        TransactionData::TopicMessageSubmit {
            topic_id: self.topic_id,
            message: chunk.map_or(&self.message[..], |chunk| chunk.content).to_vec(),
            chunk_info,
        }
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError> {
        self.topic_id.validate_checksum(ledger)
    }

    fn chunked_content(&self) -> Option<&[u8]> {
        Some(&self.message)
    }

    fn from_chunks(chunks: Vec<TransactionData>) -> Result<Self> {
        let total = chunks.len();
        let mut topic = None;
        let mut message = Vec::new();
        for (index, data) in chunks.into_iter().enumerate() {
            let TransactionData::TopicMessageSubmit {
                topic_id,
                message: chunk,
                chunk_info,
            } = data
            else {
                return Err(wrong_kind());
            };
            let in_place = match chunk_info {
                Some(info) => info.number as usize == index + 1 && info.total as usize == total,
                None => total == 1,
            };
            if !in_place || *topic.get_or_insert(topic_id) != topic_id {
                return Err(Error::InvalidData(commonware_codec::Error::Invalid(
                    "TransactionList",
                    "inconsistent message chunks",
                )));
            }
            message.extend_from_slice(&chunk);
        }
        let topic_id = topic.ok_or_else(wrong_kind)?;
        Ok(Self { topic_id, message })
    }
}
