use crate::{
    id::{AccountId, FileId, ScheduleId, TopicId},
    status::Status,
    transaction::TransactionId,
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};

/// The settled outcome of a transaction.
///
/// Entity fields are only populated by the transaction kinds that create them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub status: Status,
    pub account_id: Option<AccountId>,
    pub file_id: Option<FileId>,
    pub topic_id: Option<TopicId>,
    pub schedule_id: Option<ScheduleId>,
    pub topic_sequence_number: u64,
    pub scheduled_transaction_id: Option<TransactionId>,
}

impl TransactionReceipt {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            account_id: None,
            file_id: None,
            topic_id: None,
            schedule_id: None,
            topic_sequence_number: 0,
            scheduled_transaction_id: None,
        }
    }

    /// Whether the network has not decided the outcome yet.
    pub fn is_pending(&self) -> bool {
        matches!(
            self.status,
            Status::Unknown | Status::Busy | Status::ReceiptNotFound | Status::Ok
        )
    }
}

impl Write for TransactionReceipt {
    fn write(&self, writer: &mut impl BufMut) {
        self.status.write(writer);
        self.account_id.write(writer);
        self.file_id.write(writer);
        self.topic_id.write(writer);
        self.schedule_id.write(writer);
        self.topic_sequence_number.write(writer);
        self.scheduled_transaction_id.write(writer);
    }
}

impl Read for TransactionReceipt {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            status: Status::read(reader)?,
            account_id: Option::read(reader)?,
            file_id: Option::read(reader)?,
            topic_id: Option::read(reader)?,
            schedule_id: Option::read(reader)?,
            topic_sequence_number: u64::read(reader)?,
            scheduled_transaction_id: Option::read(reader)?,
        })
    }
}

impl EncodeSize for TransactionReceipt {
    fn encode_size(&self) -> usize {
        self.status.encode_size()
            + self.account_id.encode_size()
            + self.file_id.encode_size()
            + self.topic_id.encode_size()
            + self.schedule_id.encode_size()
            + self.topic_sequence_number.encode_size()
            + self.scheduled_transaction_id.encode_size()
    }
}
