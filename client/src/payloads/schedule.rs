use crate::{
    payload::{single_chunk, wrong_kind, ChunkContext, Payload},
    transaction::Transaction,
    transport::{Method, Service},
    Error, Result,
};
use meridian_types::{
    AccountId, ChecksumError, LedgerId, SchedulableBody, ScheduleId, TransactionData,
    TransactionKind,
};

pub type ScheduleCreateTransaction = Transaction<ScheduleCreate>;
pub type ScheduleSignTransaction = Transaction<ScheduleSign>;

/// Ask the network to run `scheduled` once enough keys have signed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleCreate {
    pub scheduled: SchedulableBody,
    /// Account paying for the scheduled transaction (defaults to the payer of
    /// the schedule itself).
    pub payer: Option<AccountId>,
    pub memo: String,
}

impl ScheduleCreate {
    pub const DEFAULT_MAX_FEE: u64 = 500_000_000;

    pub fn new(scheduled: SchedulableBody) -> Self {
        Self {
            scheduled,
            payer: None,
            memo: String::new(),
        }
    }

    pub fn with_payer(mut self, payer: AccountId) -> Self {
        self.payer = Some(payer);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }
}

impl Payload for ScheduleCreate {
    const KIND: TransactionKind = TransactionKind::ScheduleCreate;

    fn default_max_fee(&self) -> u64 {
        Self::DEFAULT_MAX_FEE
    }

    fn method(&self) -> Method {
        Method::new(Service::Schedule, "createSchedule")
    }

    fn build_data(&self, _chunk: Option<&ChunkContext<'_>>) -> TransactionData {
        TransactionData::ScheduleCreate {
            scheduled: self.scheduled.clone(),
            payer: self.payer,
            memo: self.memo.clone(),
        }
    }

    fn build_schedulable(&self) -> Result<TransactionData> {
        Err(Error::NotSchedulable(Self::KIND))
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError> {
        self.build_data(None).validate_checksums(ledger)
    }

    fn from_chunks(chunks: Vec<TransactionData>) -> Result<Self> {
        match single_chunk(chunks)? {
            TransactionData::ScheduleCreate {
                scheduled,
                payer,
                memo,
            } => Ok(Self {
                scheduled,
                payer,
                memo,
            }),
            _ => Err(wrong_kind()),
        }
    }
}

/// Add the signatures of this transaction to an existing schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleSign {
    pub schedule_id: ScheduleId,
}

impl ScheduleSign {
    pub const DEFAULT_MAX_FEE: u64 = 500_000_000;

    pub fn new(schedule_id: ScheduleId) -> Self {
        Self { schedule_id }
    }
}

impl Payload for ScheduleSign {
    const KIND: TransactionKind = TransactionKind::ScheduleSign;

    fn default_max_fee(&self) -> u64 {
        Self::DEFAULT_MAX_FEE
    }

    fn method(&self) -> Method {
        Method::new(Service::Schedule, "signSchedule")
    }

    fn build_data(&self, _chunk: Option<&ChunkContext<'_>>) -> TransactionData {
        TransactionData::ScheduleSign {
            schedule_id: self.schedule_id,
        }
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError> {
        self.schedule_id.validate_checksum(ledger)
    }

    fn from_chunks(chunks: Vec<TransactionData>) -> Result<Self> {
        match single_chunk(chunks)? {
            TransactionData::ScheduleSign { schedule_id } => Ok(Self { schedule_id }),
            _ => Err(wrong_kind()),
        }
    }
}
