use crate::{
    payload::{single_chunk, wrong_kind, ChunkContext, Payload},
    transaction::Transaction,
    transport::{Method, Service},
    Result,
};
use meridian_types::{
    AccountAmount, AccountId, ChecksumError, LedgerId, TransactionData, TransactionKind,
};

pub type TransferTransaction = Transaction<Transfer>;

/// Move value between accounts. Amounts should sum to zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transfer {
    transfers: Vec<AccountAmount>,
}

impl Transfer {
    pub const DEFAULT_MAX_FEE: u64 = 100_000_000;

    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the balance change of `account_id`.
    ///
    /// Repeated accounts are merged into one entry.
    pub fn add_transfer(mut self, account_id: AccountId, amount: i64) -> Self {
        match self
            .transfers
            .iter_mut()
            .find(|transfer| transfer.account_id == account_id)
        {
            Some(transfer) => transfer.amount = transfer.amount.saturating_add(amount),
            None => self.transfers.push(AccountAmount { account_id, amount }),
        }
        self
    }

    pub fn transfers(&self) -> &[AccountAmount] {
        &self.transfers
    }
}

impl Payload for Transfer {
    const KIND: TransactionKind = TransactionKind::Transfer;

    fn default_max_fee(&self) -> u64 {
        Self::DEFAULT_MAX_FEE
    }

    fn method(&self) -> Method {
        Method::new(Service::Crypto, "cryptoTransfer")
    }

    fn build_data(&self, _chunk: Option<&ChunkContext<'_>>) -> TransactionData {
        TransactionData::Transfer {
            transfers: self.transfers.clone(),
        }
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError> {
        self.transfers
            .iter()
            .try_for_each(|transfer| transfer.account_id.validate_checksum(ledger))
    }

    fn from_chunks(chunks: Vec<TransactionData>) -> Result<Self> {
        match single_chunk(chunks)? {
            TransactionData::Transfer { transfers } => Ok(Self { transfers }),
            _ => Err(wrong_kind()),
        }
    }
}
