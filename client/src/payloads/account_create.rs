use crate::{
    payload::{single_chunk, wrong_kind, ChunkContext, Payload},
    transaction::Transaction,
    transport::{Method, Service},
    Result,
};
use commonware_cryptography::ed25519;
use meridian_types::{ChecksumError, LedgerId, TransactionData, TransactionKind};

pub type AccountCreateTransaction = Transaction<AccountCreate>;

/// Create an account controlled by `key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountCreate {
    pub key: ed25519::PublicKey,
    pub initial_balance: u64,
    pub memo: String,
}

impl AccountCreate {
    pub const DEFAULT_MAX_FEE: u64 = 500_000_000;

    pub fn new(key: ed25519::PublicKey) -> Self {
        Self {
            key,
            initial_balance: 0,
            memo: String::new(),
        }
    }

    pub fn with_initial_balance(mut self, initial_balance: u64) -> Self {
        self.initial_balance = initial_balance;
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }
}

impl Payload for AccountCreate {
    const KIND: TransactionKind = TransactionKind::AccountCreate;

    fn default_max_fee(&self) -> u64 {
        Self::DEFAULT_MAX_FEE
    }

    fn method(&self) -> Method {
        Method::new(Service::Crypto, "createAccount")
    }

    fn build_data(&self, _chunk: Option<&ChunkContext<'_>>) -> TransactionData {
        TransactionData::AccountCreate {
            key: self.key.clone(),
            initial_balance: self.initial_balance,
            memo: self.memo.clone(),
        }
    }

    fn validate_checksums(&self, _ledger: &LedgerId) -> std::result::Result<(), ChecksumError> {
        Ok(())
    }

    fn from_chunks(chunks: Vec<TransactionData>) -> Result<Self> {
        match single_chunk(chunks)? {
            TransactionData::AccountCreate {
                key,
                initial_balance,
                memo,
            } => Ok(Self {
                key,
                initial_balance,
                memo,
            }),
            _ => Err(wrong_kind()),
        }
    }
}
