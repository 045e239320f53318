//! A transaction of any kind, recovered from its serialized form.

use crate::{
    client::Client,
    payloads::{
        AccountCreate, FileAppend, ScheduleCreate, ScheduleSign, TopicMessageSubmit, Transfer,
    },
    receipt::TransactionResponse,
    transaction::{Transaction, TransactionSigner},
    Result,
};
use commonware_codec::DecodeExt;
use commonware_cryptography::ed25519;
use meridian_types::{TransactionId, TransactionKind, TransactionList};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub enum AnyTransaction {
    Transfer(Transaction<Transfer>),
    AccountCreate(Transaction<AccountCreate>),
    FileAppend(Transaction<FileAppend>),
    TopicMessageSubmit(Transaction<TopicMessageSubmit>),
    ScheduleCreate(Transaction<ScheduleCreate>),
    ScheduleSign(Transaction<ScheduleSign>),
}

macro_rules! dispatch {
    ($self:expr, $transaction:ident => $body:expr) => {
        match $self {
            AnyTransaction::Transfer($transaction) => $body,
            AnyTransaction::AccountCreate($transaction) => $body,
            AnyTransaction::FileAppend($transaction) => $body,
            AnyTransaction::TopicMessageSubmit($transaction) => $body,
            AnyTransaction::ScheduleCreate($transaction) => $body,
            AnyTransaction::ScheduleSign($transaction) => $body,
        }
    };
}

impl AnyTransaction {
    /// Decode a serialized transaction list, dispatching on its kind.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let list = TransactionList::decode(bytes)?;
        Ok(match list.kind {
            TransactionKind::Transfer => Self::Transfer(Transaction::from_list(list)?),
            TransactionKind::AccountCreate => Self::AccountCreate(Transaction::from_list(list)?),
            TransactionKind::FileAppend => Self::FileAppend(Transaction::from_list(list)?),
            TransactionKind::TopicMessageSubmit => {
                Self::TopicMessageSubmit(Transaction::from_list(list)?)
            }
            TransactionKind::ScheduleCreate => Self::ScheduleCreate(Transaction::from_list(list)?),
            TransactionKind::ScheduleSign => Self::ScheduleSign(Transaction::from_list(list)?),
        })
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Transfer(_) => TransactionKind::Transfer,
            Self::AccountCreate(_) => TransactionKind::AccountCreate,
            Self::FileAppend(_) => TransactionKind::FileAppend,
            Self::TopicMessageSubmit(_) => TransactionKind::TopicMessageSubmit,
            Self::ScheduleCreate(_) => TransactionKind::ScheduleCreate,
            Self::ScheduleSign(_) => TransactionKind::ScheduleSign,
        }
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        dispatch!(self, transaction => transaction.transaction_id())
    }

    pub fn chunk_count(&self) -> usize {
        dispatch!(self, transaction => transaction.chunk_count())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        dispatch!(self, transaction => transaction.to_bytes())
    }

    pub fn sign(&mut self, key: ed25519::PrivateKey) -> Result<&mut Self> {
        self.sign_with(Arc::new(key))
    }

    pub fn sign_with(&mut self, signer: Arc<dyn TransactionSigner>) -> Result<&mut Self> {
        dispatch!(&mut *self, transaction => { transaction.sign_with(signer)?; });
        Ok(self)
    }

    pub fn seal(&mut self) -> Result<&mut Self> {
        dispatch!(&mut *self, transaction => { transaction.seal()?; });
        Ok(self)
    }

    pub async fn execute(&mut self, client: &Client) -> Result<TransactionResponse> {
        dispatch!(self, transaction => transaction.execute(client).await)
    }

    pub async fn execute_all(&mut self, client: &Client) -> Result<Vec<TransactionResponse>> {
        dispatch!(self, transaction => transaction.execute_all(client).await)
    }
}

macro_rules! impl_from {
    ($($variant:ident),*) => {
        $(
            impl From<Transaction<$variant>> for AnyTransaction {
                fn from(transaction: Transaction<$variant>) -> Self {
                    Self::$variant(transaction)
                }
            }
        )*
    };
}

impl_from!(
    Transfer,
    AccountCreate,
    FileAppend,
    TopicMessageSubmit,
    ScheduleCreate,
    ScheduleSign
);
