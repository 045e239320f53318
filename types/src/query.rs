//! Query envelopes and answers.

use crate::{
    codec::{read_string, string_encode_size, write_string},
    id::AccountId,
    receipt::TransactionReceipt,
    status::Status,
    transaction::{SignedTransaction, TransactionId, MAX_MEMO_LENGTH},
};
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use commonware_cryptography::ed25519;

/// Whether the node should answer the query or only quote its cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    AnswerOnly,
    CostAnswer,
}

impl Write for ResponseType {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::AnswerOnly => 0u8.write(writer),
            Self::CostAnswer => 1u8.write(writer),
        }
    }
}

impl Read for ResponseType {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        match u8::read(reader)? {
            0 => Ok(Self::AnswerOnly),
            1 => Ok(Self::CostAnswer),
            tag => Err(Error::InvalidEnum(tag)),
        }
    }
}

impl EncodeSize for ResponseType {
    fn encode_size(&self) -> usize {
        1
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryHeader {
    /// A transfer to the answering node, required by paid queries.
    pub payment: Option<SignedTransaction>,
    pub response_type: ResponseType,
}

impl Write for QueryHeader {
    fn write(&self, writer: &mut impl BufMut) {
        self.payment.write(writer);
        self.response_type.write(writer);
    }
}

impl Read for QueryHeader {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            payment: Option::read(reader)?,
            response_type: ResponseType::read(reader)?,
        })
    }
}

impl EncodeSize for QueryHeader {
    fn encode_size(&self) -> usize {
        self.payment.encode_size() + self.response_type.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryData {
    /// Tag 0
    TransactionReceipt { transaction_id: TransactionId },
    /// Tag 1
    AccountBalance { account_id: AccountId },
    /// Tag 2
    AccountInfo { account_id: AccountId },
}

impl Write for QueryData {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::TransactionReceipt { transaction_id } => {
                0u8.write(writer);
                transaction_id.write(writer);
            }
            Self::AccountBalance { account_id } => {
                1u8.write(writer);
                account_id.write(writer);
            }
            Self::AccountInfo { account_id } => {
                2u8.write(writer);
                account_id.write(writer);
            }
        }
    }
}

impl Read for QueryData {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let data = match u8::read(reader)? {
            0 => Self::TransactionReceipt {
                transaction_id: TransactionId::read(reader)?,
            },
            1 => Self::AccountBalance {
                account_id: AccountId::read(reader)?,
            },
            2 => Self::AccountInfo {
                account_id: AccountId::read(reader)?,
            },
            tag => return Err(Error::InvalidEnum(tag)),
        };
        Ok(data)
    }
}

impl EncodeSize for QueryData {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::TransactionReceipt { transaction_id } => transaction_id.encode_size(),
            Self::AccountBalance { account_id } | Self::AccountInfo { account_id } => {
                account_id.encode_size()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryRequest {
    pub header: QueryHeader,
    pub data: QueryData,
}

impl Write for QueryRequest {
    fn write(&self, writer: &mut impl BufMut) {
        self.header.write(writer);
        self.data.write(writer);
    }
}

impl Read for QueryRequest {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            header: QueryHeader::read(reader)?,
            data: QueryData::read(reader)?,
        })
    }
}

impl EncodeSize for QueryRequest {
    fn encode_size(&self) -> usize {
        self.header.encode_size() + self.data.encode_size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub balance: u64,
}

impl Write for AccountBalance {
    fn write(&self, writer: &mut impl BufMut) {
        self.account_id.write(writer);
        self.balance.write(writer);
    }
}

impl Read for AccountBalance {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            account_id: AccountId::read(reader)?,
            balance: u64::read(reader)?,
        })
    }
}

impl EncodeSize for AccountBalance {
    fn encode_size(&self) -> usize {
        self.account_id.encode_size() + self.balance.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_id: AccountId,
    pub key: ed25519::PublicKey,
    pub balance: u64,
    pub deleted: bool,
    pub memo: String,
}

impl Write for AccountInfo {
    fn write(&self, writer: &mut impl BufMut) {
        self.account_id.write(writer);
        self.key.write(writer);
        self.balance.write(writer);
        self.deleted.write(writer);
        write_string(&self.memo, writer);
    }
}

impl Read for AccountInfo {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            account_id: AccountId::read(reader)?,
            key: ed25519::PublicKey::read(reader)?,
            balance: u64::read(reader)?,
            deleted: bool::read(reader)?,
            memo: read_string(reader, MAX_MEMO_LENGTH)?,
        })
    }
}

impl EncodeSize for AccountInfo {
    fn encode_size(&self) -> usize {
        self.account_id.encode_size()
            + self.key.encode_size()
            + self.balance.encode_size()
            + self.deleted.encode_size()
            + string_encode_size(&self.memo)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryAnswer {
    /// Tag 0
    Receipt(TransactionReceipt),
    /// Tag 1
    Balance(AccountBalance),
    /// Tag 2
    Info(AccountInfo),
}

impl Write for QueryAnswer {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Receipt(receipt) => {
                0u8.write(writer);
                receipt.write(writer);
            }
            Self::Balance(balance) => {
                1u8.write(writer);
                balance.write(writer);
            }
            Self::Info(info) => {
                2u8.write(writer);
                info.write(writer);
            }
        }
    }
}

impl Read for QueryAnswer {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let answer = match u8::read(reader)? {
            0 => Self::Receipt(TransactionReceipt::read(reader)?),
            1 => Self::Balance(AccountBalance::read(reader)?),
            2 => Self::Info(AccountInfo::read(reader)?),
            tag => return Err(Error::InvalidEnum(tag)),
        };
        Ok(answer)
    }
}

impl EncodeSize for QueryAnswer {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Receipt(receipt) => receipt.encode_size(),
            Self::Balance(balance) => balance.encode_size(),
            Self::Info(info) => info.encode_size(),
        }
    }
}

/// A node's reply to a query.
///
/// `answer` is absent when the precheck failed or only the cost was requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResponse {
    pub precheck: Status,
    pub cost: u64,
    pub answer: Option<QueryAnswer>,
}

impl Write for QueryResponse {
    fn write(&self, writer: &mut impl BufMut) {
        self.precheck.write(writer);
        self.cost.write(writer);
        self.answer.write(writer);
    }
}

impl Read for QueryResponse {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            precheck: Status::read(reader)?,
            cost: u64::read(reader)?,
            answer: Option::read(reader)?,
        })
    }
}

impl EncodeSize for QueryResponse {
    fn encode_size(&self) -> usize {
        self.precheck.encode_size() + self.cost.encode_size() + self.answer.encode_size()
    }
}
