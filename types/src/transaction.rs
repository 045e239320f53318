//! Transaction ids, bodies and signed envelopes.

use crate::{
    checksum::{ChecksumError, LedgerId},
    codec::{read_string, string_encode_size, write_string},
    id::{AccountId, FileId, ScheduleId, TopicId},
    status::Status,
};
use bytes::{Buf, BufMut};
use commonware_codec::{
    DecodeExt, Encode, EncodeSize, Error, RangeCfg, Read, ReadExt, ReadRangeExt, Write,
};
use commonware_cryptography::{
    ed25519,
    sha256::{Digest, Sha256},
    Hasher, Signer, Verifier,
};
use commonware_utils::union;
use rand::Rng;
use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

pub const NAMESPACE: &[u8] = b"_MERIDIAN";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";

pub const MAX_MEMO_LENGTH: usize = 100;
pub const MAX_TRANSFERS: usize = 64;
pub const MAX_SIGNATURES: usize = 64;
pub const MAX_CONTENT_LENGTH: usize = 1024 * 1024;
pub const MAX_BODY_LENGTH: usize = MAX_CONTENT_LENGTH + 4096;
pub const MAX_CHUNKS: usize = 1024;
pub const MAX_NODES: usize = 256;

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

/// Seconds and nanoseconds since the unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub seconds: u64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(Self::from)
            .unwrap_or_default()
    }

    pub fn saturating_sub(&self, duration: Duration) -> Self {
        Duration::from(*self)
            .checked_sub(duration)
            .map(Self::from)
            .unwrap_or_default()
    }
}

impl From<Duration> for Timestamp {
    fn from(duration: Duration) -> Self {
        Self {
            seconds: duration.as_secs(),
            nanos: duration.subsec_nanos(),
        }
    }
}

impl From<Timestamp> for Duration {
    fn from(timestamp: Timestamp) -> Self {
        Duration::new(timestamp.seconds, timestamp.nanos)
    }
}

impl Write for Timestamp {
    fn write(&self, writer: &mut impl BufMut) {
        self.seconds.write(writer);
        self.nanos.write(writer);
    }
}

impl Read for Timestamp {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let seconds = u64::read(reader)?;
        let nanos = u32::read(reader)?;
        if nanos >= 1_000_000_000 {
            return Err(Error::Invalid("Timestamp", "nanos out of range"));
        }
        Ok(Self { seconds, nanos })
    }
}

impl EncodeSize for Timestamp {
    fn encode_size(&self) -> usize {
        self.seconds.encode_size() + self.nanos.encode_size()
    }
}

/// Identifies one logical transaction for its whole retry lifecycle.
///
/// Chunks of a large transaction share the payer and valid start of the first
/// chunk and are told apart by `nonce`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransactionId {
    pub payer: AccountId,
    pub valid_start: Timestamp,
    pub scheduled: bool,
    pub nonce: Option<u32>,
}

impl TransactionId {
    pub fn new(payer: AccountId, valid_start: Timestamp) -> Self {
        Self {
            payer,
            valid_start,
            scheduled: false,
            nonce: None,
        }
    }

    /// Generate a fresh id for `payer`.
    ///
    /// The valid start is backdated by 5 to 8 seconds so that a node whose
    /// clock is slightly behind ours does not reject it as not yet valid.
    pub fn generate(payer: AccountId) -> Self {
        let backdate = rand::thread_rng().gen_range(5_000_000_000u64..8_000_000_000);
        Self::new(payer, Timestamp::now().saturating_sub(Duration::from_nanos(backdate)))
    }

    pub fn with_nonce(self, nonce: u32) -> Self {
        Self {
            nonce: Some(nonce),
            ..self
        }
    }

    pub fn with_scheduled(self, scheduled: bool) -> Self {
        Self { scheduled, ..self }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{:09}",
            self.payer, self.valid_start.seconds, self.valid_start.nanos
        )?;
        if self.scheduled {
            f.write_str("?scheduled")?;
        }
        if let Some(nonce) = self.nonce {
            write!(f, "/{nonce}")?;
        }
        Ok(())
    }
}

impl Write for TransactionId {
    fn write(&self, writer: &mut impl BufMut) {
        self.payer.write(writer);
        self.valid_start.write(writer);
        self.scheduled.write(writer);
        self.nonce.write(writer);
    }
}

impl Read for TransactionId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            payer: AccountId::read(reader)?,
            valid_start: Timestamp::read(reader)?,
            scheduled: bool::read(reader)?,
            nonce: Option::read(reader)?,
        })
    }
}

impl EncodeSize for TransactionId {
    fn encode_size(&self) -> usize {
        self.payer.encode_size()
            + self.valid_start.encode_size()
            + self.scheduled.encode_size()
            + self.nonce.encode_size()
    }
}

/// Position of one message chunk within a chunked topic submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkInfo {
    pub initial_transaction_id: TransactionId,
    /// 1-based.
    pub number: u32,
    pub total: u32,
}

impl Write for ChunkInfo {
    fn write(&self, writer: &mut impl BufMut) {
        self.initial_transaction_id.write(writer);
        self.number.write(writer);
        self.total.write(writer);
    }
}

impl Read for ChunkInfo {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let initial_transaction_id = TransactionId::read(reader)?;
        let number = u32::read(reader)?;
        let total = u32::read(reader)?;
        if number == 0 || number > total {
            return Err(Error::Invalid("ChunkInfo", "chunk number out of range"));
        }
        Ok(Self {
            initial_transaction_id,
            number,
            total,
        })
    }
}

impl EncodeSize for ChunkInfo {
    fn encode_size(&self) -> usize {
        self.initial_transaction_id.encode_size()
            + self.number.encode_size()
            + self.total.encode_size()
    }
}

/// A signed balance change within a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountAmount {
    pub account_id: AccountId,
    pub amount: i64,
}

impl Write for AccountAmount {
    fn write(&self, writer: &mut impl BufMut) {
        self.account_id.write(writer);
        self.amount.write(writer);
    }
}

impl Read for AccountAmount {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            account_id: AccountId::read(reader)?,
            amount: i64::read(reader)?,
        })
    }
}

impl EncodeSize for AccountAmount {
    fn encode_size(&self) -> usize {
        self.account_id.encode_size() + self.amount.encode_size()
    }
}

/// Discriminator of a payload type, carried in bodies and interchange lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransactionKind {
    Transfer = 0,
    AccountCreate = 1,
    FileAppend = 2,
    TopicMessageSubmit = 3,
    ScheduleCreate = 4,
    ScheduleSign = 5,
}

impl TransactionKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::AccountCreate => "account_create",
            Self::FileAppend => "file_append",
            Self::TopicMessageSubmit => "topic_message_submit",
            Self::ScheduleCreate => "schedule_create",
            Self::ScheduleSign => "schedule_sign",
        }
    }
}

impl TryFrom<u8> for TransactionKind {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => Self::Transfer,
            1 => Self::AccountCreate,
            2 => Self::FileAppend,
            3 => Self::TopicMessageSubmit,
            4 => Self::ScheduleCreate,
            5 => Self::ScheduleSign,
            tag => return Err(Error::InvalidEnum(tag)),
        })
    }
}

impl Write for TransactionKind {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for TransactionKind {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Self::try_from(u8::read(reader)?)
    }
}

impl EncodeSize for TransactionKind {
    fn encode_size(&self) -> usize {
        1
    }
}

/// Payload-specific part of a transaction body.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum TransactionData {
    /// Tag 0: move value between accounts; amounts must sum to zero.
    Transfer { transfers: Vec<AccountAmount> },
    /// Tag 1
    AccountCreate {
        key: ed25519::PublicKey,
        initial_balance: u64,
        memo: String,
    },
    /// Tag 2: append one slice of content to a file.
    FileAppend { file_id: FileId, contents: Vec<u8> },
    /// Tag 3
    TopicMessageSubmit {
        topic_id: TopicId,
        message: Vec<u8>,
        chunk_info: Option<ChunkInfo>,
    },
    /// Tag 4: ask the network to execute `scheduled` once enough keys sign it.
    ScheduleCreate {
        scheduled: SchedulableBody,
        payer: Option<AccountId>,
        memo: String,
    },
    /// Tag 5
    ScheduleSign { schedule_id: ScheduleId },
}

impl TransactionData {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Transfer { .. } => TransactionKind::Transfer,
            Self::AccountCreate { .. } => TransactionKind::AccountCreate,
            Self::FileAppend { .. } => TransactionKind::FileAppend,
            Self::TopicMessageSubmit { .. } => TransactionKind::TopicMessageSubmit,
            Self::ScheduleCreate { .. } => TransactionKind::ScheduleCreate,
            Self::ScheduleSign { .. } => TransactionKind::ScheduleSign,
        }
    }

    /// Check every checksummed id embedded in the data against `ledger`.
    pub fn validate_checksums(&self, ledger: &LedgerId) -> Result<(), ChecksumError> {
        match self {
            Self::Transfer { transfers } => transfers
                .iter()
                .try_for_each(|transfer| transfer.account_id.validate_checksum(ledger)),
            Self::AccountCreate { .. } => Ok(()),
            Self::FileAppend { file_id, .. } => file_id.validate_checksum(ledger),
            Self::TopicMessageSubmit { topic_id, .. } => topic_id.validate_checksum(ledger),
            Self::ScheduleCreate {
                scheduled, payer, ..
            } => {
                if let Some(payer) = payer {
                    payer.validate_checksum(ledger)?;
                }
                scheduled.data.validate_checksums(ledger)
            }
            Self::ScheduleSign { schedule_id } => schedule_id.validate_checksum(ledger),
        }
    }

    fn read_nested(reader: &mut impl Buf, allow_schedule: bool) -> Result<Self, Error> {
        let data = match TransactionKind::read(reader)? {
            TransactionKind::Transfer => Self::Transfer {
                transfers: Vec::<AccountAmount>::read_range(reader, 0..=MAX_TRANSFERS)?,
            },
            TransactionKind::AccountCreate => Self::AccountCreate {
                key: ed25519::PublicKey::read(reader)?,
                initial_balance: u64::read(reader)?,
                memo: read_string(reader, MAX_MEMO_LENGTH)?,
            },
            TransactionKind::FileAppend => Self::FileAppend {
                file_id: FileId::read(reader)?,
                contents: Vec::<u8>::read_range(reader, 0..=MAX_CONTENT_LENGTH)?,
            },
            TransactionKind::TopicMessageSubmit => Self::TopicMessageSubmit {
                topic_id: TopicId::read(reader)?,
                message: Vec::<u8>::read_range(reader, 0..=MAX_CONTENT_LENGTH)?,
                chunk_info: Option::read(reader)?,
            },
            TransactionKind::ScheduleCreate if allow_schedule => Self::ScheduleCreate {
                scheduled: SchedulableBody::read(reader)?,
                payer: Option::read(reader)?,
                memo: read_string(reader, MAX_MEMO_LENGTH)?,
            },
            TransactionKind::ScheduleCreate => {
                return Err(Error::Invalid(
                    "TransactionData",
                    "schedule create cannot be scheduled",
                ))
            }
            TransactionKind::ScheduleSign => Self::ScheduleSign {
                schedule_id: ScheduleId::read(reader)?,
            },
        };
        Ok(data)
    }
}

impl Write for TransactionData {
    fn write(&self, writer: &mut impl BufMut) {
        self.kind().write(writer);
        match self {
            Self::Transfer { transfers } => transfers.write(writer),
            Self::AccountCreate {
                key,
                initial_balance,
                memo,
            } => {
                key.write(writer);
                initial_balance.write(writer);
                write_string(memo, writer);
            }
            Self::FileAppend { file_id, contents } => {
                file_id.write(writer);
                contents.write(writer);
            }
            Self::TopicMessageSubmit {
                topic_id,
                message,
                chunk_info,
            } => {
                topic_id.write(writer);
                message.write(writer);
                chunk_info.write(writer);
            }
            Self::ScheduleCreate {
                scheduled,
                payer,
                memo,
            } => {
                scheduled.write(writer);
                payer.write(writer);
                write_string(memo, writer);
            }
            Self::ScheduleSign { schedule_id } => schedule_id.write(writer),
        }
    }
}

impl Read for TransactionData {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Self::read_nested(reader, true)
    }
}

impl EncodeSize for TransactionData {
    fn encode_size(&self) -> usize {
        self.kind().encode_size()
            + match self {
                Self::Transfer { transfers } => transfers.encode_size(),
                Self::AccountCreate {
                    key,
                    initial_balance,
                    memo,
                } => key.encode_size() + initial_balance.encode_size() + string_encode_size(memo),
                Self::FileAppend { file_id, contents } => {
                    file_id.encode_size() + contents.encode_size()
                }
                Self::TopicMessageSubmit {
                    topic_id,
                    message,
                    chunk_info,
                } => topic_id.encode_size() + message.encode_size() + chunk_info.encode_size(),
                Self::ScheduleCreate {
                    scheduled,
                    payer,
                    memo,
                } => {
                    scheduled.encode_size() + payer.encode_size() + string_encode_size(memo)
                }
                Self::ScheduleSign { schedule_id } => schedule_id.encode_size(),
            }
    }
}

/// The part of a transaction that can be wrapped in a schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulableBody {
    pub max_fee: u64,
    pub memo: String,
    pub data: Box<TransactionData>,
}

impl Write for SchedulableBody {
    fn write(&self, writer: &mut impl BufMut) {
        self.max_fee.write(writer);
        write_string(&self.memo, writer);
        self.data.write(writer);
    }
}

impl Read for SchedulableBody {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            max_fee: u64::read(reader)?,
            memo: read_string(reader, MAX_MEMO_LENGTH)?,
            data: Box::new(TransactionData::read_nested(reader, false)?),
        })
    }
}

impl EncodeSize for SchedulableBody {
    fn encode_size(&self) -> usize {
        self.max_fee.encode_size() + string_encode_size(&self.memo) + self.data.encode_size()
    }
}

/// The canonical, signed part of a transaction sent to one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionBody {
    pub transaction_id: TransactionId,
    pub node_account_id: AccountId,
    pub max_fee: u64,
    pub valid_duration_secs: u64,
    pub memo: String,
    pub data: TransactionData,
}

impl Write for TransactionBody {
    fn write(&self, writer: &mut impl BufMut) {
        self.transaction_id.write(writer);
        self.node_account_id.write(writer);
        self.max_fee.write(writer);
        self.valid_duration_secs.write(writer);
        write_string(&self.memo, writer);
        self.data.write(writer);
    }
}

impl Read for TransactionBody {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            transaction_id: TransactionId::read(reader)?,
            node_account_id: AccountId::read(reader)?,
            max_fee: u64::read(reader)?,
            valid_duration_secs: u64::read(reader)?,
            memo: read_string(reader, MAX_MEMO_LENGTH)?,
            data: TransactionData::read(reader)?,
        })
    }
}

impl EncodeSize for TransactionBody {
    fn encode_size(&self) -> usize {
        self.transaction_id.encode_size()
            + self.node_account_id.encode_size()
            + self.max_fee.encode_size()
            + self.valid_duration_secs.encode_size()
            + string_encode_size(&self.memo)
            + self.data.encode_size()
    }
}

/// A signature over a body, with the key that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignaturePair {
    pub public: ed25519::PublicKey,
    pub signature: ed25519::Signature,
}

impl SignaturePair {
    pub fn sign(private: &ed25519::PrivateKey, body_bytes: &[u8]) -> Self {
        Self {
            public: private.public_key(),
            signature: private.sign(&transaction_namespace(NAMESPACE), body_bytes),
        }
    }

    pub fn verify(&self, body_bytes: &[u8]) -> bool {
        self.public.verify(
            &transaction_namespace(NAMESPACE),
            body_bytes,
            &self.signature,
        )
    }
}

impl Write for SignaturePair {
    fn write(&self, writer: &mut impl BufMut) {
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for SignaturePair {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            public: ed25519::PublicKey::read(reader)?,
            signature: ed25519::Signature::read(reader)?,
        })
    }
}

impl EncodeSize for SignaturePair {
    fn encode_size(&self) -> usize {
        self.public.encode_size() + self.signature.encode_size()
    }
}

/// Frozen body bytes plus the signatures collected for them.
///
/// The body bytes never change once built; only the signature list grows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub body_bytes: Vec<u8>,
    pub signatures: Vec<SignaturePair>,
}

impl SignedTransaction {
    pub fn new(body: &TransactionBody) -> Self {
        Self {
            body_bytes: body.encode().to_vec(),
            signatures: Vec::new(),
        }
    }

    pub fn body(&self) -> Result<TransactionBody, Error> {
        TransactionBody::decode(self.body_bytes.as_ref())
    }

    pub fn is_signed_by(&self, public: &ed25519::PublicKey) -> bool {
        self.signatures.iter().any(|pair| &pair.public == public)
    }

    /// Add a signature unless one from the same key is already present.
    ///
    /// Returns whether the signature was added.
    pub fn add_signature(&mut self, pair: SignaturePair) -> bool {
        if self.is_signed_by(&pair.public) {
            return false;
        }
        self.signatures.push(pair);
        true
    }

    /// Hash identifying the submitted body (signatures are excluded).
    pub fn hash(&self) -> Digest {
        Sha256::hash(&self.body_bytes)
    }
}

impl Write for SignedTransaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.body_bytes.write(writer);
        self.signatures.write(writer);
    }
}

impl Read for SignedTransaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            body_bytes: Vec::<u8>::read_range(reader, 0..=MAX_BODY_LENGTH)?,
            signatures: Vec::<SignaturePair>::read_range(reader, 0..=MAX_SIGNATURES)?,
        })
    }
}

impl EncodeSize for SignedTransaction {
    fn encode_size(&self) -> usize {
        self.body_bytes.encode_size() + self.signatures.encode_size()
    }
}

/// A node's precheck answer to a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmitResponse {
    pub precheck: Status,
    pub cost: u64,
}

impl Write for SubmitResponse {
    fn write(&self, writer: &mut impl BufMut) {
        self.precheck.write(writer);
        self.cost.write(writer);
    }
}

impl Read for SubmitResponse {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            precheck: Status::read(reader)?,
            cost: u64::read(reader)?,
        })
    }
}

impl EncodeSize for SubmitResponse {
    fn encode_size(&self) -> usize {
        self.precheck.encode_size() + self.cost.encode_size()
    }
}

/// Serialized form of a frozen transaction, for handing it to other signers.
///
/// `chunks[i][j]` is chunk `i` as prepared for the `j`-th node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionList {
    pub kind: TransactionKind,
    pub chunks: Vec<Vec<SignedTransaction>>,
}

impl Write for TransactionList {
    fn write(&self, writer: &mut impl BufMut) {
        self.kind.write(writer);
        self.chunks.write(writer);
    }
}

impl Read for TransactionList {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = TransactionKind::read(reader)?;
        let chunks = Vec::<Vec<SignedTransaction>>::read_cfg(
            reader,
            &(
                RangeCfg::from(1..=MAX_CHUNKS),
                (RangeCfg::from(1..=MAX_NODES), ()),
            ),
        )?;
        Ok(Self { kind, chunks })
    }
}

impl EncodeSize for TransactionList {
    fn encode_size(&self) -> usize {
        self.kind.encode_size() + self.chunks.encode_size()
    }
}
