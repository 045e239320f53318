//! Freeze, sign and submit transactions.
//!
//! A [Transaction] is built unfrozen, frozen once (which fixes its id, fee,
//! node list and canonical bodies), signed any number of times and executed.
//! Frozen body bytes never change; only their signature lists grow.

use crate::{
    client::{ChunkingConfig, Client},
    execute::{execute, ExecutionConfig, Execute},
    network::Node,
    payload::{schedulable_body, ChunkContext, Payload},
    payloads::schedule::ScheduleCreate,
    receipt::{Resubmit, TransactionResponse},
    transport::Method,
    ConfigurationError, Error, Result,
};
use async_trait::async_trait;
use bytes::Bytes;
use commonware_codec::{DecodeExt, Encode, EncodeSize};
use commonware_cryptography::{ed25519, Signer};
use meridian_types::{
    transaction_namespace, AccountId, SignaturePair, SignedTransaction, Status, SubmitResponse,
    TransactionBody, TransactionId, TransactionList, NAMESPACE,
};
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Default validity window of a transaction.
pub const DEFAULT_VALID_DURATION: Duration = Duration::from_secs(120);

/// Something that can sign frozen transaction bodies.
pub trait TransactionSigner: Send + Sync {
    fn public(&self) -> ed25519::PublicKey;

    fn sign_body(&self, body_bytes: &[u8]) -> ed25519::Signature;
}

impl TransactionSigner for ed25519::PrivateKey {
    fn public(&self) -> ed25519::PublicKey {
        self.public_key()
    }

    fn sign_body(&self, body_bytes: &[u8]) -> ed25519::Signature {
        self.sign(&transaction_namespace(NAMESPACE), body_bytes)
    }
}

#[derive(Clone, Debug)]
struct FrozenChunk {
    transaction_id: TransactionId,
    /// One per node, in the order of [Frozen::node_account_ids].
    signed: Vec<SignedTransaction>,
}

#[derive(Clone, Debug)]
struct Frozen {
    node_account_ids: Vec<AccountId>,
    max_fee: u64,
    chunking: ChunkingConfig,
    chunks: Vec<FrozenChunk>,
}

impl Frozen {
    fn apply(&mut self, signer: &dyn TransactionSigner) {
        let public = signer.public();
        for signed in self.chunks.iter_mut().flat_map(|chunk| chunk.signed.iter_mut()) {
            if signed.is_signed_by(&public) {
                continue;
            }
            let signature = signer.sign_body(&signed.body_bytes);
            signed.add_signature(SignaturePair {
                public: public.clone(),
                signature,
            });
        }
    }

    fn signed_for(&self, chunk: usize, node: &AccountId) -> Result<&SignedTransaction> {
        let index = self
            .node_account_ids
            .iter()
            .position(|id| id == node)
            .ok_or(ConfigurationError::UnknownNode(*node))?;
        self.chunks
            .get(chunk)
            .and_then(|chunk| chunk.signed.get(index))
            .ok_or(Error::NotFrozen)
    }
}

/// A transaction of payload type `D`.
#[derive(Clone)]
pub struct Transaction<D> {
    data: D,
    node_account_ids: Option<Vec<AccountId>>,
    transaction_id: Option<TransactionId>,
    generated_id: bool,
    max_fee: Option<u64>,
    valid_duration: Duration,
    memo: String,
    execution: Option<ExecutionConfig>,
    chunking: Option<ChunkingConfig>,
    frozen: Option<Frozen>,
    signers: Vec<Arc<dyn TransactionSigner>>,
    sealed: bool,
}

impl<D: fmt::Debug> fmt::Debug for Transaction<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("data", &self.data)
            .field("transaction_id", &self.transaction_id)
            .field("node_account_ids", &self.node_account_ids)
            .field("max_fee", &self.max_fee)
            .field("memo", &self.memo)
            .field("frozen", &self.frozen.is_some())
            .field("sealed", &self.sealed)
            .finish()
    }
}

impl<D: Payload> Transaction<D> {
    pub fn new(data: D) -> Self {
        Self {
            data,
            node_account_ids: None,
            transaction_id: None,
            generated_id: false,
            max_fee: None,
            valid_duration: DEFAULT_VALID_DURATION,
            memo: String::new(),
            execution: None,
            chunking: None,
            frozen: None,
            signers: Vec::new(),
            sealed: false,
        }
    }

    fn require_unfrozen(&self) -> Result<()> {
        if self.frozen.is_some() {
            return Err(Error::AlreadyFrozen);
        }
        Ok(())
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    /// Use a caller-chosen id. Such ids are never regenerated.
    pub fn set_transaction_id(&mut self, transaction_id: TransactionId) -> Result<&mut Self> {
        self.require_unfrozen()?;
        self.transaction_id = Some(transaction_id);
        self.generated_id = false;
        Ok(self)
    }

    /// Restrict submission to these nodes, tried in this order.
    pub fn set_node_account_ids(&mut self, node_account_ids: Vec<AccountId>) -> Result<&mut Self> {
        self.require_unfrozen()?;
        self.node_account_ids = Some(node_account_ids);
        Ok(self)
    }

    pub fn set_max_transaction_fee(&mut self, max_fee: u64) -> Result<&mut Self> {
        self.require_unfrozen()?;
        self.max_fee = Some(max_fee);
        Ok(self)
    }

    pub fn set_valid_duration(&mut self, valid_duration: Duration) -> Result<&mut Self> {
        self.require_unfrozen()?;
        self.valid_duration = valid_duration;
        Ok(self)
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self> {
        self.require_unfrozen()?;
        self.memo = memo.into();
        Ok(self)
    }

    pub fn set_chunking(&mut self, chunking: ChunkingConfig) -> Result<&mut Self> {
        self.require_unfrozen()?;
        self.chunking = Some(chunking);
        Ok(self)
    }

    /// Override the client's retry settings for this transaction.
    pub fn set_execution_config(&mut self, execution: ExecutionConfig) -> &mut Self {
        self.execution = Some(execution);
        self
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    pub fn node_account_ids(&self) -> Option<&[AccountId]> {
        match &self.frozen {
            Some(frozen) => Some(&frozen.node_account_ids),
            None => self.node_account_ids.as_deref(),
        }
    }

    pub fn max_transaction_fee(&self) -> Option<u64> {
        match &self.frozen {
            Some(frozen) => Some(frozen.max_fee),
            None => self.max_fee,
        }
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of chunks (0 until frozen).
    pub fn chunk_count(&self) -> usize {
        self.frozen.as_ref().map_or(0, |frozen| frozen.chunks.len())
    }

    /// Per-node signed bodies of `chunk`.
    pub fn signed_transactions(&self, chunk: usize) -> Option<&[SignedTransaction]> {
        self.frozen
            .as_ref()
            .and_then(|frozen| frozen.chunks.get(chunk))
            .map(|chunk| chunk.signed.as_slice())
    }

    /// Freeze without a client. The transaction id and node list must be set.
    pub fn freeze(&mut self) -> Result<&mut Self> {
        self.freeze_inner(None)
    }

    /// Freeze, taking the payer, nodes, fee and limits from `client` where the
    /// transaction does not set them.
    pub fn freeze_with(&mut self, client: &Client) -> Result<&mut Self> {
        self.freeze_inner(Some(client))
    }

    fn freeze_inner(&mut self, client: Option<&Client>) -> Result<&mut Self> {
        self.require_unfrozen()?;
        if let Some(client) = client.filter(|client| client.auto_validate_checksums()) {
            self.data.validate_checksums(client.ledger())?;
        }

        let (transaction_id, generated) = match self.transaction_id {
            Some(transaction_id) => (transaction_id, self.generated_id),
            None => {
                let payer = client
                    .and_then(Client::operator)
                    .map(|operator| operator.account_id)
                    .ok_or(Error::MissingField("transaction_id"))?;
                (TransactionId::generate(payer), true)
            }
        };
        let node_account_ids = match &self.node_account_ids {
            Some(ids) if ids.is_empty() => return Err(ConfigurationError::NoNodes.into()),
            Some(ids) => ids.clone(),
            None => client
                .ok_or(Error::MissingField("node_account_ids"))?
                .network()
                .node_account_ids()?,
        };
        let max_fee = self
            .max_fee
            .or_else(|| client.and_then(Client::default_max_transaction_fee))
            .unwrap_or_else(|| self.data.default_max_fee());
        let chunking = self
            .chunking
            .or_else(|| client.map(|client| *client.chunking()))
            .unwrap_or_default();

        let chunks = self.build_chunks(transaction_id, &node_account_ids, max_fee, &chunking)?;
        self.transaction_id = Some(transaction_id);
        self.generated_id = generated;
        let mut frozen = Frozen {
            node_account_ids,
            max_fee,
            chunking,
            chunks,
        };
        for signer in &self.signers {
            frozen.apply(signer.as_ref());
        }
        self.frozen = Some(frozen);
        Ok(self)
    }

    fn build_chunks(
        &self,
        root: TransactionId,
        node_account_ids: &[AccountId],
        max_fee: u64,
        chunking: &ChunkingConfig,
    ) -> Result<Vec<FrozenChunk>> {
        let content = self.data.chunked_content();
        let total = content.map_or(1, |content| {
            content.len().div_ceil(chunking.chunk_size()).max(1)
        });
        if total > chunking.max_chunks() {
            return Err(Error::MaxChunksExceeded {
                required: total,
                max: chunking.max_chunks(),
            });
        }

        (0..total)
            .map(|index| {
                let transaction_id = match index {
                    0 => root,
                    index => root.with_nonce(index as u32),
                };
                let data = match content {
                    Some(content) => {
                        let start = index * chunking.chunk_size();
                        let end = (start + chunking.chunk_size()).min(content.len());
                        self.data.build_data(Some(&ChunkContext {
                            index,
                            total,
                            initial_transaction_id: root,
                            content: &content[start..end],
                        }))
                    }
                    None => self.data.build_data(None),
                };
                let signed = node_account_ids
                    .iter()
                    .map(|node_account_id| {
                        let body = TransactionBody {
                            transaction_id,
                            node_account_id: *node_account_id,
                            max_fee,
                            valid_duration_secs: self.valid_duration.as_secs(),
                            memo: self.memo.clone(),
                            data: data.clone(),
                        };
                        let size = body.encode_size();
                        if size > chunking.max_transaction_size() {
                            return Err(Error::TransactionOversize {
                                size,
                                max: chunking.max_transaction_size(),
                            });
                        }
                        Ok(SignedTransaction::new(&body))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(FrozenChunk {
                    transaction_id,
                    signed,
                })
            })
            .collect()
    }

    /// Sign every held body with `key`. Signing twice with the same key is a
    /// no-op.
    pub fn sign(&mut self, key: ed25519::PrivateKey) -> Result<&mut Self> {
        self.sign_with(Arc::new(key))
    }

    pub fn sign_with(&mut self, signer: Arc<dyn TransactionSigner>) -> Result<&mut Self> {
        if self.sealed {
            return Err(Error::Sealed);
        }
        let frozen = self.frozen.as_mut().ok_or(Error::NotFrozen)?;
        let public = signer.public();
        if !self.signers.iter().any(|known| known.public() == public) {
            self.signers.push(signer.clone());
        }
        frozen.apply(signer.as_ref());
        Ok(self)
    }

    /// Attach a signature produced elsewhere to the body of `chunk` for `node`.
    ///
    /// The signature is verified first. Keys added this way cannot sign a
    /// regenerated transaction.
    pub fn add_signature(
        &mut self,
        chunk: usize,
        node: AccountId,
        public: ed25519::PublicKey,
        signature: ed25519::Signature,
    ) -> Result<&mut Self> {
        if self.sealed {
            return Err(Error::Sealed);
        }
        let frozen = self.frozen.as_mut().ok_or(Error::NotFrozen)?;
        let index = frozen
            .node_account_ids
            .iter()
            .position(|id| *id == node)
            .ok_or(ConfigurationError::UnknownNode(node))?;
        let signed = frozen
            .chunks
            .get_mut(chunk)
            .and_then(|chunk| chunk.signed.get_mut(index))
            .ok_or(Error::MissingField("chunk"))?;
        let pair = SignaturePair { public, signature };
        if !pair.verify(&signed.body_bytes) {
            return Err(Error::InvalidSignature);
        }
        signed.add_signature(pair);
        Ok(self)
    }

    /// Refuse any further signatures.
    pub fn seal(&mut self) -> Result<&mut Self> {
        if self.frozen.is_none() {
            return Err(Error::NotFrozen);
        }
        self.sealed = true;
        Ok(self)
    }

    /// Wrap this transaction in a schedule.
    pub fn schedule(&self) -> Result<Transaction<ScheduleCreate>> {
        let max_fee = self
            .max_transaction_fee()
            .unwrap_or_else(|| self.data.default_max_fee());
        let body = schedulable_body(&self.data, max_fee, self.memo.clone())?;
        let mut scheduled = Transaction::new(ScheduleCreate::new(body));
        scheduled.node_account_ids = self.node_account_ids.clone();
        scheduled.execution = self.execution.clone();
        Ok(scheduled)
    }

    /// Replace the id with a fresh one for the same payer and re-sign.
    fn regenerate(&mut self) -> Result<()> {
        let frozen = self.frozen.as_ref().ok_or(Error::NotFrozen)?;
        let root = self.transaction_id.ok_or(Error::NotFrozen)?;
        for pair in frozen
            .chunks
            .iter()
            .flat_map(|chunk| &chunk.signed)
            .flat_map(|signed| &signed.signatures)
        {
            if !self.signers.iter().any(|signer| signer.public() == pair.public) {
                return Err(ConfigurationError::SignerUnavailable(pair.public.clone()).into());
            }
        }

        let regenerated = TransactionId::generate(root.payer);
        let chunks = self.build_chunks(
            regenerated,
            &frozen.node_account_ids,
            frozen.max_fee,
            &frozen.chunking,
        )?;
        let mut refrozen = Frozen {
            chunks,
            ..frozen.clone()
        };
        for signer in &self.signers {
            refrozen.apply(signer.as_ref());
        }
        self.transaction_id = Some(regenerated);
        self.frozen = Some(refrozen);
        Ok(())
    }

    fn sign_with_operator(&mut self, client: &Client) -> Result<()> {
        let Some(operator) = client.operator() else {
            return Ok(());
        };
        let pays = self
            .transaction_id
            .is_some_and(|id| id.payer == operator.account_id);
        if pays && !self.sealed {
            self.sign_with(operator.signer.clone())?;
        }
        Ok(())
    }

    fn execution_config(&self, client: &Client) -> ExecutionConfig {
        self.execution
            .clone()
            .unwrap_or_else(|| client.execution_config().clone())
    }

    /// Submit the transaction, returning the response for its first chunk.
    pub async fn execute(&mut self, client: &Client) -> Result<TransactionResponse> {
        self.execute_all(client)
            .await?
            .into_iter()
            .next()
            .ok_or(Error::UnexpectedResponse)
    }

    /// Submit every chunk in order. Chunk `n + 1` is only sent once chunk `n`
    /// has been accepted.
    pub async fn execute_all(&mut self, client: &Client) -> Result<Vec<TransactionResponse>> {
        if self.frozen.is_none() {
            self.freeze_with(client)?;
        }
        self.sign_with_operator(client)?;
        let config = self.execution_config(client);

        let total = self.chunk_count();
        let mut responses = Vec::with_capacity(total);
        for chunk in 0..total {
            let mut request = ChunkRequest {
                transaction: &mut *self,
                chunk,
            };
            let response = execute(client, &mut request, &config).await?;
            debug!(
                transaction_id = %response.transaction_id,
                node = %response.node_account_id,
                chunk,
                total,
                "chunk accepted"
            );
            responses.push(response);
        }
        Ok(responses)
    }

    /// Serialize the frozen transaction (every chunk and node body with its
    /// signatures) for another party to sign or submit.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let frozen = self.frozen.as_ref().ok_or(Error::NotFrozen)?;
        let list = TransactionList {
            kind: D::KIND,
            chunks: frozen
                .chunks
                .iter()
                .map(|chunk| chunk.signed.clone())
                .collect(),
        };
        Ok(list.encode().to_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_list(TransactionList::decode(bytes)?)
    }

    pub(crate) fn from_list(list: TransactionList) -> Result<Self> {
        let invalid = |reason: &'static str| {
            Error::InvalidData(commonware_codec::Error::Invalid("TransactionList", reason))
        };
        if list.kind != D::KIND {
            return Err(invalid("body does not match transaction kind"));
        }

        let mut node_account_ids: Option<Vec<AccountId>> = None;
        let mut first: Option<TransactionBody> = None;
        let mut chunks = Vec::with_capacity(list.chunks.len());
        let mut data = Vec::with_capacity(list.chunks.len());
        for (index, signed) in list.chunks.into_iter().enumerate() {
            let bodies = signed
                .iter()
                .map(SignedTransaction::body)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let head = bodies.first().ok_or_else(|| invalid("empty chunk"))?.clone();
            for body in &bodies {
                if body.data.kind() != D::KIND {
                    return Err(invalid("body does not match transaction kind"));
                }
                if body.transaction_id != head.transaction_id || body.data != head.data {
                    return Err(invalid("bodies of a chunk differ"));
                }
            }
            let ids: Vec<_> = bodies.iter().map(|body| body.node_account_id).collect();
            match &node_account_ids {
                Some(expected) if *expected != ids => {
                    return Err(invalid("chunks target different nodes"))
                }
                Some(_) => {}
                None => node_account_ids = Some(ids),
            }
            let root = first
                .as_ref()
                .map_or(head.transaction_id, |first| first.transaction_id);
            let expected = match index {
                0 => root,
                index => root.with_nonce(index as u32),
            };
            if head.transaction_id != expected {
                return Err(invalid("chunk ids out of order"));
            }

            chunks.push(FrozenChunk {
                transaction_id: head.transaction_id,
                signed,
            });
            data.push(head.data.clone());
            if first.is_none() {
                first = Some(head);
            }
        }
        let first = first.ok_or_else(|| invalid("no chunks"))?;
        let node_account_ids = node_account_ids.ok_or_else(|| invalid("no chunks"))?;

        Ok(Self {
            data: D::from_chunks(data)?,
            node_account_ids: Some(node_account_ids.clone()),
            transaction_id: Some(first.transaction_id),
            generated_id: false,
            max_fee: Some(first.max_fee),
            valid_duration: Duration::from_secs(first.valid_duration_secs),
            memo: first.memo,
            execution: None,
            chunking: None,
            frozen: Some(Frozen {
                node_account_ids,
                max_fee: first.max_fee,
                chunking: ChunkingConfig::default(),
                chunks,
            }),
            signers: Vec::new(),
            sealed: false,
        })
    }
}

/// One chunk of a transaction driven through the retry loop.
struct ChunkRequest<'a, D> {
    transaction: &'a mut Transaction<D>,
    chunk: usize,
}

impl<D> ChunkRequest<'_, D> {
    fn frozen(&self) -> Result<&Frozen> {
        self.transaction.frozen.as_ref().ok_or(Error::NotFrozen)
    }
}

impl<D: Payload> Execute for ChunkRequest<'_, D> {
    type Response = SubmitResponse;
    type Output = TransactionResponse;

    fn node_account_ids(&self) -> Option<&[AccountId]> {
        self.transaction
            .frozen
            .as_ref()
            .map(|frozen| frozen.node_account_ids.as_slice())
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction
            .frozen
            .as_ref()
            .and_then(|frozen| frozen.chunks.get(self.chunk))
            .map(|chunk| chunk.transaction_id)
    }

    fn method(&self) -> Method {
        self.transaction.data.method()
    }

    fn can_regenerate(&self) -> bool {
        // Later chunks refer to the id of the first one.
        self.chunk == 0 && self.transaction.generated_id
    }

    fn regenerate_transaction_id(&mut self, _client: &Client) -> Result<()> {
        self.transaction.regenerate()
    }

    fn make_request(&mut self, _client: &Client, node: &Node) -> Result<Bytes> {
        let signed = self.frozen()?.signed_for(self.chunk, &node.account_id())?;
        Ok(signed.encode().freeze())
    }

    fn decode(&self, reply: Bytes) -> std::result::Result<SubmitResponse, commonware_codec::Error> {
        SubmitResponse::decode(reply)
    }

    fn status(response: &SubmitResponse) -> Status {
        response.precheck
    }

    fn make_output(&self, _response: SubmitResponse, node: AccountId) -> Result<TransactionResponse> {
        let frozen = self.frozen()?;
        let signed = frozen.signed_for(self.chunk, &node)?;
        let transaction_id = frozen
            .chunks
            .get(self.chunk)
            .map(|chunk| chunk.transaction_id)
            .ok_or(Error::NotFrozen)?;
        Ok(TransactionResponse {
            node_account_id: node,
            transaction_id,
            hash: signed.hash(),
            resubmit: Some(Arc::new(Resubmission {
                transaction: self.transaction.clone(),
                chunk: self.chunk,
            })),
        })
    }
}

/// Sends a chunk again after the network throttled it at consensus.
struct Resubmission<D> {
    transaction: Transaction<D>,
    chunk: usize,
}

#[async_trait]
impl<D: Payload> Resubmit for Resubmission<D> {
    async fn resubmit(&self, client: &Client) -> Result<TransactionResponse> {
        let mut transaction = self.transaction.clone();
        if self.chunk == 0 && transaction.chunk_count() == 1 && transaction.generated_id {
            transaction.regenerate()?;
        }
        warn!(
            original = ?self.transaction.transaction_id,
            resubmitted = ?transaction.transaction_id,
            chunk = self.chunk,
            "resubmitting throttled transaction"
        );
        let config = transaction.execution_config(client);
        let mut request = ChunkRequest {
            transaction: &mut transaction,
            chunk: self.chunk,
        };
        execute(client, &mut request, &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::{file_append::FileAppend, transfer::Transfer};
    use commonware_cryptography::Signer;
    use meridian_types::{FileId, Timestamp};

    fn fixed_id() -> TransactionId {
        TransactionId::new(
            AccountId::new(0, 0, 1001),
            Timestamp {
                seconds: 1_700_000_000,
                nanos: 0,
            },
        )
    }

    fn frozen_transfer() -> Transaction<Transfer> {
        let mut transaction = Transaction::new(
            Transfer::new()
                .add_transfer(AccountId::new(0, 0, 1001), -10)
                .add_transfer(AccountId::new(0, 0, 1002), 10),
        );
        transaction
            .set_transaction_id(fixed_id())
            .unwrap()
            .set_node_account_ids(vec![AccountId::new(0, 0, 3), AccountId::new(0, 0, 4)])
            .unwrap()
            .freeze()
            .unwrap();
        transaction
    }

    #[test]
    fn freeze_without_client_needs_id_and_nodes() {
        let mut transaction = Transaction::new(Transfer::new());
        assert!(matches!(
            transaction.freeze(),
            Err(Error::MissingField("transaction_id"))
        ));
        transaction.set_transaction_id(fixed_id()).unwrap();
        assert!(matches!(
            transaction.freeze(),
            Err(Error::MissingField("node_account_ids"))
        ));
    }

    #[test]
    fn setters_fail_after_freeze() {
        let mut transaction = frozen_transfer();
        assert!(matches!(transaction.set_memo("late"), Err(Error::AlreadyFrozen)));
        assert!(matches!(transaction.freeze(), Err(Error::AlreadyFrozen)));
        assert_eq!(transaction.max_transaction_fee(), Some(Transfer::DEFAULT_MAX_FEE));
    }

    #[test]
    fn signing_requires_freeze_and_is_idempotent() {
        let key = ed25519::PrivateKey::from_seed(1);
        let mut unfrozen = Transaction::new(Transfer::new());
        assert!(matches!(unfrozen.sign(key.clone()), Err(Error::NotFrozen)));

        let mut transaction = frozen_transfer();
        transaction.sign(key.clone()).unwrap();
        transaction.sign(key).unwrap();
        transaction.sign(ed25519::PrivateKey::from_seed(2)).unwrap();
        for signed in transaction.signed_transactions(0).unwrap() {
            assert_eq!(signed.signatures.len(), 2);
            assert!(signed.signatures.iter().all(|pair| pair.verify(&signed.body_bytes)));
        }
    }

    #[test]
    fn sealed_transactions_refuse_signatures() {
        let mut transaction = frozen_transfer();
        transaction.seal().unwrap();
        assert!(matches!(
            transaction.sign(ed25519::PrivateKey::from_seed(1)),
            Err(Error::Sealed)
        ));
    }

    #[test]
    fn add_signature_verifies() {
        let key = ed25519::PrivateKey::from_seed(5);
        let mut transaction = frozen_transfer();
        let node = AccountId::new(0, 0, 4);
        let body = transaction.signed_transactions(0).unwrap()[1].body_bytes.clone();

        // Signed over the other node's body.
        let wrong = transaction.signed_transactions(0).unwrap()[0].body_bytes.clone();
        let err = transaction
            .add_signature(0, node, key.public_key(), key.sign_body(&wrong))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSignature));

        transaction
            .add_signature(0, node, key.public_key(), key.sign_body(&body))
            .unwrap();
        assert_eq!(transaction.signed_transactions(0).unwrap()[1].signatures.len(), 1);
        assert!(transaction.signed_transactions(0).unwrap()[0].signatures.is_empty());
    }

    #[test]
    fn regeneration_needs_every_signer() {
        let key = ed25519::PrivateKey::from_seed(5);
        let mut transaction = frozen_transfer();
        let body = transaction.signed_transactions(0).unwrap()[0].body_bytes.clone();
        transaction
            .add_signature(0, AccountId::new(0, 0, 3), key.public_key(), key.sign_body(&body))
            .unwrap();
        let err = transaction.regenerate().unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::SignerUnavailable(_))
        ));
        // Nothing changed.
        assert_eq!(transaction.transaction_id(), Some(fixed_id()));
    }

    #[test]
    fn regeneration_resigns_with_known_signers() {
        let mut transaction = frozen_transfer();
        transaction.sign(ed25519::PrivateKey::from_seed(1)).unwrap();
        transaction.regenerate().unwrap();

        let regenerated = transaction.transaction_id().unwrap();
        assert_ne!(regenerated, fixed_id());
        assert_eq!(regenerated.payer, fixed_id().payer);
        for signed in transaction.signed_transactions(0).unwrap() {
            assert_eq!(signed.body().unwrap().transaction_id, regenerated);
            assert_eq!(signed.signatures.len(), 1);
            assert!(signed.signatures[0].verify(&signed.body_bytes));
        }
    }

    #[test]
    fn oversized_body_is_rejected() {
        let mut transaction = Transaction::new(FileAppend::new(FileId::new(0, 0, 150), vec![7; 600]));
        transaction
            .set_transaction_id(fixed_id())
            .unwrap()
            .set_node_account_ids(vec![AccountId::new(0, 0, 3)])
            .unwrap()
            .set_chunking(ChunkingConfig::new(256, 1_024, 20).unwrap())
            .unwrap();
        assert!(matches!(
            transaction.freeze(),
            Err(Error::TransactionOversize { max: 256, .. })
        ));
    }

    #[test]
    fn too_many_chunks_are_rejected() {
        let mut transaction = Transaction::new(FileAppend::new(FileId::new(0, 0, 150), vec![7; 4_097]));
        transaction
            .set_transaction_id(fixed_id())
            .unwrap()
            .set_node_account_ids(vec![AccountId::new(0, 0, 3)])
            .unwrap()
            .set_chunking(ChunkingConfig::new(6_144, 1_024, 4).unwrap())
            .unwrap();
        assert!(matches!(
            transaction.freeze(),
            Err(Error::MaxChunksExceeded { required: 5, max: 4 })
        ));
    }

    #[test]
    fn interchange_rejects_other_kinds() {
        let bytes = frozen_transfer().to_bytes().unwrap();
        assert!(Transaction::<FileAppend>::from_bytes(&bytes).is_err());
        let decoded = Transaction::<Transfer>::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.transaction_id(), Some(fixed_id()));
        assert_eq!(decoded.node_account_ids().unwrap().len(), 2);
    }
}
