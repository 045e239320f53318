use crate::{
    config::ValidatedConfig,
    execute::ExecutionConfig,
    network::Network,
    transaction::TransactionSigner,
    transport::{Channel, HttpChannel},
    ConfigurationError, Result,
};
use meridian_types::{AccountId, LedgerId};
use std::{fmt, sync::Arc};
use url::Url;

/// Default upper bound on a single transaction body.
pub const DEFAULT_MAX_TRANSACTION_SIZE: usize = 6_144;

/// Default amount of content carried by each chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1_024;

/// Default maximum number of chunks in one transaction.
pub const DEFAULT_MAX_CHUNKS: usize = 20;

/// Default ceiling on what a paid query may cost.
pub const DEFAULT_MAX_QUERY_PAYMENT: u64 = 100_000_000;

/// Limits applied when freezing transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkingConfig {
    max_transaction_size: usize,
    chunk_size: usize,
    max_chunks: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_transaction_size: DEFAULT_MAX_TRANSACTION_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

impl ChunkingConfig {
    pub fn new(
        max_transaction_size: usize,
        chunk_size: usize,
        max_chunks: usize,
    ) -> std::result::Result<Self, ConfigurationError> {
        for (field, value) in [
            ("max_transaction_size", max_transaction_size),
            ("chunk_size", chunk_size),
            ("max_chunks", max_chunks),
        ] {
            if value == 0 {
                return Err(ConfigurationError::ZeroLimit { field });
            }
        }
        Ok(Self {
            max_transaction_size,
            chunk_size,
            max_chunks,
        })
    }

    pub fn max_transaction_size(&self) -> usize {
        self.max_transaction_size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }
}

/// The account that pays for transactions and queries by default, with the
/// key that signs for it.
#[derive(Clone)]
pub struct Operator {
    pub account_id: AccountId,
    pub signer: Arc<dyn TransactionSigner>,
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("account_id", &self.account_id)
            .field("signer", &"<redacted>")
            .finish()
    }
}

/// Shared handle to a ledger network.
///
/// Cloning is cheap and clones share node health.
#[derive(Clone)]
pub struct Client {
    network: Arc<Network>,
    channel: Arc<dyn Channel>,
    operator: Option<Operator>,
    execution: ExecutionConfig,
    chunking: ChunkingConfig,
    default_max_transaction_fee: Option<u64>,
    max_query_payment: u64,
    auto_validate_checksums: bool,
}

impl Client {
    pub fn new(network: Network, channel: Arc<dyn Channel>) -> Self {
        Self {
            network: Arc::new(network),
            channel,
            operator: None,
            execution: ExecutionConfig::default(),
            chunking: ChunkingConfig::default(),
            default_max_transaction_fee: None,
            max_query_payment: DEFAULT_MAX_QUERY_PAYMENT,
            auto_validate_checksums: true,
        }
    }

    /// Connect to `nodes` over HTTP.
    pub fn for_nodes<'a>(
        ledger: LedgerId,
        nodes: impl IntoIterator<Item = (AccountId, &'a str)>,
    ) -> Result<Self> {
        let execution = ExecutionConfig::default();
        let nodes = nodes
            .into_iter()
            .map(|(account_id, address)| Ok((account_id, parse_node_url(address)?)))
            .collect::<Result<Vec<_>>>()?;
        let network = Network::new(
            ledger,
            nodes,
            execution.min_backoff(),
            execution.max_backoff(),
        )?;
        Ok(Self::new(network, Arc::new(HttpChannel::new()?)))
    }

    /// Build a client from a validated configuration file.
    pub fn from_config(config: ValidatedConfig) -> Result<Self> {
        let network = Network::new(
            config.ledger,
            config.nodes,
            config.execution.min_backoff(),
            config.execution.max_backoff(),
        )?;
        let mut client = Self::new(network, Arc::new(HttpChannel::new()?))
            .with_execution_config(config.execution)
            .with_chunking(config.chunking)
            .with_max_query_payment(config.max_query_payment)
            .with_auto_validate_checksums(config.auto_validate_checksums);
        client.default_max_transaction_fee = config.default_max_transaction_fee;
        if let Some((account_id, key)) = config.operator {
            client = client.with_operator(account_id, Arc::new(key));
        }
        Ok(client)
    }

    pub fn with_operator(mut self, account_id: AccountId, signer: Arc<dyn TransactionSigner>) -> Self {
        self.operator = Some(Operator { account_id, signer });
        self
    }

    pub fn with_execution_config(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_default_max_transaction_fee(mut self, fee: u64) -> Self {
        self.default_max_transaction_fee = Some(fee);
        self
    }

    pub fn with_max_query_payment(mut self, max: u64) -> Self {
        self.max_query_payment = max;
        self
    }

    pub fn with_auto_validate_checksums(mut self, validate: bool) -> Self {
        self.auto_validate_checksums = validate;
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn ledger(&self) -> &LedgerId {
        self.network.ledger()
    }

    pub(crate) fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    pub fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    pub fn execution_config(&self) -> &ExecutionConfig {
        &self.execution
    }

    pub fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    pub fn default_max_transaction_fee(&self) -> Option<u64> {
        self.default_max_transaction_fee
    }

    pub fn max_query_payment(&self) -> u64 {
        self.max_query_payment
    }

    pub fn auto_validate_checksums(&self) -> bool {
        self.auto_validate_checksums
    }
}

fn parse_node_url(address: &str) -> Result<Url> {
    let url = Url::parse(address).map_err(crate::transport::TransportError::from)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigurationError::InvalidScheme(scheme.to_string()).into()),
    }
}
