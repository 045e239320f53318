//! The retry loop shared by transactions, queries and cost requests.
//!
//! Each attempt picks a node, waits for it to become eligible, sends the
//! request and classifies the reply:
//!
//! * accepted replies end the loop and improve the node's health;
//! * `BUSY`-like replies back off and retry the same node;
//! * answers that are not final yet are polled again on the same node without
//!   lowering its health;
//! * transport failures and node-specific rejections back off and rotate;
//! * an expired transaction id is replaced (when allowed) and the loop
//!   restarts;
//! * anything else is returned to the caller.

use crate::{
    client::Client,
    health::{MAX_BACKOFF, MIN_BACKOFF},
    network::{Node, Rotation},
    transport::Method,
    ConfigurationError, Error, Result,
};
use bytes::Bytes;
use meridian_types::{AccountId, Status, TransactionId};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Default number of attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Default per-call deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Default time a single node is given to answer.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry settings for one call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionConfig {
    max_attempts: usize,
    min_backoff: Duration,
    max_backoff: Duration,
    request_timeout: Option<Duration>,
    attempt_timeout: Duration,
    regenerate_transaction_id: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_backoff: MIN_BACKOFF,
            max_backoff: MAX_BACKOFF,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            regenerate_transaction_id: false,
        }
    }
}

impl ExecutionConfig {
    pub fn new(
        max_attempts: usize,
        min_backoff: Duration,
        max_backoff: Duration,
    ) -> std::result::Result<Self, ConfigurationError> {
        if max_attempts == 0 {
            return Err(ConfigurationError::ZeroAttempts);
        }
        if min_backoff > max_backoff {
            return Err(ConfigurationError::BackoffRange {
                min: min_backoff,
                max: max_backoff,
            });
        }
        Ok(Self {
            max_attempts,
            min_backoff,
            max_backoff,
            ..Self::default()
        })
    }

    /// Bound the whole call (all attempts, waits and sleeps). `None` disables
    /// the bound.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Replace an expired, engine-generated transaction id and try again.
    pub fn with_regenerate_transaction_id(mut self, regenerate: bool) -> Self {
        self.regenerate_transaction_id = regenerate;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn min_backoff(&self) -> Duration {
        self.min_backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    pub fn regenerate_transaction_id(&self) -> bool {
        self.regenerate_transaction_id
    }

    /// Sleep after the `attempt`-th retryable reply (0-based):
    /// `min(max, min * 2^attempt)`.
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.min_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// Classification of one reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    RetryableNetwork,
    RetryableBusy,
    /// The node answered but the result is not final yet. Ask the same node
    /// again after the backoff without counting it against the node.
    Pending,
    RetryableExpired,
    Fatal(Status),
}

/// Default classification of a precheck status.
pub fn classify(status: Status, regenerate: bool) -> Outcome {
    match status {
        Status::Ok | Status::Success => Outcome::Accepted,
        Status::Busy | Status::PlatformNotActive => Outcome::RetryableBusy,
        Status::PlatformTransactionNotCreated | Status::InvalidNodeAccount => {
            Outcome::RetryableNetwork
        }
        Status::TransactionExpired if regenerate => Outcome::RetryableExpired,
        status => Outcome::Fatal(status),
    }
}

/// A request the retry loop can drive.
pub(crate) trait Execute {
    /// Decoded reply of a node.
    type Response;
    type Output;

    /// Nodes this request is restricted to, in order.
    fn node_account_ids(&self) -> Option<&[AccountId]>;

    fn transaction_id(&self) -> Option<TransactionId>;

    fn method(&self) -> Method;

    /// Whether an expired transaction id may be replaced.
    fn can_regenerate(&self) -> bool {
        false
    }

    fn regenerate_transaction_id(&mut self, _client: &Client) -> Result<()> {
        Ok(())
    }

    fn make_request(&mut self, client: &Client, node: &Node) -> Result<Bytes>;

    fn decode(&self, reply: Bytes) -> std::result::Result<Self::Response, commonware_codec::Error>;

    /// Status used for classification and reported on exhaustion.
    fn status(response: &Self::Response) -> Status;

    fn classify(&self, response: &Self::Response, regenerate: bool) -> Outcome {
        classify(Self::status(response), regenerate)
    }

    fn make_output(&self, response: Self::Response, node: AccountId) -> Result<Self::Output>;
}

/// Drive `request` to completion, bounded by the call deadline.
pub(crate) async fn execute<E: Execute + Send>(
    client: &Client,
    request: &mut E,
    config: &ExecutionConfig,
) -> Result<E::Output>
where
    E::Response: Send,
{
    let Some(deadline) = config.request_timeout() else {
        return run(client, request, config).await;
    };
    let result = tokio::time::timeout(deadline, run(client, &mut *request, config)).await;
    match result {
        Ok(result) => result,
        // The id may have been regenerated while running.
        Err(_) => Err(Error::DeadlineExceeded {
            transaction_id: request.transaction_id(),
        }),
    }
}

async fn run<E: Execute + Send>(
    client: &Client,
    request: &mut E,
    config: &ExecutionConfig,
) -> Result<E::Output>
where
    E::Response: Send,
{
    let mut rotation = Rotation::new(
        client
            .network()
            .candidate_nodes(request.node_account_ids())?,
    )?;
    let mut pinned: Option<Arc<Node>> = None;
    let mut last_status = None;
    let mut retries = 0;

    for attempt in 0..config.max_attempts() {
        let node = match pinned.take() {
            Some(node) => node,
            None => {
                let node = rotation.select();
                node.health().wait_if_needed().await;
                node
            }
        };
        let method = request.method();
        let payload = request.make_request(client, &node)?;
        debug!(node = %node.account_id(), attempt, %method, "sending request");

        let sent = tokio::time::timeout(
            config.attempt_timeout(),
            client.channel().call(&node, method, payload),
        )
        .await;
        let (outcome, response) = match sent {
            Ok(Ok(reply)) => {
                let response =
                    request
                        .decode(reply)
                        .map_err(|source| Error::InvalidResponse {
                            source,
                            transaction_id: request.transaction_id(),
                            node: node.account_id(),
                        })?;
                let status = E::status(&response);
                last_status = Some(status);
                let regenerate = config.regenerate_transaction_id() && request.can_regenerate();
                (request.classify(&response, regenerate), Some(response))
            }
            Ok(Err(err)) if err.is_transient() => {
                warn!(node = %node.account_id(), attempt, ?err, "transport failure");
                (Outcome::RetryableNetwork, None)
            }
            Ok(Err(source)) => {
                return Err(Error::RequestFailed {
                    source,
                    transaction_id: request.transaction_id(),
                    node: node.account_id(),
                })
            }
            Err(_) => {
                warn!(node = %node.account_id(), attempt, "node did not answer in time");
                (Outcome::RetryableNetwork, None)
            }
        };

        // No point sleeping when no attempt follows.
        let last_attempt = attempt + 1 == config.max_attempts();
        match outcome {
            Outcome::Accepted => {
                let response = response.ok_or(Error::UnexpectedResponse)?;
                node.health().record_success();
                return request.make_output(response, node.account_id());
            }
            Outcome::Fatal(status) => {
                return Err(Error::PrecheckRejected {
                    status,
                    transaction_id: request.transaction_id(),
                    node: node.account_id(),
                })
            }
            Outcome::RetryableBusy => {
                node.health().record_failure();
                let backoff = config.backoff_for(retries);
                retries += 1;
                warn!(node = %node.account_id(), attempt, ?backoff, status = ?last_status, "node busy");
                if !last_attempt {
                    tokio::time::sleep(backoff).await;
                }
                pinned = Some(node);
            }
            Outcome::Pending => {
                let backoff = config.backoff_for(retries);
                retries += 1;
                debug!(node = %node.account_id(), attempt, ?backoff, status = ?last_status, "not final yet");
                if !last_attempt {
                    tokio::time::sleep(backoff).await;
                }
                pinned = Some(node);
            }
            Outcome::RetryableNetwork => {
                node.health().record_failure();
                let backoff = config.backoff_for(retries);
                retries += 1;
                warn!(node = %node.account_id(), attempt, ?backoff, "rotating to next node");
                if !last_attempt {
                    tokio::time::sleep(backoff).await;
                }
            }
            Outcome::RetryableExpired => {
                let expired = request.transaction_id();
                request.regenerate_transaction_id(client)?;
                warn!(
                    expired = ?expired,
                    regenerated = ?request.transaction_id(),
                    "transaction expired, regenerated id"
                );
            }
        }
    }

    Err(Error::Timeout {
        attempts: config.max_attempts(),
        last: last_status,
        transaction_id: request.transaction_id(),
    })
}
