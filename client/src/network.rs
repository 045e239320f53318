//! Known nodes and the order in which they are tried.

use crate::{health::NodeHealth, ConfigurationError};
use meridian_types::{AccountId, LedgerId};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use url::Url;

/// A node and its health.
#[derive(Debug)]
pub struct Node {
    account_id: AccountId,
    address: Url,
    health: NodeHealth,
}

impl Node {
    pub fn new(account_id: AccountId, address: Url, min: Duration, max: Duration) -> Self {
        Self {
            account_id,
            address,
            health: NodeHealth::new(min, max),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn health(&self) -> &NodeHealth {
        &self.health
    }
}

/// The declared node set of a ledger.
#[derive(Debug)]
pub struct Network {
    ledger: LedgerId,
    nodes: Vec<Arc<Node>>,
    cursor: AtomicUsize,
}

impl Network {
    /// Build a network from `(account id, address)` pairs with the given
    /// per-node delay bounds.
    pub fn new(
        ledger: LedgerId,
        nodes: impl IntoIterator<Item = (AccountId, Url)>,
        min_backoff: Duration,
        max_backoff: Duration,
    ) -> Result<Self, ConfigurationError> {
        if min_backoff > max_backoff {
            return Err(ConfigurationError::BackoffRange {
                min: min_backoff,
                max: max_backoff,
            });
        }
        let mut declared: Vec<Arc<Node>> = Vec::new();
        for (account_id, address) in nodes {
            // Later declarations of the same account replace earlier ones.
            declared.retain(|node| node.account_id != account_id);
            declared.push(Arc::new(Node::new(
                account_id,
                address,
                min_backoff,
                max_backoff,
            )));
        }
        if declared.is_empty() {
            return Err(ConfigurationError::NoNodes);
        }
        Ok(Self {
            ledger,
            nodes: declared,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn ledger(&self) -> &LedgerId {
        &self.ledger
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn node(&self, account_id: &AccountId) -> Option<&Arc<Node>> {
        self.nodes.iter().find(|node| &node.account_id == account_id)
    }

    /// Nodes a request may be sent to.
    ///
    /// With an explicit list only those nodes are returned, in that order.
    /// Otherwise the whole node set is returned, healthy nodes first, starting
    /// from a position that advances on every call so that load spreads.
    pub fn candidate_nodes(
        &self,
        explicit: Option<&[AccountId]>,
    ) -> Result<Vec<Arc<Node>>, ConfigurationError> {
        let candidates = match explicit {
            Some(ids) => ids
                .iter()
                .map(|id| {
                    self.node(id)
                        .cloned()
                        .ok_or(ConfigurationError::UnknownNode(*id))
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => {
                let start = self.cursor.fetch_add(1, Ordering::Relaxed) % self.nodes.len();
                let mut rotated: Vec<_> = self.nodes[start..]
                    .iter()
                    .chain(&self.nodes[..start])
                    .cloned()
                    .collect();
                rotated.sort_by_key(|node| !node.health.is_healthy());
                rotated
            }
        };
        if candidates.is_empty() {
            return Err(ConfigurationError::NoNodes);
        }
        Ok(candidates)
    }

    /// Account ids of [Network::candidate_nodes] without an explicit list.
    pub fn node_account_ids(&self) -> Result<Vec<AccountId>, ConfigurationError> {
        Ok(self
            .candidate_nodes(None)?
            .iter()
            .map(|node| node.account_id)
            .collect())
    }
}

/// Round-robin over a fixed candidate list, preferring healthy nodes.
pub(crate) struct Rotation {
    nodes: Vec<Arc<Node>>,
    next: usize,
}

impl Rotation {
    pub(crate) fn new(nodes: Vec<Arc<Node>>) -> Result<Self, ConfigurationError> {
        if nodes.is_empty() {
            return Err(ConfigurationError::NoNodes);
        }
        Ok(Self { nodes, next: 0 })
    }

    /// Pick the next healthy node in rotation, or (when none is healthy) the
    /// one that becomes eligible soonest.
    pub(crate) fn select(&mut self) -> Arc<Node> {
        let len = self.nodes.len();
        let index = (0..len)
            .map(|offset| (self.next + offset) % len)
            .find(|&index| self.nodes[index].health.is_healthy())
            .or_else(|| {
                (0..len).min_by_key(|&index| self.nodes[index].health.remaining())
            })
            .unwrap_or(0);
        self.next = (index + 1) % len;
        self.nodes[index].clone()
    }
}
