//! A scripted [Channel] for exercising the engine without a network.

use crate::{
    client::Client,
    health::{MAX_BACKOFF, MIN_BACKOFF},
    network::{Network, Node},
    transport::{Channel, Method, TransportError},
};
use async_trait::async_trait;
use bytes::Bytes;
use commonware_codec::{DecodeExt, Encode};
use meridian_types::{
    AccountId, LedgerId, QueryAnswer, QueryRequest, QueryResponse, SignedTransaction, Status,
    SubmitResponse, TransactionBody,
};
use reqwest::StatusCode;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use tokio::time::Instant;
use url::Url;

/// What the mock answers to one call.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// A transaction precheck.
    Submit(Status),
    Query(QueryResponse),
    /// A transient transport failure.
    Unavailable,
    /// An HTTP status the transport does not retry.
    Rejected(StatusCode),
    /// Reply with these bytes as they are.
    Raw(Bytes),
    /// Never answer.
    Hang,
}

impl MockReply {
    pub fn answer(answer: QueryAnswer) -> Self {
        Self::Query(QueryResponse {
            precheck: Status::Ok,
            cost: 0,
            answer: Some(answer),
        })
    }

    pub fn cost(cost: u64) -> Self {
        Self::Query(QueryResponse {
            precheck: Status::Ok,
            cost,
            answer: None,
        })
    }
}

/// A call the mock received.
#[derive(Clone, Debug)]
pub struct MockCall {
    pub node: AccountId,
    pub method: Method,
    pub request: Bytes,
    pub at: Instant,
}

impl MockCall {
    /// Decode the request as a submitted transaction.
    pub fn signed(&self) -> SignedTransaction {
        SignedTransaction::decode(self.request.clone()).expect("not a transaction")
    }

    pub fn body(&self) -> TransactionBody {
        self.signed().body().expect("invalid body")
    }

    /// Decode the request as a query.
    pub fn query(&self) -> QueryRequest {
        QueryRequest::decode(self.request.clone()).expect("not a query")
    }
}

/// Answers calls from a queue of scripted replies, recording every call.
///
/// Calls made after the script runs out fail with a transient error.
#[derive(Default)]
pub struct MockChannel {
    replies: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: MockReply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn push_n(&self, reply: MockReply, count: usize) -> &Self {
        let mut replies = self.replies.lock().unwrap();
        replies.extend(std::iter::repeat(reply).take(count));
        drop(replies);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn call(
        &self,
        node: &Node,
        method: Method,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        self.calls.lock().unwrap().push(MockCall {
            node: node.account_id(),
            method,
            request,
            at: Instant::now(),
        });
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(MockReply::Submit(precheck)) => {
                Ok(SubmitResponse { precheck, cost: 0 }.encode().freeze())
            }
            Some(MockReply::Query(response)) => Ok(response.encode().freeze()),
            Some(MockReply::Unavailable) => Err(TransportError::Unavailable("mock".to_string())),
            Some(MockReply::Rejected(status)) => Err(TransportError::Failed(status)),
            Some(MockReply::Raw(bytes)) => Ok(bytes),
            Some(MockReply::Hang) => std::future::pending().await,
            None => Err(TransportError::Unavailable("no scripted reply".to_string())),
        }
    }
}

/// Account ids `0.0.3`, `0.0.4`, ... of a mock network with `count` nodes.
pub fn node_ids(count: u64) -> Vec<AccountId> {
    (0..count).map(|i| AccountId::new(0, 0, 3 + i)).collect()
}

/// A testnet client over `count` mock nodes.
pub fn mock_client(count: u64) -> (Client, Arc<MockChannel>) {
    let nodes = node_ids(count).into_iter().map(|id| {
        let address = Url::parse(&format!("http://node{}.invalid", id.num)).expect("valid url");
        (id, address)
    });
    let network =
        Network::new(LedgerId::Testnet, nodes, MIN_BACKOFF, MAX_BACKOFF).expect("valid network");
    let channel = Arc::new(MockChannel::new());
    (Client::new(network, channel.clone()), channel)
}
