//! Moving encoded requests to a node and bringing back its reply.

use crate::network::Node;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use std::fmt;
use thiserror::Error;

/// Service a method belongs to (first path segment on the wire).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Service {
    Crypto,
    File,
    Consensus,
    Schedule,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crypto => "crypto",
            Self::File => "file",
            Self::Consensus => "consensus",
            Self::Schedule => "schedule",
        }
    }
}

/// A remote procedure exposed by every node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Method {
    pub service: Service,
    pub name: &'static str,
}

impl Method {
    pub const fn new(service: Service, name: &'static str) -> Self {
        Self { service, name }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service.as_str(), self.name)
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {0}")]
    Failed(StatusCode),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("connection failed: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// Whether another attempt (possibly at another node) may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Reqwest(err) => {
                // Body and decode errors are connections dropped mid-reply.
                err.is_timeout()
                    || err.is_connect()
                    || err.is_request()
                    || err.is_body()
                    || err.is_decode()
            }
            Self::Failed(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Url(_) => false,
            Self::Unavailable(_) => true,
        }
    }
}

/// Sends one encoded request to one node.
#[async_trait]
pub trait Channel: Send + Sync {
    async fn call(&self, node: &Node, method: Method, request: Bytes)
        -> Result<Bytes, TransportError>;
}

/// [Channel] that POSTs requests to `{node address}/{service}/{method}`.
#[derive(Clone, Debug, Default)]
pub struct HttpChannel {
    client: reqwest::Client,
}

impl HttpChannel {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
        })
    }
}

#[async_trait]
impl Channel for HttpChannel {
    async fn call(
        &self,
        node: &Node,
        method: Method,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        let url = node.address().join(&method.to_string())?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Failed(status));
        }
        Ok(response.bytes().await?)
    }
}
