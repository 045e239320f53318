//! What a submission returns, and resolving it into a receipt.

use crate::{
    client::Client, payloads::transaction_receipt::TransactionReceiptQuery, query::Query, Error,
    Result,
};
use async_trait::async_trait;
use commonware_cryptography::sha256::Digest;
use meridian_types::{AccountId, Status, TransactionId, TransactionReceipt};
use std::{fmt, sync::Arc};
use tracing::warn;

/// Sends an accepted chunk again.
#[async_trait]
pub(crate) trait Resubmit: Send + Sync {
    async fn resubmit(&self, client: &Client) -> Result<TransactionResponse>;
}

/// A node accepted a transaction (chunk) for consensus.
///
/// Acceptance says nothing about the outcome; use [TransactionResponse::get_receipt].
#[derive(Clone)]
pub struct TransactionResponse {
    pub node_account_id: AccountId,
    pub transaction_id: TransactionId,
    /// Hash of the submitted body.
    pub hash: Digest,
    pub(crate) resubmit: Option<Arc<dyn Resubmit>>,
}

impl fmt::Debug for TransactionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionResponse")
            .field("node_account_id", &self.node_account_id)
            .field("transaction_id", &self.transaction_id)
            .field("hash", &self.hash)
            .finish()
    }
}

impl TransactionResponse {
    /// Receipt query pinned to the node that accepted the transaction.
    pub fn receipt_query(&self) -> Query<TransactionReceiptQuery> {
        receipt_query(self.transaction_id, self.node_account_id)
    }

    /// Wait for the receipt.
    ///
    /// A receipt throttled at consensus causes one resubmission; a second
    /// throttle is returned as [Error::ReceiptThrottled].
    pub async fn get_receipt(&self, client: &Client) -> Result<TransactionReceipt> {
        let receipt = self.receipt_query().execute(client).await?;
        if receipt.status != Status::ThrottledAtConsensus {
            return Ok(receipt);
        }
        let Some(resubmit) = &self.resubmit else {
            return Err(Error::ReceiptThrottled {
                transaction_id: self.transaction_id,
            });
        };

        warn!(transaction_id = %self.transaction_id, "throttled at consensus");
        let retried = resubmit.resubmit(client).await?;
        let receipt = receipt_query(retried.transaction_id, retried.node_account_id)
            .execute(client)
            .await?;
        if receipt.status == Status::ThrottledAtConsensus {
            return Err(Error::ReceiptThrottled {
                transaction_id: retried.transaction_id,
            });
        }
        Ok(receipt)
    }

    /// Like [TransactionResponse::get_receipt], but any status other than
    /// `SUCCESS` is an error.
    pub async fn get_successful_receipt(&self, client: &Client) -> Result<TransactionReceipt> {
        let receipt = self.get_receipt(client).await?;
        if receipt.status != Status::Success {
            return Err(Error::ReceiptStatus {
                status: receipt.status,
                transaction_id: self.transaction_id,
            });
        }
        Ok(receipt)
    }
}

fn receipt_query(transaction_id: TransactionId, node: AccountId) -> Query<TransactionReceiptQuery> {
    let mut query = Query::new(TransactionReceiptQuery::new(transaction_id));
    query.set_node_account_ids(vec![node]);
    query
}
