use crate::{
    query::QueryPayload,
    transport::{Method, Service},
    Error, Result,
};
use meridian_types::{
    ChecksumError, LedgerId, QueryAnswer, QueryData, Status, TransactionId, TransactionReceipt,
};

/// Fetch the receipt of a transaction. Free.
///
/// The query is retried against the same node until the receipt is final;
/// failing outcomes are returned as they are.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionReceiptQuery {
    pub transaction_id: TransactionId,
}

impl TransactionReceiptQuery {
    pub fn new(transaction_id: TransactionId) -> Self {
        Self { transaction_id }
    }
}

impl QueryPayload for TransactionReceiptQuery {
    type Output = TransactionReceipt;

    fn method(&self) -> Method {
        Method::new(Service::Crypto, "getTransactionReceipts")
    }

    fn is_paid(&self) -> bool {
        false
    }

    fn data(&self) -> QueryData {
        QueryData::TransactionReceipt {
            transaction_id: self.transaction_id,
        }
    }

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError> {
        self.transaction_id.payer.validate_checksum(ledger)
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        Some(self.transaction_id)
    }

    fn retry_precheck(&self, status: Status) -> bool {
        matches!(status, Status::Unknown | Status::ReceiptNotFound)
    }

    fn is_pending(&self, answer: &QueryAnswer) -> bool {
        matches!(answer, QueryAnswer::Receipt(receipt) if receipt.is_pending())
    }

    fn make_output(answer: QueryAnswer) -> Result<TransactionReceipt> {
        match answer {
            QueryAnswer::Receipt(receipt) => Ok(receipt),
            _ => Err(Error::UnexpectedResponse),
        }
    }
}
