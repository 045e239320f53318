//! Read-only requests, optionally paid for with a transfer to the answering
//! node.

use crate::{
    client::{Client, Operator},
    execute::{classify, execute, ExecutionConfig, Execute, Outcome},
    network::Node,
    transaction::DEFAULT_VALID_DURATION,
    transport::Method,
    ConfigurationError, Error, Result,
};
use bytes::Bytes;
use commonware_codec::{DecodeExt, Encode};
use meridian_types::{
    AccountAmount, AccountId, ChecksumError, LedgerId, QueryAnswer, QueryData, QueryHeader,
    QueryRequest, QueryResponse, ResponseType, SignaturePair, SignedTransaction, Status,
    TransactionBody, TransactionData, TransactionId,
};
use std::collections::HashMap;
use tracing::debug;

/// Fee offered by query payment transfers when the client sets no default.
pub const DEFAULT_PAYMENT_MAX_FEE: u64 = 100_000_000;

/// A concrete query type.
pub trait QueryPayload: Clone + Send + Sync + 'static {
    type Output: Send;

    fn method(&self) -> Method;

    /// Whether nodes must be paid to answer.
    fn is_paid(&self) -> bool;

    fn data(&self) -> QueryData;

    fn validate_checksums(&self, ledger: &LedgerId) -> std::result::Result<(), ChecksumError>;

    /// Transaction the query is about, reported in errors.
    fn transaction_id(&self) -> Option<TransactionId> {
        None
    }

    /// Precheck statuses meaning "ask the same node again later".
    fn retry_precheck(&self, _status: Status) -> bool {
        false
    }

    /// Answers that are not final yet.
    fn is_pending(&self, _answer: &QueryAnswer) -> bool {
        false
    }

    fn make_output(answer: QueryAnswer) -> Result<Self::Output>;
}

/// A query of payload type `D`.
#[derive(Clone, Debug)]
pub struct Query<D> {
    data: D,
    node_account_ids: Option<Vec<AccountId>>,
    payment_amount: Option<u64>,
    max_payment: Option<u64>,
    execution: Option<ExecutionConfig>,
}

impl<D: QueryPayload> Query<D> {
    pub fn new(data: D) -> Self {
        Self {
            data,
            node_account_ids: None,
            payment_amount: None,
            max_payment: None,
            execution: None,
        }
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn set_node_account_ids(&mut self, node_account_ids: Vec<AccountId>) -> &mut Self {
        self.node_account_ids = Some(node_account_ids);
        self
    }

    /// Pay exactly this much instead of asking for the cost first.
    pub fn set_payment_amount(&mut self, amount: u64) -> &mut Self {
        self.payment_amount = Some(amount);
        self
    }

    /// Refuse to pay more than this (defaults to the client's limit).
    pub fn set_max_payment(&mut self, max: u64) -> &mut Self {
        self.max_payment = Some(max);
        self
    }

    pub fn set_execution_config(&mut self, execution: ExecutionConfig) -> &mut Self {
        self.execution = Some(execution);
        self
    }

    fn execution_config(&self, client: &Client) -> ExecutionConfig {
        self.execution
            .clone()
            .unwrap_or_else(|| client.execution_config().clone())
    }

    /// Ask a node what answering would cost.
    pub async fn get_cost(&self, client: &Client) -> Result<u64> {
        let mut request = CostRequest { query: self };
        execute(client, &mut request, &self.execution_config(client)).await
    }

    pub async fn execute(&self, client: &Client) -> Result<D::Output> {
        if client.auto_validate_checksums() {
            self.data.validate_checksums(client.ledger())?;
        }

        let payment = if self.data.is_paid() {
            Some(self.payment(client).await?)
        } else {
            None
        };
        let mut request = QueryExecution {
            query: self,
            payment,
        };
        execute(client, &mut request, &self.execution_config(client)).await
    }

    async fn payment(&self, client: &Client) -> Result<Payment> {
        let operator = client.operator().ok_or(ConfigurationError::NoOperator)?;
        let amount = match self.payment_amount {
            Some(amount) => amount,
            None => {
                let cost = self.get_cost(client).await?;
                let max = self.max_payment.unwrap_or_else(|| client.max_query_payment());
                if cost > max {
                    return Err(Error::MaxQueryPaymentExceeded { cost, max });
                }
                cost
            }
        };
        let amount = i64::try_from(amount).map_err(|_| Error::MaxQueryPaymentExceeded {
            cost: amount,
            max: i64::MAX as u64,
        })?;
        debug!(amount, method = %self.data.method(), "paying for query");
        Ok(Payment {
            operator: operator.clone(),
            transaction_id: TransactionId::generate(operator.account_id),
            amount,
            max_fee: client
                .default_max_transaction_fee()
                .unwrap_or(DEFAULT_PAYMENT_MAX_FEE),
            by_node: HashMap::new(),
        })
    }
}

/// Transfers paying for one query execution, built per node on first use.
struct Payment {
    operator: Operator,
    transaction_id: TransactionId,
    amount: i64,
    max_fee: u64,
    by_node: HashMap<AccountId, SignedTransaction>,
}

impl Payment {
    fn for_node(&mut self, node: AccountId) -> SignedTransaction {
        let Self {
            operator,
            transaction_id,
            amount,
            max_fee,
            by_node,
        } = self;
        by_node
            .entry(node)
            .or_insert_with(|| {
                let body = TransactionBody {
                    transaction_id: *transaction_id,
                    node_account_id: node,
                    max_fee: *max_fee,
                    valid_duration_secs: DEFAULT_VALID_DURATION.as_secs(),
                    memo: String::new(),
                    data: TransactionData::Transfer {
                        transfers: vec![
                            AccountAmount {
                                account_id: operator.account_id,
                                amount: -*amount,
                            },
                            AccountAmount {
                                account_id: node,
                                amount: *amount,
                            },
                        ],
                    },
                };
                let mut signed = SignedTransaction::new(&body);
                let signature = operator.signer.sign_body(&signed.body_bytes);
                signed.add_signature(SignaturePair {
                    public: operator.signer.public(),
                    signature,
                });
                signed
            })
            .clone()
    }
}

struct QueryExecution<'a, D> {
    query: &'a Query<D>,
    payment: Option<Payment>,
}

impl<D: QueryPayload> Execute for QueryExecution<'_, D> {
    type Response = QueryResponse;
    type Output = D::Output;

    fn node_account_ids(&self) -> Option<&[AccountId]> {
        self.query.node_account_ids.as_deref()
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.query
            .data
            .transaction_id()
            .or_else(|| self.payment.as_ref().map(|payment| payment.transaction_id))
    }

    fn method(&self) -> Method {
        self.query.data.method()
    }

    fn make_request(&mut self, _client: &Client, node: &Node) -> Result<Bytes> {
        let payment = self
            .payment
            .as_mut()
            .map(|payment| payment.for_node(node.account_id()));
        let request = QueryRequest {
            header: QueryHeader {
                payment,
                response_type: ResponseType::AnswerOnly,
            },
            data: self.query.data.data(),
        };
        Ok(request.encode().freeze())
    }

    fn decode(&self, reply: Bytes) -> std::result::Result<QueryResponse, commonware_codec::Error> {
        QueryResponse::decode(reply)
    }

    fn status(response: &QueryResponse) -> Status {
        response.precheck
    }

    fn classify(&self, response: &QueryResponse, regenerate: bool) -> Outcome {
        if self.query.data.retry_precheck(response.precheck) {
            return Outcome::Pending;
        }
        match classify(response.precheck, regenerate) {
            Outcome::Accepted
                if response
                    .answer
                    .as_ref()
                    .is_some_and(|answer| self.query.data.is_pending(answer)) =>
            {
                Outcome::Pending
            }
            outcome => outcome,
        }
    }

    fn make_output(&self, response: QueryResponse, _node: AccountId) -> Result<D::Output> {
        D::make_output(response.answer.ok_or(Error::UnexpectedResponse)?)
    }
}

struct CostRequest<'a, D> {
    query: &'a Query<D>,
}

impl<D: QueryPayload> Execute for CostRequest<'_, D> {
    type Response = QueryResponse;
    type Output = u64;

    fn node_account_ids(&self) -> Option<&[AccountId]> {
        self.query.node_account_ids.as_deref()
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        self.query.data.transaction_id()
    }

    fn method(&self) -> Method {
        self.query.data.method()
    }

    fn make_request(&mut self, _client: &Client, _node: &Node) -> Result<Bytes> {
        let request = QueryRequest {
            header: QueryHeader {
                payment: None,
                response_type: ResponseType::CostAnswer,
            },
            data: self.query.data.data(),
        };
        Ok(request.encode().freeze())
    }

    fn decode(&self, reply: Bytes) -> std::result::Result<QueryResponse, commonware_codec::Error> {
        QueryResponse::decode(reply)
    }

    fn status(response: &QueryResponse) -> Status {
        response.precheck
    }

    fn make_output(&self, response: QueryResponse, _node: AccountId) -> Result<u64> {
        Ok(response.cost)
    }
}
