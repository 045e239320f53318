use super::*;
use crate::{
    health::MIN_BACKOFF,
    mocks::{mock_client, node_ids, MockReply},
    payloads::{
        AccountBalanceQuery, AccountCreate, AccountInfoQuery, FileAppend, ScheduleSign,
        TopicMessageSubmit, Transfer,
    },
};
use axum::{extract::State, routing::post, Router};
use bytes::Bytes;
use commonware_codec::{DecodeExt, Encode};
use commonware_cryptography::{ed25519::PrivateKey, Signer};
use meridian_types::{
    AccountAmount, AccountBalance, AccountInfo, FileId, LedgerId, QueryAnswer, QueryData,
    QueryResponse, ResponseType, ScheduleId, SignedTransaction, SubmitResponse, TopicId,
    TransactionData, TransactionReceipt,
};
use reqwest::StatusCode;
use mocks::MockChannel;
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::time::{sleep, Instant};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn payer() -> AccountId {
    AccountId::new(0, 0, 1001)
}

fn operator_key() -> PrivateKey {
    PrivateKey::from_seed(1001)
}

fn client(nodes: u64) -> (Client, Arc<MockChannel>) {
    let (client, channel) = mock_client(nodes);
    (client.with_operator(payer(), Arc::new(operator_key())), channel)
}

fn transfer() -> Transaction<Transfer> {
    Transaction::new(
        Transfer::new()
            .add_transfer(payer(), -100)
            .add_transfer(AccountId::new(0, 0, 1002), 100),
    )
}

fn receipt(status: Status) -> MockReply {
    MockReply::answer(QueryAnswer::Receipt(TransactionReceipt::new(status)))
}

fn assert_gap(gap: Duration, expected: Duration) {
    assert!(
        gap >= expected && gap <= expected + ms(2),
        "gap {gap:?}, expected {expected:?}"
    );
}

#[test]
fn test_freeze_assigns_id_and_refreeze_fails() {
    let (client, channel) = client(2);
    let mut transaction = transfer();
    assert_eq!(transaction.transaction_id(), None);

    transaction.freeze_with(&client).unwrap();
    let id = transaction.transaction_id().unwrap();
    assert_eq!(id.payer, payer());
    assert_eq!(transaction.node_account_ids().unwrap().len(), 2);
    assert_eq!(
        transaction.max_transaction_fee(),
        Some(Transfer::DEFAULT_MAX_FEE)
    );

    assert!(matches!(
        transaction.freeze_with(&client),
        Err(Error::AlreadyFrozen)
    ));
    assert_eq!(transaction.transaction_id(), Some(id));
    assert!(channel.calls().is_empty());
}

#[test]
fn test_freeze_resolves_payer_nodes_and_fee() {
    let (client, _) = mock_client(2);
    let mut transaction = transfer();
    assert!(matches!(
        transaction.freeze_with(&client),
        Err(Error::MissingField("transaction_id"))
    ));

    let client = client
        .with_operator(payer(), Arc::new(operator_key()))
        .with_default_max_transaction_fee(7);
    let mut transaction = transfer();
    transaction.freeze_with(&client).unwrap();
    assert_eq!(transaction.max_transaction_fee(), Some(7));

    let mut transaction = transfer();
    transaction
        .set_max_transaction_fee(3)
        .unwrap()
        .set_node_account_ids(vec![AccountId::new(0, 0, 4)])
        .unwrap()
        .freeze_with(&client)
        .unwrap();
    assert_eq!(transaction.max_transaction_fee(), Some(3));
    assert_eq!(
        transaction.node_account_ids(),
        Some(&[AccountId::new(0, 0, 4)][..])
    );
}

#[tokio::test(start_paused = true)]
async fn test_busy_backs_off_on_the_same_node() {
    let (client, channel) = client(3);
    channel
        .push_n(MockReply::Submit(Status::Busy), 3)
        .push(MockReply::Submit(Status::Ok));

    let mut transaction = transfer();
    let response = transaction.execute(&client).await.unwrap();
    assert_eq!(response.transaction_id, transaction.transaction_id().unwrap());

    let calls = channel.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|call| call.node == calls[0].node));
    assert_eq!(response.node_account_id, calls[0].node);
    for (pair, expected) in calls.windows(2).zip([250, 500, 1_000]) {
        assert_gap(pair[1].at - pair[0].at, ms(expected));
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_bound_reports_last_status() {
    let (client, channel) = client(1);
    let client = client.with_execution_config(ExecutionConfig::new(4, ms(250), ms(8_000)).unwrap());
    channel.push_n(MockReply::Submit(Status::Busy), 10);

    let mut transaction = transfer();
    let err = transaction.execute(&client).await.unwrap_err();
    let Error::Timeout {
        attempts,
        last,
        transaction_id,
    } = err
    else {
        panic!("expected timeout, got {err:?}");
    };
    assert_eq!(attempts, 4);
    assert_eq!(last, Some(Status::Busy));
    assert_eq!(transaction_id, transaction.transaction_id());
    assert_eq!(channel.calls().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_last_attempt_does_not_sleep() {
    let (client, channel) = client(1);
    let client = client.with_execution_config(ExecutionConfig::new(3, ms(250), ms(8_000)).unwrap());
    channel.push_n(MockReply::Submit(Status::Busy), 3);

    let start = Instant::now();
    let mut transaction = transfer();
    let err = transaction.execute(&client).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { attempts: 3, .. }));
    assert_gap(start.elapsed(), ms(250 + 500));
}

#[tokio::test]
async fn test_rejected_request_names_the_transaction() {
    let (client, channel) = client(2);
    channel.push(MockReply::Rejected(StatusCode::NOT_FOUND));

    let mut transaction = transfer();
    let err = transaction.execute(&client).await.unwrap_err();
    let Error::RequestFailed { ref source, node, .. } = err else {
        panic!("expected a failed request, got {err:?}");
    };
    assert!(matches!(source, transport::TransportError::Failed(StatusCode::NOT_FOUND)));
    assert_eq!(node, channel.calls()[0].node);
    assert!(err.transaction_id().is_some());
    assert_eq!(err.transaction_id(), transaction.transaction_id());
    assert!(err.is_network());
    assert_eq!(channel.calls().len(), 1);
}

#[tokio::test]
async fn test_undecodable_reply_names_the_transaction() {
    let (client, channel) = client(1);
    channel.push(MockReply::Raw(Bytes::from_static(&[0xff; 3])));

    let mut transaction = transfer();
    let err = transaction.execute(&client).await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse { .. }), "{err:?}");
    assert!(err.transaction_id().is_some());
    assert_eq!(err.transaction_id(), transaction.transaction_id());
}

#[tokio::test(start_paused = true)]
async fn test_network_failures_rotate_nodes() {
    let (client, channel) = client(2);
    channel
        .push(MockReply::Unavailable)
        .push(MockReply::Submit(Status::Ok));

    let mut transaction = transfer();
    transaction.set_node_account_ids(node_ids(2)).unwrap();
    let response = transaction.execute(&client).await.unwrap();

    let calls = channel.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].node, AccountId::new(0, 0, 3));
    assert_eq!(calls[1].node, AccountId::new(0, 0, 4));
    assert_eq!(response.node_account_id, AccountId::new(0, 0, 4));
    assert_gap(calls[1].at - calls[0].at, ms(250));
}

#[tokio::test]
async fn test_fatal_precheck_is_not_retried() {
    let (client, channel) = client(2);
    channel.push(MockReply::Submit(Status::InvalidSignature));

    let mut transaction = transfer();
    let err = transaction.execute(&client).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PrecheckRejected {
            status: Status::InvalidSignature,
            ..
        }
    ));
    assert_eq!(err.transaction_id(), transaction.transaction_id());
    assert!(err.is_network());
    assert_eq!(channel.calls().len(), 1);
}

#[tokio::test]
async fn test_large_content_is_chunked_and_sent_in_order() {
    let (client, channel) = client(2);
    let content: Vec<u8> = (0..2_500u32).map(|i| i as u8).collect();
    let mut transaction = Transaction::new(FileAppend::new(FileId::new(0, 0, 150), content.clone()));
    transaction.freeze_with(&client).unwrap();
    assert_eq!(transaction.chunk_count(), 3);

    channel.push_n(MockReply::Submit(Status::Ok), 3);
    let responses = transaction.execute_all(&client).await.unwrap();
    assert_eq!(responses.len(), 3);

    let root = transaction.transaction_id().unwrap();
    let operator = operator_key().public_key();
    let calls = channel.calls();
    assert_eq!(calls.len(), 3);
    let mut reassembled = Vec::new();
    for (index, call) in calls.iter().enumerate() {
        let expected = match index {
            0 => root,
            index => root.with_nonce(index as u32),
        };
        let signed = call.signed();
        assert!(signed.is_signed_by(&operator));
        assert!(signed
            .signatures
            .iter()
            .all(|pair| pair.verify(&signed.body_bytes)));
        let body = call.body();
        assert_eq!(body.transaction_id, expected);
        assert_eq!(responses[index].transaction_id, expected);
        let TransactionData::FileAppend { contents, .. } = body.data else {
            panic!("wrong body");
        };
        reassembled.extend(contents);
    }
    assert_eq!(reassembled, content);

    // Bodies prepared for the node that was not used are signed too.
    for chunk in 0..3 {
        for signed in transaction.signed_transactions(chunk).unwrap() {
            assert_eq!(signed.signatures.len(), 1);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_next_chunk_waits_for_acceptance() {
    let (client, channel) = client(1);
    channel
        .push(MockReply::Submit(Status::Ok))
        .push(MockReply::Submit(Status::Busy))
        .push_n(MockReply::Submit(Status::Ok), 2);

    let mut transaction = Transaction::new(TopicMessageSubmit::new(
        TopicId::new(0, 0, 77),
        vec![1u8; 2_100],
    ));
    transaction.execute_all(&client).await.unwrap();

    let nonces: Vec<_> = channel
        .calls()
        .iter()
        .map(|call| call.body().transaction_id.nonce)
        .collect();
    assert_eq!(nonces, vec![None, Some(1), Some(1), Some(2)]);
}

#[test]
fn test_checksum_mismatch_names_both_checksums_and_network() {
    let (client, channel) = client(1);
    let recipient: AccountId = "0.0.123-rmkykd".parse().unwrap();
    let mut transaction = Transaction::new(
        Transfer::new()
            .add_transfer(payer(), -1)
            .add_transfer(recipient, 1),
    );

    let err = transaction.freeze_with(&client).unwrap_err();
    assert!(matches!(err, Error::ChecksumMismatch(_)));
    let message = err.to_string();
    assert!(message.contains("rmkykd"), "{message}");
    assert!(message.contains("esxsf"), "{message}");
    assert!(message.contains("testnet"), "{message}");
    assert!(!transaction.is_frozen());
    assert!(channel.calls().is_empty());

    let client = client.with_auto_validate_checksums(false);
    transaction.freeze_with(&client).unwrap();
}

#[tokio::test]
async fn test_operator_signature_is_not_duplicated() {
    let (client, channel) = client(1);
    channel.push(MockReply::Submit(Status::Ok));

    let mut transaction = transfer();
    transaction
        .freeze_with(&client)
        .unwrap()
        .sign(operator_key())
        .unwrap();
    transaction.execute(&client).await.unwrap();
    assert_eq!(channel.calls()[0].signed().signatures.len(), 1);
}

#[tokio::test]
async fn test_sealed_transactions_are_sent_as_they_are() {
    let (client, channel) = client(1);
    channel.push(MockReply::Submit(Status::Ok));

    let other = PrivateKey::from_seed(7);
    let mut transaction = transfer();
    transaction
        .freeze_with(&client)
        .unwrap()
        .sign(other.clone())
        .unwrap()
        .seal()
        .unwrap();
    transaction.execute(&client).await.unwrap();

    let signed = channel.calls()[0].signed();
    assert_eq!(signed.signatures.len(), 1);
    assert!(signed.is_signed_by(&other.public_key()));
}

#[tokio::test]
async fn test_expired_generated_id_is_regenerated() {
    let (client, channel) = client(1);
    let client = client.with_execution_config(
        ExecutionConfig::default().with_regenerate_transaction_id(true),
    );
    channel
        .push(MockReply::Submit(Status::TransactionExpired))
        .push(MockReply::Submit(Status::Ok));

    let mut transaction = transfer();
    let response = transaction.execute(&client).await.unwrap();

    let calls = channel.calls();
    assert_eq!(calls.len(), 2);
    let expired = calls[0].body().transaction_id;
    let regenerated = calls[1].body().transaction_id;
    assert_ne!(expired, regenerated);
    assert_eq!(regenerated.payer, payer());
    assert_eq!(response.transaction_id, regenerated);
    assert_eq!(transaction.transaction_id(), Some(regenerated));
    assert!(calls[1].signed().is_signed_by(&operator_key().public_key()));
}

#[tokio::test]
async fn test_expiry_is_fatal_without_regeneration() {
    let (client, channel) = client(1);
    channel.push(MockReply::Submit(Status::TransactionExpired));
    let mut transaction = transfer();
    let err = transaction.execute(&client).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PrecheckRejected {
            status: Status::TransactionExpired,
            ..
        }
    ));

    // A caller-supplied id is never replaced.
    let client = client.with_execution_config(
        ExecutionConfig::default().with_regenerate_transaction_id(true),
    );
    channel.push(MockReply::Submit(Status::TransactionExpired));
    let id = TransactionId::generate(payer());
    let mut transaction = transfer();
    transaction.set_transaction_id(id).unwrap();
    let err = transaction.execute(&client).await.unwrap_err();
    assert!(matches!(
        err,
        Error::PrecheckRejected {
            status: Status::TransactionExpired,
            ..
        }
    ));
    assert_eq!(err.transaction_id(), Some(id));
}

#[tokio::test]
async fn test_regeneration_with_detached_signature_fails() {
    let (client, channel) = client(1);
    let client = client.with_execution_config(
        ExecutionConfig::default().with_regenerate_transaction_id(true),
    );
    channel.push(MockReply::Submit(Status::TransactionExpired));

    let cosigner = PrivateKey::from_seed(9);
    let mut transaction = transfer();
    transaction.freeze_with(&client).unwrap();
    let node = transaction.node_account_ids().unwrap()[0];
    let body = transaction.signed_transactions(0).unwrap()[0]
        .body_bytes
        .clone();
    transaction
        .add_signature(0, node, cosigner.public_key(), cosigner.sign_body(&body))
        .unwrap();

    let err = transaction.execute(&client).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::SignerUnavailable(ref key)) if *key == cosigner.public_key()
    ));
    assert_eq!(channel.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_bounds_the_whole_call() {
    let (client, channel) = client(1);
    let client = client.with_execution_config(
        ExecutionConfig::default()
            .with_request_timeout(Some(Duration::from_secs(5)))
            .with_attempt_timeout(Duration::from_secs(60)),
    );
    channel.push(MockReply::Hang);

    let start = Instant::now();
    let mut transaction = transfer();
    let err = transaction.execute(&client).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded { .. }));
    assert_eq!(err.transaction_id(), transaction.transaction_id());
    assert_gap(start.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_reports_the_regenerated_id() {
    let (client, channel) = client(1);
    let client = client.with_execution_config(
        ExecutionConfig::default()
            .with_regenerate_transaction_id(true)
            .with_request_timeout(Some(Duration::from_secs(30)))
            .with_attempt_timeout(Duration::from_secs(60)),
    );
    channel
        .push(MockReply::Submit(Status::TransactionExpired))
        .push(MockReply::Hang);

    let mut transaction = transfer();
    transaction.freeze_with(&client).unwrap();
    let expired = transaction.transaction_id().unwrap();

    let err = transaction.execute(&client).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded { .. }));
    let in_flight = transaction.transaction_id().unwrap();
    assert_ne!(in_flight, expired);
    assert_eq!(err.transaction_id(), Some(in_flight));
    assert_eq!(channel.calls()[1].body().transaction_id, in_flight);
}

#[tokio::test(start_paused = true)]
async fn test_hung_node_is_abandoned_after_attempt_timeout() {
    let (client, channel) = client(2);
    let client = client.with_execution_config(
        ExecutionConfig::default().with_attempt_timeout(Duration::from_secs(1)),
    );
    channel
        .push(MockReply::Hang)
        .push(MockReply::Submit(Status::Ok));

    let mut transaction = transfer();
    transaction.execute(&client).await.unwrap();

    let calls = channel.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0].node, calls[1].node);
    assert_gap(calls[1].at - calls[0].at, ms(1_250));
}

#[tokio::test(start_paused = true)]
async fn test_pending_receipt_is_polled() {
    let (client, channel) = client(1);
    channel
        .push(MockReply::Submit(Status::Ok))
        .push(receipt(Status::Unknown))
        .push(receipt(Status::Success));

    let mut transaction = transfer();
    let response = transaction.execute(&client).await.unwrap();
    let receipt = response.get_successful_receipt(&client).await.unwrap();
    assert_eq!(receipt.status, Status::Success);

    let calls = channel.calls();
    assert_eq!(calls.len(), 3);
    let QueryData::TransactionReceipt { transaction_id } = calls[1].query().data else {
        panic!("expected a receipt query");
    };
    assert_eq!(transaction_id, response.transaction_id);
    assert_eq!(calls[1].node, response.node_account_id);
    assert_gap(calls[2].at - calls[1].at, ms(250));
}

#[tokio::test(start_paused = true)]
async fn test_receipt_polling_keeps_the_node_healthy() {
    let (client, channel) = client(1);
    channel
        .push(MockReply::Submit(Status::Ok))
        .push(MockReply::Query(QueryResponse {
            precheck: Status::ReceiptNotFound,
            cost: 0,
            answer: None,
        }))
        .push_n(receipt(Status::Unknown), 3)
        .push(receipt(Status::Success));

    let mut transaction = transfer();
    let response = transaction.execute(&client).await.unwrap();
    response.get_successful_receipt(&client).await.unwrap();
    assert_eq!(channel.calls().len(), 6);

    let node = client.network().node(&response.node_account_id).unwrap();
    assert_eq!(node.health().delay(), MIN_BACKOFF);
    assert!(node.health().is_healthy());
}

#[tokio::test]
async fn test_failed_receipt_is_returned_or_raised() {
    let (client, channel) = client(1);
    channel
        .push(MockReply::Submit(Status::Ok))
        .push(receipt(Status::InsufficientPayerBalance))
        .push(receipt(Status::InsufficientPayerBalance));

    let mut transaction = transfer();
    let response = transaction.execute(&client).await.unwrap();
    let receipt = response.get_receipt(&client).await.unwrap();
    assert_eq!(receipt.status, Status::InsufficientPayerBalance);

    let err = response.get_successful_receipt(&client).await.unwrap_err();
    assert!(matches!(
        err,
        Error::ReceiptStatus {
            status: Status::InsufficientPayerBalance,
            ..
        }
    ));
    assert_eq!(err.transaction_id(), Some(response.transaction_id));
}

#[tokio::test]
async fn test_throttled_receipt_resubmits_once() {
    let (client, channel) = client(1);
    channel
        .push(MockReply::Submit(Status::Ok))
        .push(receipt(Status::ThrottledAtConsensus))
        .push(MockReply::Submit(Status::Ok))
        .push(receipt(Status::Success));

    let mut transaction = transfer();
    let response = transaction.execute(&client).await.unwrap();
    let receipt = response.get_receipt(&client).await.unwrap();
    assert_eq!(receipt.status, Status::Success);

    let calls = channel.calls();
    assert_eq!(calls.len(), 4);
    let resubmitted = calls[2].signed();
    let resubmitted_id = resubmitted.body().unwrap().transaction_id;
    assert_ne!(resubmitted_id, response.transaction_id);
    assert!(resubmitted.is_signed_by(&operator_key().public_key()));
    let QueryData::TransactionReceipt { transaction_id } = calls[3].query().data else {
        panic!("expected a receipt query");
    };
    assert_eq!(transaction_id, resubmitted_id);
}

#[tokio::test]
async fn test_throttled_twice_is_an_error() {
    let (client, channel) = client(1);
    channel
        .push(MockReply::Submit(Status::Ok))
        .push(receipt(Status::ThrottledAtConsensus))
        .push(MockReply::Submit(Status::Ok))
        .push(receipt(Status::ThrottledAtConsensus));

    let id = TransactionId::generate(payer());
    let mut transaction = transfer();
    transaction.set_transaction_id(id).unwrap();
    let response = transaction.execute(&client).await.unwrap();
    let err = response.get_receipt(&client).await.unwrap_err();

    // Caller-supplied ids are resubmitted unchanged.
    assert!(matches!(err, Error::ReceiptThrottled { transaction_id } if transaction_id == id));
    let calls = channel.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].request, calls[2].request);
}

#[tokio::test]
async fn test_free_query_sends_no_payment() {
    let (client, channel) = client(1);
    let balance = AccountBalance {
        account_id: payer(),
        balance: 1_000,
    };
    channel.push(MockReply::answer(QueryAnswer::Balance(balance)));

    let answer = Query::new(AccountBalanceQuery::new(payer()))
        .execute(&client)
        .await
        .unwrap();
    assert_eq!(answer, balance);

    let request = channel.calls()[0].query();
    assert_eq!(request.header.payment, None);
    assert_eq!(request.header.response_type, ResponseType::AnswerOnly);
}

#[tokio::test]
async fn test_paid_query_fetches_cost_and_pays_the_answering_node() {
    let (client, channel) = client(1);
    let info = AccountInfo {
        account_id: payer(),
        key: operator_key().public_key(),
        balance: 42,
        deleted: false,
        memo: "operator".to_string(),
    };
    channel
        .push(MockReply::cost(25))
        .push(MockReply::answer(QueryAnswer::Info(info.clone())));

    let answer = Query::new(AccountInfoQuery::new(payer()))
        .execute(&client)
        .await
        .unwrap();
    assert_eq!(answer, info);

    let calls = channel.calls();
    assert_eq!(calls.len(), 2);
    let cost = calls[0].query();
    assert_eq!(cost.header.response_type, ResponseType::CostAnswer);
    assert_eq!(cost.header.payment, None);

    let payment = calls[1].query().header.payment.unwrap();
    assert!(payment.is_signed_by(&operator_key().public_key()));
    let body = payment.body().unwrap();
    assert_eq!(body.node_account_id, calls[1].node);
    assert_eq!(
        body.data,
        TransactionData::Transfer {
            transfers: vec![
                AccountAmount {
                    account_id: payer(),
                    amount: -25
                },
                AccountAmount {
                    account_id: calls[1].node,
                    amount: 25
                },
            ]
        }
    );
}

#[tokio::test]
async fn test_paid_query_respects_max_payment() {
    let (client, channel) = client(1);
    let client = client.with_max_query_payment(10);
    channel.push(MockReply::cost(25));

    let err = Query::new(AccountInfoQuery::new(payer()))
        .execute(&client)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::MaxQueryPaymentExceeded { cost: 25, max: 10 }
    ));
    assert_eq!(channel.calls().len(), 1);

    let (client, channel) = mock_client(1);
    let err = Query::new(AccountInfoQuery::new(payer()))
        .execute(&client)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::NoOperator)
    ));
    assert!(channel.calls().is_empty());
}

#[test]
fn test_interchange_round_trip_preserves_chunks_and_signatures() {
    let (client, _) = client(2);
    let mut transaction = Transaction::new(TopicMessageSubmit::new(
        TopicId::new(0, 0, 77),
        vec![9u8; 1_500],
    ));
    transaction
        .freeze_with(&client)
        .unwrap()
        .sign(PrivateKey::from_seed(1))
        .unwrap();

    let bytes = transaction.to_bytes().unwrap();
    let mut decoded = AnyTransaction::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.kind(), TransactionKind::TopicMessageSubmit);
    assert_eq!(decoded.chunk_count(), 2);
    assert_eq!(decoded.transaction_id(), transaction.transaction_id());
    decoded.sign(PrivateKey::from_seed(2)).unwrap();

    let AnyTransaction::TopicMessageSubmit(decoded) = decoded else {
        panic!("wrong kind");
    };
    assert_eq!(decoded.data(), transaction.data());
    for chunk in 0..2 {
        let before = transaction.signed_transactions(chunk).unwrap();
        let after = decoded.signed_transactions(chunk).unwrap();
        assert_eq!(before.len(), after.len());
        for (before, after) in before.iter().zip(after) {
            assert_eq!(before.body_bytes, after.body_bytes);
            assert_eq!(after.signatures.len(), 2);
            assert_eq!(after.signatures[0], before.signatures[0]);
        }
    }

    assert!(matches!(transfer().to_bytes(), Err(Error::NotFrozen)));
}

fn round_trip(transaction: impl Into<AnyTransaction>) -> AnyTransaction {
    let mut transaction: AnyTransaction = transaction.into();
    transaction.sign(PrivateKey::from_seed(3)).unwrap();
    let bytes = transaction.to_bytes().unwrap();
    let decoded = AnyTransaction::from_bytes(&bytes).unwrap();
    assert_eq!(decoded.kind(), transaction.kind());
    assert_eq!(decoded.transaction_id(), transaction.transaction_id());
    assert_eq!(decoded.chunk_count(), transaction.chunk_count());
    assert_eq!(decoded.to_bytes().unwrap(), bytes);
    decoded
}

#[test]
fn test_interchange_round_trip_for_every_kind() {
    let (client, _) = client(2);

    let data = AccountCreate::new(PrivateKey::from_seed(4).public_key())
        .with_initial_balance(500)
        .with_memo("new account");
    let mut transaction = Transaction::new(data.clone());
    transaction.freeze_with(&client).unwrap();
    let AnyTransaction::AccountCreate(decoded) = round_trip(transaction) else {
        panic!("wrong kind");
    };
    assert_eq!(decoded.data(), &data);

    let content: Vec<u8> = (0..2_100u32).map(|i| (i % 251) as u8).collect();
    let data = FileAppend::new(FileId::new(0, 0, 150), content);
    let mut transaction = Transaction::new(data.clone());
    transaction.freeze_with(&client).unwrap();
    assert_eq!(transaction.chunk_count(), 3);
    let AnyTransaction::FileAppend(decoded) = round_trip(transaction) else {
        panic!("wrong kind");
    };
    assert_eq!(decoded.data(), &data);

    let mut inner = transfer();
    inner.set_memo("later").unwrap();
    let mut transaction = inner.schedule().unwrap();
    transaction.freeze_with(&client).unwrap();
    let data = transaction.data().clone();
    let AnyTransaction::ScheduleCreate(decoded) = round_trip(transaction) else {
        panic!("wrong kind");
    };
    assert_eq!(decoded.data(), &data);

    let data = ScheduleSign::new(ScheduleId::new(0, 0, 900));
    let mut transaction = Transaction::new(data);
    transaction.freeze_with(&client).unwrap();
    let AnyTransaction::ScheduleSign(decoded) = round_trip(transaction) else {
        panic!("wrong kind");
    };
    assert_eq!(decoded.data(), &data);

    let mut transaction = transfer();
    transaction.freeze_with(&client).unwrap();
    let data = transaction.data().clone();
    let AnyTransaction::Transfer(decoded) = round_trip(transaction) else {
        panic!("wrong kind");
    };
    assert_eq!(decoded.data(), &data);
}

#[test]
fn test_interchange_rejects_mismatched_kind() {
    let (client, _) = client(1);
    let mut transaction = transfer();
    transaction.freeze_with(&client).unwrap();
    let mut bytes = transaction.to_bytes().unwrap();
    bytes[0] = TransactionKind::FileAppend as u8;
    assert!(matches!(
        AnyTransaction::from_bytes(&bytes),
        Err(Error::InvalidData(_))
    ));
}

async fn serve_router(router: Router) -> (String, tokio::task::JoinHandle<()>) {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let actual_addr = listener.local_addr().unwrap();
    let base_url = format!("http://{actual_addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .unwrap();
    });

    sleep(ms(50)).await;
    (base_url, handle)
}

#[tokio::test]
async fn test_transfer_over_http() {
    let signed_requests = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/crypto/cryptoTransfer",
            post(
                |State(signed_requests): State<Arc<AtomicUsize>>, body: axum::body::Bytes| async move {
                    let signed = SignedTransaction::decode(body.as_ref()).unwrap();
                    if !signed.signatures.is_empty() {
                        signed_requests.fetch_add(1, Ordering::SeqCst);
                    }
                    SubmitResponse {
                        precheck: Status::Ok,
                        cost: 0,
                    }
                    .encode()
                    .to_vec()
                },
            ),
        )
        .with_state(signed_requests.clone());
    let (base_url, handle) = serve_router(router).await;

    let client = Client::for_nodes(
        LedgerId::Testnet,
        [(AccountId::new(0, 0, 3), base_url.as_str())],
    )
    .unwrap()
    .with_operator(payer(), Arc::new(operator_key()));
    let mut transaction = transfer();
    let response = transaction.execute(&client).await.unwrap();
    assert_eq!(response.node_account_id, AccountId::new(0, 0, 3));
    assert_eq!(signed_requests.load(Ordering::SeqCst), 1);

    handle.abort();
}
