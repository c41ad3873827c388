mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{json, Value};

use common::fake_node::FakeNode;
use common::{address, request, FEE};
use flightsurety_oracles::abi::ORACLE_REQUEST_TOPIC;
use flightsurety_oracles::models::oracle::{FlightStatus, OracleResponse};
use flightsurety_oracles::services::event_monitoring_service::FromBlock;
use flightsurety_oracles::services::flight_surety_app::{
    ContractError, FlightSuretyApp, RpcFlightSuretyApp,
};
use flightsurety_oracles::services::oracle_service::bootstrap;
use flightsurety_oracles::services::rpc_client::RpcClient;

const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";
const REVERTED_TX_HASH: &str = "0x9a0bc1fbd1a1a6c8e1c2b4a96f6e3a4c2e0b1f1d1c0a9e8d7c6b5a4f3e2d1c0b";

fn contract(node: &FakeNode) -> RpcFlightSuretyApp {
    RpcFlightSuretyApp::new(
        RpcClient::new(node.url.clone()),
        address(0xcc),
        4_712_388,
        Duration::from_millis(10),
    )
}

fn receipt(tx_hash: &str, status: &str) -> Value {
    json!({ "transactionHash": tx_hash, "blockNumber": "0x10", "status": status })
}

fn response() -> OracleResponse {
    OracleResponse {
        oracle: address(1),
        index: 4,
        flight: request(4).flight,
        status: FlightStatus::LateAirline,
    }
}

/// Mines every sent transaction with `status`, after `pending_lookups`
/// receipt queries that find nothing.
async fn mining_node(status: &'static str, pending_lookups: usize) -> FakeNode {
    let lookups = AtomicUsize::new(0);
    FakeNode::start(move |method, _params| match method {
        "eth_sendTransaction" => Ok(json!(TX_HASH)),
        "eth_getTransactionReceipt" => {
            if lookups.fetch_add(1, Ordering::SeqCst) < pending_lookups {
                Ok(Value::Null)
            } else {
                Ok(receipt(TX_HASH, status))
            }
        }
        other => Err(format!("unexpected method {other}")),
    })
    .await
}

#[tokio::test]
async fn reverted_registration_is_an_error() {
    let node = mining_node("0x0", 0).await;

    let result = contract(&node).register_oracle(address(1), FEE).await;

    match result {
        Err(ContractError::Reverted { tx_hash }) => assert_eq!(tx_hash, TX_HASH),
        other => panic!("expected revert, got {other:?}"),
    }
    assert_eq!(node.methods(), vec!["eth_sendTransaction", "eth_getTransactionReceipt"]);
}

#[tokio::test]
async fn reverted_submission_is_an_error() {
    let node = mining_node("0x0", 0).await;

    let result = contract(&node).submit_oracle_response(&response()).await;

    assert!(matches!(result, Err(ContractError::Reverted { .. })));
    assert_eq!(node.params_of("eth_getTransactionReceipt"), vec![json!([TX_HASH])]);
}

#[tokio::test]
async fn send_waits_until_transaction_is_mined() {
    let node = mining_node("0x1", 2).await;

    contract(&node).register_oracle(address(1), FEE).await.unwrap();

    assert_eq!(node.params_of("eth_getTransactionReceipt").len(), 3);
    let sent = node.params_of("eth_sendTransaction");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0][0]["from"], address(1).to_string());
    assert_eq!(sent[0][0]["value"], "0xde0b6b3a7640000");
    assert_eq!(sent[0][0]["data"], "0x339d2590");
}

#[tokio::test]
async fn bootstrap_skips_oracle_whose_registration_reverted() {
    let reverted_oracle = address(2).to_string();
    let indices: String = [1u8, 4, 7].iter().map(|i| format!("{i:064x}")).collect();
    let node = FakeNode::start(move |method, params| {
        let tx = &params[0];
        match method {
            "eth_call" if tx["data"] == "0x64b4f751" => Ok(json!(format!("0x{FEE:064x}"))),
            "eth_call" if tx["data"] == "0x5f1cc0e6" => Ok(json!(format!("0x{indices}"))),
            "eth_sendTransaction" if tx["from"] == reverted_oracle.as_str() => Ok(json!(REVERTED_TX_HASH)),
            "eth_sendTransaction" => Ok(json!(TX_HASH)),
            "eth_getTransactionReceipt" if tx == REVERTED_TX_HASH => Ok(receipt(REVERTED_TX_HASH, "0x0")),
            "eth_getTransactionReceipt" => Ok(receipt(TX_HASH, "0x1")),
            other => Err(format!("unexpected method {other}")),
        }
    })
    .await;

    let registry = bootstrap(&contract(&node), 3, &[address(1), address(2), address(3)]).await;

    let ids: Vec<usize> = registry.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![0, 2]);
    // the reverted oracle's indices are never queried
    assert_eq!(node.params_of("eth_call").len(), 3 + 2);
}

#[tokio::test]
async fn subscription_decodes_oracle_request_logs() {
    let data = [
        "0000000000000000000000000000000000000000000000000000000000000007",
        "0000000000000000000000009eb378a3413635d6da45e027451a8c8a96b191fc",
        "0000000000000000000000000000000000000000000000000000000000000080",
        "000000000000000000000000000000000000000000000000000000005fee6600",
        "0000000000000000000000000000000000000000000000000000000000000006",
        "4e44313330390000000000000000000000000000000000000000000000000000",
    ]
    .concat();
    let heads = AtomicUsize::new(0);
    let node = FakeNode::start(move |method, _params| match method {
        "eth_blockNumber" => {
            let head = if heads.fetch_add(1, Ordering::SeqCst) == 0 { "0x10" } else { "0x11" };
            Ok(json!(head))
        }
        "eth_getLogs" => Ok(json!([{
            "topics": [ORACLE_REQUEST_TOPIC],
            "data": format!("0x{data}"),
            "blockNumber": "0x11",
            "transactionHash": TX_HASH
        }])),
        other => Err(format!("unexpected method {other}")),
    })
    .await;

    let mut requests = contract(&node)
        .subscribe_status_requests(FromBlock::Latest)
        .await
        .unwrap();
    let request = requests.next().await.unwrap().unwrap();

    assert_eq!(request.index, 7);
    assert_eq!(request.flight.flight, "ND1309");
    assert_eq!(request.flight.timestamp, 1_609_459_200);
    assert_eq!(request.block_number, Some(0x11));

    let filter = &node.params_of("eth_getLogs")[0][0];
    assert_eq!(filter["address"], address(0xcc).to_string());
    assert_eq!(filter["topics"], json!([ORACLE_REQUEST_TOPIC]));
    assert_eq!(filter["fromBlock"], "0x11");
}
