#![allow(dead_code)]

pub mod fake_node;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use flightsurety_oracles::models::oracle::{FlightKey, OracleResponse, StatusRequest};
use flightsurety_oracles::models::Address;
use flightsurety_oracles::services::event_monitoring_service::FromBlock;
use flightsurety_oracles::services::flight_surety_app::{
    ContractError, FlightSuretyApp, StatusRequestStream,
};
use flightsurety_oracles::services::rpc_client::RpcError;

pub const FEE: u128 = 1_000_000_000_000_000_000;

pub type RequestFeed = mpsc::UnboundedSender<Result<StatusRequest, ContractError>>;

pub fn address(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

pub fn request(index: u8) -> StatusRequest {
    StatusRequest {
        index,
        flight: FlightKey {
            airline: address(0xaa),
            flight: "ND1309".to_string(),
            timestamp: 1_609_459_200,
        },
        block_number: Some(100),
    }
}

pub fn simulated_failure() -> ContractError {
    ContractError::Rpc(RpcError::Node {
        code: -32000,
        message: "simulated network failure".to_string(),
    })
}

/// In-memory FlightSuretyApp that records every call.
#[derive(Default)]
pub struct MockFlightSuretyApp {
    indices: HashMap<Address, BTreeSet<u8>>,
    failing_registrations: HashSet<Address>,
    failing_submissions: HashSet<Address>,
    fee_queries: AtomicUsize,
    registrations: Mutex<Vec<(Address, u128)>>,
    submissions: Mutex<Vec<OracleResponse>>,
    requests: Mutex<Option<mpsc::UnboundedReceiver<Result<StatusRequest, ContractError>>>>,
}

impl MockFlightSuretyApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indices(mut self, oracle: Address, indices: &[u8]) -> Self {
        self.indices.insert(oracle, indices.iter().copied().collect());
        self
    }

    pub fn failing_registration(mut self, oracle: Address) -> Self {
        self.failing_registrations.insert(oracle);
        self
    }

    pub fn failing_submission(mut self, oracle: Address) -> Self {
        self.failing_submissions.insert(oracle);
        self
    }

    /// Sender feeding the next subscription.
    pub fn request_feed(&self) -> RequestFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.requests.lock().unwrap() = Some(rx);
        tx
    }

    pub fn fee_queries(&self) -> usize {
        self.fee_queries.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> Vec<(Address, u128)> {
        self.registrations.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<OracleResponse> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submitters(&self) -> Vec<Address> {
        let mut submitters: Vec<Address> = self.submissions().iter().map(|r| r.oracle).collect();
        submitters.sort();
        submitters
    }
}

#[async_trait]
impl FlightSuretyApp for MockFlightSuretyApp {
    async fn registration_fee(&self) -> Result<u128, ContractError> {
        self.fee_queries.fetch_add(1, Ordering::SeqCst);
        Ok(FEE)
    }

    async fn register_oracle(&self, from: Address, fee: u128) -> Result<(), ContractError> {
        if self.failing_registrations.contains(&from) {
            return Err(simulated_failure());
        }
        self.registrations.lock().unwrap().push((from, fee));
        Ok(())
    }

    async fn assigned_indices(&self, from: Address) -> Result<BTreeSet<u8>, ContractError> {
        // unknown oracles hold no indices
        Ok(self.indices.get(&from).cloned().unwrap_or_default())
    }

    async fn subscribe_status_requests(&self, _from: FromBlock) -> Result<StatusRequestStream, ContractError> {
        let Some(rx) = self.requests.lock().unwrap().take() else {
            return Ok(stream::empty().boxed());
        };
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed())
    }

    async fn submit_oracle_response(&self, response: &OracleResponse) -> Result<(), ContractError> {
        if self.failing_submissions.contains(&response.oracle) {
            return Err(simulated_failure());
        }
        self.submissions.lock().unwrap().push(response.clone());
        Ok(())
    }
}
