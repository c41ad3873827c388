//! Simulated oracle pool: registration and status-request responder

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use rand::Rng;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::flight_surety_app::{ContractError, FlightSuretyApp, StatusRequestStream};
use crate::models::oracle::{FlightStatus, OracleIdentity, OracleResponse, StatusRequest};
use crate::models::Address;

/// Oracle identities in registration order. Built once by [`bootstrap`] and
/// never modified afterwards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OracleRegistry {
    oracles: Vec<OracleIdentity>,
}

impl OracleRegistry {
    pub fn new(oracles: Vec<OracleIdentity>) -> Self {
        Self { oracles }
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OracleIdentity> {
        self.oracles.iter()
    }

    /// Oracles holding `index`, in registration order.
    pub fn eligible(&self, index: u8) -> impl Iterator<Item = &OracleIdentity> {
        self.oracles.iter().filter(move |oracle| oracle.holds(index))
    }

    pub fn snapshot(&self) -> Vec<OracleIdentity> {
        self.oracles.clone()
    }
}

/// How responding oracles pick the status they report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusStrategy {
    #[default]
    Random,
    Fixed(FlightStatus),
}

/// Uniform over every defined status code.
pub fn generate_synthetic_status<R: Rng + ?Sized>(rng: &mut R) -> FlightStatus {
    FlightStatus::ALL[rng.gen_range(0..FlightStatus::ALL.len())]
}

/// Registers `pool_size` oracles, one per candidate address, in order.
///
/// A failure for one candidate is logged and that candidate is skipped; the
/// remaining candidates are still attempted and nothing is rolled back. The
/// fee is queried fresh for every candidate.
pub async fn bootstrap(
    contract: &dyn FlightSuretyApp,
    pool_size: usize,
    candidates: &[Address],
) -> OracleRegistry {
    if candidates.len() < pool_size {
        warn!(
            pool_size,
            candidates = candidates.len(),
            "fewer oracle candidates than pool size; registering what is available"
        );
    }

    let mut oracles = Vec::with_capacity(pool_size);
    for (id, address) in candidates.iter().copied().enumerate().take(pool_size) {
        match register(contract, id, address).await {
            Ok(oracle) => {
                info!(id, oracle = %address, indices = ?oracle.indices, "oracle registered");
                oracles.push(oracle);
            }
            Err(err) => {
                error!(id, oracle = %address, error = %err, "oracle registration failed; skipping");
            }
        }
    }

    info!(registered = oracles.len(), pool_size, "oracle bootstrap complete");
    OracleRegistry::new(oracles)
}

async fn register(
    contract: &dyn FlightSuretyApp,
    id: usize,
    address: Address,
) -> Result<OracleIdentity, ContractError> {
    let fee = contract.registration_fee().await?;
    contract.register_oracle(address, fee).await?;
    let indices = contract.assigned_indices(address).await?;
    // every registered oracle must hold at least one index
    if indices.is_empty() {
        return Err(ContractError::NoIndices(address));
    }

    Ok(OracleIdentity {
        id,
        address,
        indices,
        registered_at: Utc::now(),
    })
}

/// Answers status requests on behalf of every registered oracle.
pub struct OracleService {
    contract: Arc<dyn FlightSuretyApp>,
    registry: Arc<OracleRegistry>,
    strategy: StatusStrategy,
}

impl OracleService {
    pub fn new(
        contract: Arc<dyn FlightSuretyApp>,
        registry: Arc<OracleRegistry>,
        strategy: StatusStrategy,
    ) -> Self {
        Self {
            contract,
            registry,
            strategy,
        }
    }

    pub fn contract(&self) -> Arc<dyn FlightSuretyApp> {
        self.contract.clone()
    }

    fn next_status(&self) -> FlightStatus {
        match self.strategy {
            StatusStrategy::Random => generate_synthetic_status(&mut rand::thread_rng()),
            StatusStrategy::Fixed(status) => status,
        }
    }

    /// Spawns one submission per oracle holding `request.index`.
    ///
    /// Submissions run independently; the returned handles may be awaited or
    /// dropped. Handling the same request twice submits twice.
    pub fn on_status_request(&self, request: &StatusRequest) -> Vec<JoinHandle<()>> {
        let request_id = Uuid::new_v4();
        info!(
            %request_id,
            index = request.index,
            airline = %request.flight.airline,
            flight = %request.flight.flight,
            timestamp = request.flight.timestamp,
            block = ?request.block_number,
            "oracle request received"
        );

        self.registry
            .eligible(request.index)
            .map(|oracle| {
                let response = OracleResponse {
                    oracle: oracle.address,
                    index: request.index,
                    flight: request.flight.clone(),
                    status: self.next_status(),
                };
                info!(
                    %request_id,
                    oracle_id = oracle.id,
                    oracle = %oracle.address,
                    status = response.status.code(),
                    "oracle responding"
                );
                tokio::spawn(submit_response(self.contract.clone(), response, request_id))
            })
            .collect()
    }

    /// Handles requests until the stream ends. Undecodable events are skipped.
    pub async fn serve(&self, mut requests: StatusRequestStream) {
        info!(oracles = self.registry.len(), "oracle responder serving");

        while let Some(next) = requests.next().await {
            match next {
                Ok(request) => {
                    self.on_status_request(&request);
                }
                Err(err) => warn!(error = %err, "skipping malformed oracle request"),
            }
        }

        warn!("oracle request stream ended");
    }
}

async fn submit_response(contract: Arc<dyn FlightSuretyApp>, response: OracleResponse, request_id: Uuid) {
    match contract.submit_oracle_response(&response).await {
        Ok(()) => info!(%request_id, oracle = %response.oracle, "oracle response submitted"),
        Err(err) => warn!(
            %request_id,
            oracle = %response.oracle,
            error = %err,
            "oracle response submission failed"
        ),
    }
}
