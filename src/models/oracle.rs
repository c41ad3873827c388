use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Address;

/// Flight status codes understood by the FlightSuretyApp contract.
///
/// The discriminant is the on-chain code, always a multiple of ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum FlightStatus {
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0} is not a valid flight status code")]
pub struct InvalidStatusCode(pub u8);

impl FlightStatus {
    pub const ALL: [FlightStatus; 6] = [
        FlightStatus::Unknown,
        FlightStatus::OnTime,
        FlightStatus::LateAirline,
        FlightStatus::LateWeather,
        FlightStatus::LateTechnical,
        FlightStatus::LateOther,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<FlightStatus> for u8 {
    fn from(status: FlightStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for FlightStatus {
    type Error = InvalidStatusCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        FlightStatus::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(InvalidStatusCode(code))
    }
}

/// A simulated oracle registered with the app contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleIdentity {
    /// Position of the oracle's address in the candidate list
    pub id: usize,
    pub address: Address,
    /// Index buckets assigned by the contract at registration
    pub indices: BTreeSet<u8>,
    pub registered_at: DateTime<Utc>,
}

impl OracleIdentity {
    pub fn holds(&self, index: u8) -> bool {
        self.indices.contains(&index)
    }
}

/// Airline, flight and departure timestamp. Opaque to the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightKey {
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
}

/// `OracleRequest` event raised by the app contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub index: u8,
    pub flight: FlightKey,
    pub block_number: Option<u64>,
}

/// A single oracle's answer to a status request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleResponse {
    pub oracle: Address,
    pub index: u8,
    pub flight: FlightKey,
    pub status: FlightStatus,
}
