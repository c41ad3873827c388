//! FlightSurety oracle simulator
//!
//! Registers a pool of simulated oracles with the FlightSuretyApp contract and
//! answers its `OracleRequest` events with synthetic flight statuses.

pub mod abi;
pub mod app_state;
pub mod config;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
