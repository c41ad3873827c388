//! Chain-facing services for the oracle simulator

pub mod event_monitoring_service;
pub mod flight_surety_app;
pub mod oracle_service;
pub mod rpc_client;
pub mod supervisor;
