//! Client for the FlightSuretyApp contract's oracle interface

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::debug;

use super::event_monitoring_service::{FromBlock, LogPoller};
use super::rpc_client::{RpcClient, RpcError, TransactionReceipt, TransactionRequest};
use crate::abi::{self, AbiError};
use crate::models::oracle::{OracleResponse, StatusRequest};
use crate::models::Address;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("abi decoding failed: {0}")]
    Abi(#[from] AbiError),
    #[error("no indices assigned to oracle {0}")]
    NoIndices(Address),
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },
    #[error("no receipt for transaction {tx_hash}")]
    ReceiptTimeout { tx_hash: String },
}

/// How long a send waits for its transaction to be mined.
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

pub type StatusRequestStream = BoxStream<'static, Result<StatusRequest, ContractError>>;

/// The calls the oracle simulator makes against the app contract.
#[async_trait]
pub trait FlightSuretyApp: Send + Sync {
    /// Current per-oracle registration fee in wei.
    async fn registration_fee(&self) -> Result<u128, ContractError>;

    /// Sends `registerOracle()` paying `fee` and waits for it to be mined.
    async fn register_oracle(&self, from: Address, fee: u128) -> Result<(), ContractError>;

    async fn assigned_indices(&self, from: Address) -> Result<BTreeSet<u8>, ContractError>;

    /// Stream of `OracleRequest` events starting at `from`. Logs that fail to
    /// decode are yielded as errors so the consumer can skip them.
    async fn subscribe_status_requests(&self, from: FromBlock) -> Result<StatusRequestStream, ContractError>;

    /// Sends `submitOracleResponse` from `response.oracle` and waits for it to
    /// be mined.
    async fn submit_oracle_response(&self, response: &OracleResponse) -> Result<(), ContractError>;
}

pub struct RpcFlightSuretyApp {
    rpc: RpcClient,
    address: Address,
    gas: u64,
    poll_interval: Duration,
}

impl RpcFlightSuretyApp {
    pub fn new(rpc: RpcClient, address: Address, gas: u64, poll_interval: Duration) -> Self {
        Self {
            rpc,
            address,
            gas,
            poll_interval,
        }
    }

    /// Sends `tx` and waits until it is mined. A receipt with a failed status
    /// is reported as [`ContractError::Reverted`].
    async fn send_and_confirm(&self, tx: &TransactionRequest) -> Result<String, ContractError> {
        let tx_hash = self.rpc.send_transaction(tx).await?;
        let receipt = timeout(RECEIPT_TIMEOUT, self.wait_for_receipt(&tx_hash))
            .await
            .map_err(|_| ContractError::ReceiptTimeout {
                tx_hash: tx_hash.clone(),
            })??;

        if receipt.reverted() {
            return Err(ContractError::Reverted { tx_hash });
        }
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt, RpcError> {
        loop {
            if let Some(receipt) = self.rpc.transaction_receipt(tx_hash).await? {
                return Ok(receipt);
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl FlightSuretyApp for RpcFlightSuretyApp {
    async fn registration_fee(&self) -> Result<u128, ContractError> {
        let data = abi::encode_call(abi::REGISTRATION_FEE_SELECTOR, &[]);
        let result = self.rpc.call(&TransactionRequest::new(self.address, &data)).await?;
        Ok(abi::Decoder::new(&result).uint(0)?)
    }

    async fn register_oracle(&self, from: Address, fee: u128) -> Result<(), ContractError> {
        let data = abi::encode_call(abi::REGISTER_ORACLE_SELECTOR, &[]);
        let tx = TransactionRequest::new(self.address, &data)
            .from(from)
            .value(fee)
            .gas(self.gas);
        let tx_hash = self.send_and_confirm(&tx).await?;
        debug!(oracle = %from, %tx_hash, "registerOracle mined");
        Ok(())
    }

    async fn assigned_indices(&self, from: Address) -> Result<BTreeSet<u8>, ContractError> {
        let data = abi::encode_call(abi::GET_MY_INDEXES_SELECTOR, &[]);
        let tx = TransactionRequest::new(self.address, &data).from(from);
        let result = self.rpc.call(&tx).await?;
        Ok(abi::decode_indices(&result)?.into_iter().collect())
    }

    async fn subscribe_status_requests(&self, from: FromBlock) -> Result<StatusRequestStream, ContractError> {
        let poller = LogPoller::new(
            self.rpc.clone(),
            self.address,
            Some(abi::ORACLE_REQUEST_TOPIC.to_string()),
            from,
        )
        .await?;

        let requests = poller.into_stream(self.poll_interval).map(|log| -> Result<_, ContractError> {
            let data = abi::from_hex(&log.data)?;
            Ok(abi::decode_oracle_request(&data, log.block())?)
        });

        Ok(requests.boxed())
    }

    async fn submit_oracle_response(&self, response: &OracleResponse) -> Result<(), ContractError> {
        let data = abi::encode_oracle_response(response.index, &response.flight, response.status.code());
        let tx = TransactionRequest::new(self.address, &data)
            .from(response.oracle)
            .gas(self.gas);
        let tx_hash = self.send_and_confirm(&tx).await?;
        debug!(oracle = %response.oracle, %tx_hash, "submitOracleResponse mined");
        Ok(())
    }
}
