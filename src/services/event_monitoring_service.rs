//! Block-range log polling and the FlightSuretyData event logger

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::stream::{self, Stream, StreamExt};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::rpc_client::{quantity, Log, LogFilter, RpcClient, RpcError};
use crate::models::Address;

/// Upper bound on the number of blocks requested per `eth_getLogs` call.
const MAX_BLOCK_RANGE: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromBlock {
    /// Only blocks mined after the subscription was opened
    Latest,
    Number(u64),
}

/// Block-range cursor over a contract's logs.
pub struct LogPoller {
    rpc: RpcClient,
    address: Address,
    topic: Option<String>,
    next_block: u64,
}

impl LogPoller {
    pub async fn new(
        rpc: RpcClient,
        address: Address,
        topic: Option<String>,
        from: FromBlock,
    ) -> Result<Self, RpcError> {
        let next_block = match from {
            FromBlock::Latest => rpc.block_number().await?.saturating_add(1),
            FromBlock::Number(block) => block,
        };

        Ok(Self {
            rpc,
            address,
            topic,
            next_block,
        })
    }

    pub fn next_block(&self) -> u64 {
        self.next_block
    }

    /// Fetches logs for the next block range. The cursor only moves when the
    /// fetch succeeds.
    pub async fn poll_once(&mut self) -> Result<Vec<Log>, RpcError> {
        let head = self.rpc.block_number().await?;
        let Some((from_block, to_block)) = next_range(self.next_block, head) else {
            return Ok(Vec::new());
        };

        let filter = LogFilter {
            address: self.address,
            topics: self.topic.clone().map(|topic| vec![topic]),
            from_block: quantity(from_block.into()),
            to_block: quantity(to_block.into()),
        };
        let logs = self.rpc.get_logs(&filter).await?;

        self.next_block = to_block + 1;
        debug!(
            address = %self.address,
            from_block,
            to_block,
            logs = logs.len(),
            "log poll complete"
        );

        Ok(logs)
    }

    /// Turns the poller into an endless stream of logs, sleeping `interval`
    /// whenever it has caught up with the chain head or a poll fails.
    pub fn into_stream(self, interval: Duration) -> impl Stream<Item = Log> + Send + 'static {
        stream::unfold(
            (self, VecDeque::new()),
            move |(mut poller, mut pending)| async move {
                loop {
                    if let Some(log) = pending.pop_front() {
                        return Some((log, (poller, pending)));
                    }

                    match poller.poll_once().await {
                        Ok(logs) if !logs.is_empty() => pending.extend(logs),
                        Ok(_) => sleep(interval).await,
                        Err(err) => {
                            warn!(error = %err, next_block = poller.next_block, "log poll failed");
                            sleep(interval).await;
                        }
                    }
                }
            },
        )
    }
}

/// Inclusive block range for the next poll, or `None` when caught up.
fn next_range(next_block: u64, head: u64) -> Option<(u64, u64)> {
    if next_block > head {
        return None;
    }
    Some((next_block, head.min(next_block + MAX_BLOCK_RANGE - 1)))
}

/// Logs every event the FlightSuretyData contract emits from the latest
/// block onward.
pub struct EventMonitoringService {
    rpc: RpcClient,
    data_address: Address,
    poll_interval: Duration,
}

impl EventMonitoringService {
    pub fn new(rpc: RpcClient, data_address: Address, poll_interval: Duration) -> Self {
        Self {
            rpc,
            data_address,
            poll_interval,
        }
    }

    pub async fn start(self) -> Result<(), RpcError> {
        let poller = LogPoller::new(self.rpc, self.data_address, None, FromBlock::Latest).await?;
        info!(
            address = %self.data_address,
            from_block = poller.next_block(),
            "data contract event monitor started"
        );

        let mut logs = Box::pin(poller.into_stream(self.poll_interval));
        while let Some(log) = logs.next().await {
            info!(
                block = ?log.block(),
                tx_hash = log.transaction_hash.as_deref().unwrap_or("unknown-tx"),
                topics = ?log.topics,
                data = %log.data,
                "data contract event"
            );
        }

        Ok(())
    }
}
