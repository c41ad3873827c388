//! FlightSurety Oracle Simulator
//!
//! Registers a pool of simulated oracles with the FlightSuretyApp contract,
//! answers every `OracleRequest` event with synthetic flight statuses, and
//! serves a small HTTP API for inspecting the oracle pool.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flightsurety_oracles::app_state::AppState;
use flightsurety_oracles::config::{select_oracle_candidates, Config};
use flightsurety_oracles::models::Address;
use flightsurety_oracles::routes;
use flightsurety_oracles::services::event_monitoring_service::{EventMonitoringService, FromBlock};
use flightsurety_oracles::services::flight_surety_app::{
    ContractError, FlightSuretyApp, RpcFlightSuretyApp,
};
use flightsurety_oracles::services::oracle_service::{self, OracleService, StatusStrategy};
use flightsurety_oracles::services::rpc_client::RpcClient;
use flightsurety_oracles::services::supervisor::{supervise, RestartPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        rpc_url = %config.rpc_url,
        app_address = %config.contracts.app_address,
        pool_size = config.pool_size,
        "configuration loaded"
    );

    let rpc = RpcClient::new(config.rpc_url.clone());
    let state = AppState::new();

    let app = routes::router(state.clone())
        .layer(build_cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http());
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server starting on {}", addr);
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "http server stopped");
        }
    });

    if let Some(data_address) = config.contracts.data_address {
        let monitor_rpc = rpc.clone();
        let poll_interval = config.poll_interval();
        tokio::spawn(supervise("data contract event monitor", RestartPolicy::default(), move || {
            EventMonitoringService::new(monitor_rpc.clone(), data_address, poll_interval).start()
        }));
    } else {
        info!("data contract event monitor disabled: FLIGHT_SURETY_DATA_ADDRESS not set");
    }

    let candidates = oracle_candidates(&config, &rpc).await?;
    let contract: Arc<dyn FlightSuretyApp> = Arc::new(RpcFlightSuretyApp::new(
        rpc,
        config.contracts.app_address,
        config.gas,
        config.poll_interval(),
    ));

    let registry = Arc::new(oracle_service::bootstrap(contract.as_ref(), config.pool_size, &candidates).await);
    state.publish_registry(registry.clone()).await;

    let strategy = config
        .fixed_status
        .map(StatusStrategy::Fixed)
        .unwrap_or_default();
    let service = Arc::new(OracleService::new(contract, registry, strategy));

    // Resubscribe whenever the request stream ends or the responder dies.
    supervise("oracle responder", RestartPolicy::default(), move || {
        let responder = service.clone();
        async move {
            let requests = responder
                .contract()
                .subscribe_status_requests(FromBlock::Latest)
                .await?;
            responder.serve(requests).await;
            Ok::<(), ContractError>(())
        }
    })
    .await;

    Ok(())
}

/// Configured oracle addresses, or the node's own accounts starting at the
/// configured offset.
async fn oracle_candidates(config: &Config, rpc: &RpcClient) -> anyhow::Result<Vec<Address>> {
    let available = match &config.oracle_addresses {
        Some(addresses) => addresses.clone(),
        None => {
            let accounts = rpc.accounts().await.context("failed to list node accounts")?;
            info!(
                accounts = accounts.len(),
                offset = config.account_offset,
                "using node accounts as oracle addresses"
            );
            accounts.into_iter().skip(config.account_offset).collect()
        }
    };

    Ok(select_oracle_candidates(config.pool_size, &available)?)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
