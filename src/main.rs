use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::{info, warn};

use shelby_blob_gateway::api::{create_router, create_router_with_rate_limit};
use shelby_blob_gateway::app::{AppService, AppState, ServiceSettings};
use shelby_blob_gateway::config::AppConfig;
use shelby_blob_gateway::domain::TransactionSigner;
use shelby_blob_gateway::infra::observability::{init_metrics_handle, init_tracing};
use shelby_blob_gateway::infra::{
    FullnodeClientConfig, HttpBlobStorageClient, LocalSigner, RestFullnodeClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env().context("loading configuration")?;
    init_tracing(config.log_format);

    let fullnode = RestFullnodeClient::new(
        &config.aptos_node_url,
        FullnodeClientConfig {
            max_retries: config.rpc_max_retries,
            ..FullnodeClientConfig::default()
        },
    )?;
    let storage = HttpBlobStorageClient::builder()
        .with_base_url(&config.shelby_rpc_url)
        .build();

    let signer: Option<Arc<dyn TransactionSigner>> =
        match (config.private_key, config.account_address.as_deref()) {
            (Some(key), Some(address)) => {
                let signer = LocalSigner::new(key, address).context("loading APTOS_PRIVATE_KEY")?;
                info!(
                    account = %signer.address(),
                    public_key = %signer.public_key_hex(),
                    "Signer loaded"
                );
                Some(Arc::new(signer))
            }
            _ => None,
        };

    let service = AppService::new(
        Arc::new(fullnode),
        Arc::new(storage),
        signer,
        ServiceSettings {
            shelby_module_address: config.shelby_module_address.clone(),
            rate_per_gb_month: config.rate_per_gb_month,
            confirmation_timeout_secs: config.confirmation_timeout_secs,
        },
    );
    if !service.uploads_enabled() {
        warn!(
            "Uploads disabled: set APTOS_PRIVATE_KEY, APTOS_ACCOUNT_ADDRESS \
             and SHELBY_MODULE_ADDRESS"
        );
    }

    let metrics = init_metrics_handle();
    if metrics.is_none() {
        warn!("Metrics recorder not installed; /metrics will answer 404");
    }

    let app_state = Arc::new(
        AppState::new(Arc::new(service), config.api_auth_key).with_metrics(metrics),
    );

    let router = match config.rate_limit {
        Some(rate_limit) => {
            info!(
                rps = rate_limit.general_rps,
                burst = rate_limit.general_burst,
                "Rate limiting enabled"
            );
            create_router_with_rate_limit(app_state, rate_limit)
        }
        None => create_router(app_state),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;

    info!(
        addr = %config.bind_addr,
        node = %config.aptos_node_url,
        storage = %config.shelby_rpc_url,
        "Server starting"
    );

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
