use std::sync::Arc;

use alloy::primitives::Address;
use eyre::{Result, WrapErr};

use interop_relayer::config::Config;
use interop_relayer::finalizer::{Finalizer, FinalizerSettings};
use interop_relayer::gateway::{L1Client, NullifierBridge, ZkRpcClient};
use interop_relayer::scanner::Scanner;
use interop_relayer::scheduler::{Scheduler, SchedulerConfig};
use interop_relayer::server;
use interop_relayer::store::Store;

fn main() -> Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> Result<()> {
    init_logging();

    tracing::info!("Starting Interop Relayer");

    let config = Config::load()?;
    tracing::info!(
        l2_chain_id = config.l2.chain_id,
        l2_rpc = %config.l2.rpc_url,
        l1_rpc = %config.l1.rpc_url,
        data_dir = %config.relayer.data_dir.display(),
        "Configuration loaded"
    );

    let store = Store::new(&config.relayer.data_dir, config.relayer.finalized_retention);
    store.init().await?;

    let interop_center = parse_address("INTEROP_CENTER_ADDRESS", &config.l2.interop_center_address)?;
    let base_token = parse_address("BASE_TOKEN_ADDRESS", &config.l2.base_token_address)?;
    let handler = parse_address(
        "FINALIZATION_HANDLER_ADDRESS",
        &config.l1.finalization_handler_address,
    )?;

    let l2 = Arc::new(ZkRpcClient::new(&config.l2.rpc_url)?);
    let l1 = Arc::new(L1Client::new(&config.l1.rpc_url, &config.l1.private_key)?);

    let executor = match config.l2.executor_address {
        Some(ref address) => parse_address("EXECUTOR_ADDRESS", address)?,
        None => l1.address(),
    };
    tracing::info!(executor = %executor, interop_center = %interop_center, "Watching executor");

    let bridge = Arc::new(NullifierBridge::new(
        l2.clone(),
        l2.clone(),
        l1.clone(),
        handler,
        base_token,
        config.l2.chain_id,
        config.relayer.confirmation_timeout(),
    ));

    let finalizer = Finalizer::new(
        l2.clone(),
        l2.clone(),
        l1,
        bridge,
        FinalizerSettings {
            interop_center,
            base_token,
            handler,
            chain_id: config.l2.chain_id,
            confirmation_timeout: config.relayer.confirmation_timeout(),
        },
    );
    let scanner = Scanner::new(l2, store.clone(), executor, interop_center);
    let scheduler = Scheduler::new(
        scanner,
        finalizer,
        store.clone(),
        SchedulerConfig {
            poll_interval: config.relayer.poll_interval(),
            item_delay: config.relayer.item_delay(),
        },
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    let server_config = config.server.clone();
    let server_store = store.clone();
    tokio::spawn(async move {
        if let Err(e) = server::start_server(
            &server_config.bind_address,
            server_config.port,
            server_store,
            &server_config.cors_origin,
        )
        .await
        {
            tracing::error!(error = %e, "Status server error");
        }
    });

    scheduler.run(shutdown_rx).await?;

    tracing::info!("Interop Relayer stopped");
    Ok(())
}

fn parse_address(name: &str, value: &str) -> Result<Address> {
    value
        .parse()
        .wrap_err_with(|| format!("Invalid {}: {}", name, value))
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,interop_relayer=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .with(filter)
            .init();
    }
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
