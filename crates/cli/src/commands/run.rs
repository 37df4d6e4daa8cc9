//! `steadyhand run`: keep the agent connected, and the process up, until Ctrl-C.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use steadyhand_agent::SessionManager;
use steadyhand_config::AppConfig;
use steadyhand_sim::SimConnector;

pub async fn run(
    config_path: &Path,
    gateway: bool,
    seed: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        AppConfig::load_with_env(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    println!("Steadyhand");
    println!(
        "   Server:    {}:{}",
        config.server.host, config.server.port
    );
    println!("   Account:   {}", config.account.username);
    if config.gateway.enabled && gateway {
        println!(
            "   Liveness:  http://{}:{}/health",
            config.gateway.host, config.gateway.port
        );
    }

    // No protocol client is linked in; the simulated world stands in for it.
    let connector = Arc::new(SimConnector::demo());
    let mut manager = SessionManager::new(connector, config.clone())?;
    if let Some(seed) = seed {
        manager = manager.with_seed(seed);
    }

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let gateway_task = (config.gateway.enabled && gateway).then(|| {
        let status = manager.subscribe();
        let gateway_config = config.gateway.clone();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = stop_rx.changed().await;
            };
            if let Err(e) = steadyhand_gateway::serve(&gateway_config, status, shutdown).await {
                error!(error = %e, "Liveness endpoint stopped");
            }
        })
    });

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    supervise(&manager, ctrl_c).await;

    let _ = stop_tx.send(true);
    if let Some(task) = gateway_task {
        let _ = task.await;
    }

    Ok(())
}

/// Drive the manager until `shutdown`. With reconnecting disabled the manager
/// gives up after one session; the process then stays up, disconnected, and
/// the liveness endpoint keeps answering until `shutdown`.
async fn supervise(manager: &SessionManager, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);
    match manager.run_until(shutdown.as_mut()).await {
        Some(end) => {
            warn!(?end, "Staying disconnected until shutdown");
            shutdown.await;
        }
        None => info!("Interrupted"),
    }
}
