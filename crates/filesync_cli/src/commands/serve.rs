//! Run a node: mutual-TLS receiver, queue endpoint and optional poller.

use crate::commands::build_delivery;
use crate::config::AppConfig;
use crate::error::CliResult;
use filesync_core::{FileExecutor, SourceResolver};
use filesync_engine::CertificateSource;
use filesync_queue::QueuePoller;
use filesync_server::{tls_config, ReceiverContext, SenderContext, SyncServer};
use std::sync::Arc;
use tracing::{info, warn};

/// Serves until Ctrl-C.
pub async fn run(config: &AppConfig) -> CliResult<()> {
    let material = config.pem_files().certificate_material()?;
    let tls = tls_config(&material)?;

    let (delivery, queue) = build_delivery(config, &material).await?;
    let delivery = Arc::new(delivery);

    let poller = match queue {
        Some(queue) if config.redis.execute_queue => Some(Arc::new(QueuePoller::new(
            queue,
            delivery.clone(),
            config.poller_config(),
        ))),
        Some(_) => {
            info!("queue execution disabled on this node, only enqueuing");
            None
        }
        None => None,
    };
    let poller_task = poller.clone().map(QueuePoller::spawn);

    let executor = Arc::new(FileExecutor::new(config.executor_config()));
    let receiver = Arc::new(ReceiverContext::new(executor));
    let sender = Arc::new(SenderContext::new(
        SourceResolver::new(&config.paths.source_dir),
        delivery.clone(),
        &config.sync.address,
    ));

    info!(
        source = %config.paths.source_dir.display(),
        destination = %config.paths.destination_dir.display(),
        peer = %config.sync.address,
        queue = config.redis.enabled,
        "starting filesync node"
    );

    let server = SyncServer::new(config.server_config()?, tls, receiver, sender);
    let served = server.run(shutdown_signal()).await;

    if let Some(poller) = poller {
        poller.stop();
    }
    if let Some(task) = poller_task {
        if let Err(e) = task.await {
            warn!(error = %e, "poller task ended abnormally");
        }
    }

    let stats = delivery.stats();
    info!(
        delivered = stats.delivered,
        failed_attempts = stats.failed_attempts,
        requeued = stats.requeued,
        abandoned = stats.abandoned,
        "filesync node stopped"
    );
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
