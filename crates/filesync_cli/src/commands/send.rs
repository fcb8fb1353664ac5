//! Send a single instruction to the peer.

use crate::commands::build_delivery;
use crate::config::AppConfig;
use crate::error::{CliError, CliResult};
use filesync_core::SourceResolver;
use filesync_engine::{CertificateSource, DeliveryOutcome, Submission};
use std::sync::Arc;

/// Resolves `instruction` against the source root and delivers it.
///
/// With Redis enabled the operation is only enqueued; a node running the
/// poller delivers it. Otherwise delivery is retried in-process.
pub async fn run(
    config: &AppConfig,
    instruction: &str,
    force: bool,
    destination: Option<String>,
) -> CliResult<()> {
    let resolver = SourceResolver::new(&config.paths.source_dir);
    let destination = destination.unwrap_or_else(|| config.sync.address.clone());
    let operation = resolver
        .resolve_str(instruction)?
        .with_force(force)
        .with_destination(destination);

    let material = config.pem_files().certificate_material()?;
    let (delivery, queue) = build_delivery(config, &material).await?;

    if queue.is_some() {
        match Arc::new(delivery).submit(operation).await? {
            Submission::Queued(id) => println!("queued {id}"),
            Submission::Dispatched => println!("ok"),
        }
        return Ok(());
    }

    match delivery.deliver_with_retry(operation).await {
        DeliveryOutcome::Delivered(response) => {
            println!("ok {} {}", response.verb, response.path);
            Ok(())
        }
        DeliveryOutcome::Requeued { id, .. } => {
            println!("queued {id}");
            Ok(())
        }
        DeliveryOutcome::Abandoned { attempts } => Err(CliError::Abandoned { attempts }),
    }
}
