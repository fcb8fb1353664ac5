//! Listeners.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{queue_router, sync_router, ReceiverContext, SenderContext};
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::rustls::ServerConfig as TlsServerConfig;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

/// Accepts TLS connections on `listener` and serves `router` on each until
/// `shutdown` resolves.
///
/// A failed handshake (including a client certificate that does not chain to
/// the trust root) only drops that connection.
pub async fn serve_tls<F>(
    listener: TcpListener,
    tls: Arc<TlsServerConfig>,
    router: Router,
    shutdown: F,
) -> ServerResult<()>
where
    F: Future<Output = ()> + Send,
{
    let acceptor = TlsAcceptor::from(tls);
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
            () = &mut shutdown => break,
        };

        let acceptor = acceptor.clone();
        let router = router.clone();
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "tls handshake failed");
                    return;
                }
            };
            debug!(peer = %peer, "tls handshake complete");

            let service = TowerToHyperService::new(router);
            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(peer = %peer, error = %e, "connection closed with error");
            }
        });
    }

    info!("sync listener stopped");
    Ok(())
}

/// Serves `router` over plain HTTP until `shutdown` resolves.
pub async fn serve_plain<F>(listener: TcpListener, router: Router, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("queue listener stopped");
    Ok(())
}

/// Both listeners of a node.
pub struct SyncServer {
    config: ServerConfig,
    tls: Arc<TlsServerConfig>,
    receiver: Arc<ReceiverContext>,
    sender: Arc<SenderContext>,
}

impl SyncServer {
    /// Creates a server.
    pub fn new(
        config: ServerConfig,
        tls: Arc<TlsServerConfig>,
        receiver: Arc<ReceiverContext>,
        sender: Arc<SenderContext>,
    ) -> Self {
        Self {
            config,
            tls,
            receiver,
            sender,
        }
    }

    /// Binds both listeners and serves until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sync_listener = TcpListener::bind(self.config.sync_addr).await?;
        let queue_listener = TcpListener::bind(self.config.queue_addr).await?;
        info!(addr = %self.config.sync_addr, "sync listener (mutual TLS) started");
        info!(addr = %self.config.queue_addr, "queue listener started");

        let (stop, stopped) = watch::channel(false);
        tokio::spawn(async move {
            shutdown.await;
            let _ = stop.send(true);
        });

        let sync = serve_tls(
            sync_listener,
            self.tls,
            sync_router(self.receiver, &self.config),
            wait_for_stop(stopped.clone()),
        );
        let queue = serve_plain(
            queue_listener,
            queue_router(self.sender, &self.config),
            wait_for_stop(stopped),
        );

        tokio::try_join!(sync, queue)?;
        Ok(())
    }
}

async fn wait_for_stop(mut stopped: watch::Receiver<bool>) {
    let _ = stopped.wait_for(|stop| *stop).await;
}
