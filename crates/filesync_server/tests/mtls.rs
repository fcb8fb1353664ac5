//! Mutual-TLS handshake tests against a real listener.

use filesync_engine::{HttpsTransport, SyncError, SyncTransport, TlsMaterial, TransportConfig};
use filesync_protocol::Operation;
use filesync_server::{serve_tls, sync_router, tls_config, ReceiverContext, ServerConfig};
use filesync_testkit::{LeafPem, SyncRoots, TestPki};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct RunningServer {
    port: u16,
    _stop: oneshot::Sender<()>,
}

async fn start(roots: &SyncRoots, pki: &TestPki) -> RunningServer {
    let server = pki.server();
    let material = TlsMaterial::new(server.cert_pem, server.key_pem, pki.ca_pem()).unwrap();
    let tls = tls_config(&material).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let router = sync_router(
        Arc::new(ReceiverContext::new(Arc::new(roots.executor(2)))),
        &ServerConfig::default(),
    );

    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(serve_tls(listener, tls, router, async move {
        let _ = stopped.await;
    }));

    RunningServer { port, _stop: stop }
}

fn client(leaf: LeafPem, trust_root: String, port: u16) -> HttpsTransport {
    let material = TlsMaterial::new(leaf.cert_pem, leaf.key_pem, trust_root).unwrap();
    HttpsTransport::new(
        &material,
        TransportConfig::new(format!("localhost:{port}")).with_timeout(Duration::from_secs(10)),
    )
    .unwrap()
}

#[tokio::test]
async fn trusted_client_delivers_operation() {
    let roots = SyncRoots::new();
    let pki = TestPki::generate();
    let server = start(&roots, &pki).await;

    let transport = client(pki.client(), pki.ca_pem(), server.port);
    let response = transport
        .send(&Operation::put("tests/test.txt", b"dsdd"))
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(roots.read_destination("tests/test.txt").unwrap(), b"dsdd");
}

#[tokio::test]
async fn application_failure_is_rejected_error() {
    let roots = SyncRoots::new();
    roots.write_destination("a.txt", b"old");
    let pki = TestPki::generate();
    let server = start(&roots, &pki).await;

    let transport = client(pki.client(), pki.ca_pem(), server.port);
    let err = transport
        .send(&Operation::put("a.txt", b"new"))
        .await
        .unwrap_err();

    assert!(
        matches!(err, SyncError::Rejected { status_code: 409, .. }),
        "{err}"
    );
}

#[tokio::test]
async fn client_signed_by_unknown_ca_is_rejected() {
    let roots = SyncRoots::new();
    let pki = TestPki::generate();
    let rogue = TestPki::with_name("rogue CA");
    let server = start(&roots, &pki).await;

    // Trusts the real server, but presents a certificate the server cannot verify.
    let transport = client(rogue.client(), pki.ca_pem(), server.port);
    let err = transport
        .send(&Operation::put("tests/test.txt", b"dsdd"))
        .await
        .unwrap_err();

    assert!(err.is_retryable(), "{err}");
    assert!(!matches!(err, SyncError::Rejected { .. }), "{err}");
    assert!(roots.read_destination("tests/test.txt").is_none());
}

#[tokio::test]
async fn server_signed_by_unknown_ca_is_rejected() {
    let roots = SyncRoots::new();
    let pki = TestPki::generate();
    let rogue = TestPki::with_name("rogue CA");
    let server = start(&roots, &rogue).await;

    let transport = client(pki.client(), pki.ca_pem(), server.port);
    let err = transport
        .send(&Operation::put("tests/test.txt", b"dsdd"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Transport { .. }), "{err}");
    assert!(roots.read_destination("tests/test.txt").is_none());
}
