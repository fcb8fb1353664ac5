//! Router tests driven through `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use filesync_engine::{DeliveryService, MockTransport, RetryConfig};
use filesync_protocol::{Operation, SyncResponse};
use filesync_queue::{DelayedQueue, MemoryDelayQueue, QueueConfig};
use filesync_server::{
    queue_router, sync_router, ReceiverContext, SenderContext, ServerConfig,
};
use filesync_testkit::SyncRoots;
use std::sync::Arc;
use tower::ServiceExt;

async fn call(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn sync_request(operation: &Operation) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/sync")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(operation.to_json().unwrap()))
        .unwrap()
}

fn receiver(roots: &SyncRoots) -> Router {
    let context = Arc::new(ReceiverContext::new(Arc::new(roots.executor(2))));
    sync_router(context, &ServerConfig::default())
}

fn sender(roots: &SyncRoots) -> (Arc<MemoryDelayQueue>, Router) {
    let queue = Arc::new(MemoryDelayQueue::new(QueueConfig::default()));
    let delivery = Arc::new(
        DeliveryService::new(Arc::new(MockTransport::new()), RetryConfig::default())
            .with_queue(queue.clone()),
    );
    let context = Arc::new(SenderContext::new(
        roots.resolver(),
        delivery,
        "peer.internal:9335",
    ));
    (queue, queue_router(context, &ServerConfig::default()))
}

#[tokio::test]
async fn sync_applies_operation() {
    let roots = SyncRoots::new();
    let router = receiver(&roots);

    let (status, body) = call(
        router,
        sync_request(&Operation::put("tests/test.txt", b"dsdd")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let response = SyncResponse::from_json(&body).unwrap();
    assert!(response.is_success());
    assert_eq!(response.path, "tests/test.txt");
    assert_eq!(roots.read_destination("tests/test.txt").unwrap(), b"dsdd");
}

#[tokio::test]
async fn sync_reports_precondition_failure_in_body() {
    let roots = SyncRoots::new();
    roots.write_destination("a.txt", b"old");
    let router = receiver(&roots);

    let (status, body) = call(router, sync_request(&Operation::put("a.txt", b"new"))).await;

    assert_eq!(status, StatusCode::OK);
    let response = SyncResponse::from_json(&body).unwrap();
    assert_eq!(response.status_code, 409);
    assert!(response.status_text.contains("must not exist"));
    assert_eq!(roots.read_destination("a.txt").unwrap(), b"old");
}

#[tokio::test]
async fn sync_uses_wire_field_names() {
    let roots = SyncRoots::new();
    let router = receiver(&roots);

    let (_, body) = call(router, sync_request(&Operation::delete("gone.txt"))).await;

    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["type"], "delete");
    assert_eq!(value["fileName"], "gone.txt");
    assert_eq!(value["statusCode"], 404);
    assert!(value["statusText"].as_str().unwrap().contains("not exists"));
}

#[tokio::test]
async fn sync_rejects_undecodable_body() {
    let roots = SyncRoots::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/sync")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _) = call(receiver(&roots), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn queue_debug_mode_does_nothing() {
    let roots = SyncRoots::new();
    let (queue, router) = sender(&roots);

    let request = Request::builder()
        .uri("/api/queue?value=put:missing.txt&debug=TRUE")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
    assert_eq!(queue.size().await.unwrap(), 0);
}

#[tokio::test]
async fn queue_rejects_bad_instructions() {
    let roots = SyncRoots::new();

    for uri in [
        "/api/queue",
        "/api/queue?value=chmod:a.txt",
        "/api/queue?value=put:missing.txt",
        "/api/queue?value=put:../escape.txt",
        "/api/queue?value=copy:a.txt",
        "/api/queue?value=move:a.txt",
    ] {
        let (_, router) = sender(&roots);
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _) = call(router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn queue_resolves_and_enqueues() {
    let roots = SyncRoots::new();
    roots.write_source("tests/test.txt", b"dsdd");
    let (queue, router) = sender(&roots);

    let request = Request::builder()
        .uri("/api/queue?value=put:tests/test.txt")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    let id = text.strip_prefix("queued ").unwrap();

    let due = queue.poll_due(10).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id.as_deref(), Some(id));
    assert_eq!(due[0].destination, "peer.internal:9335");
    assert_eq!(due[0].content_base64.as_deref(), Some("ZHNkZA=="));
    assert!(!due[0].force);
}

#[tokio::test]
async fn queue_accepts_form_body_with_force() {
    let roots = SyncRoots::new();
    let (queue, router) = sender(&roots);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/queue")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("value=move:a.txt:b/c.txt&force=true"))
        .unwrap();
    let (status, _) = call(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let due = queue.poll_due(10).await.unwrap();
    assert_eq!(due[0].new_path.as_deref(), Some("b/c.txt"));
    assert!(due[0].force);
}

#[tokio::test]
async fn queue_post_reads_query_string_without_body() {
    let roots = SyncRoots::new();
    roots.write_source("a.txt", b"x");
    let (queue, router) = sender(&roots);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/queue?value=put:a.txt&force=true")
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(router, request).await;

    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    assert!(String::from_utf8(body).unwrap().starts_with("queued "));
    let due = queue.poll_due(10).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].path, "a.txt");
    assert!(due[0].force);
}

#[tokio::test]
async fn queue_form_body_overrides_query_string() {
    let roots = SyncRoots::new();
    let (queue, router) = sender(&roots);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/queue?value=delete:query.txt")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("value=delete:body.txt"))
        .unwrap();
    let (status, _) = call(router, request).await;

    assert_eq!(status, StatusCode::OK);
    let due = queue.poll_due(10).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].path, "body.txt");
}
