use std::time::Duration;

use coversync_server::serve;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use crate::common::mock_app::MockApp;

mod common;

#[tokio::test]
async fn test_shutdown_with_open_event_stream() {
    let app = MockApp::new().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let (trigger, signal) = oneshot::channel::<()>();
    let state = app.state.clone();
    let server = tokio::spawn(async move {
        serve(listener, &state, async move {
            let _ = signal.await;
        })
        .await
    });

    let mut client = TcpStream::connect(address).await.unwrap();
    client
        .write_all(b"GET /api/events HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    let mut buffer = vec![0; 4096];
    let read = client.read(&mut buffer).await.unwrap();
    let response = String::from_utf8_lossy(&buffer[..read]);
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");

    trigger.send(()).unwrap();

    tokio::time::timeout(Duration::from_secs(3), server)
        .await
        .expect("server still running after shutdown")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_streams_opened_after_shutdown_end_immediately() {
    use axum::body::Body;
    use axum::http::Request;
    use futures::StreamExt;
    use tower::ServiceExt;

    let app = MockApp::new().await;
    app.state.live_updates.shutdown();

    let response = app
        .router
        .oneshot(Request::builder().uri("/events").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let frames = tokio::time::timeout(
        Duration::from_secs(3),
        response.into_body().into_data_stream().collect::<Vec<_>>(),
    )
    .await
    .expect("event stream did not end");

    assert!(frames.is_empty());
}
