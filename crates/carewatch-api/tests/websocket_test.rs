#![allow(clippy::unwrap_used)]
// Integration tests for `WebSocketTransport` against an in-process server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use carewatch_api::{Error, EventSocket, Inbound, Transport, WebSocketTransport};

// ── Helpers ─────────────────────────────────────────────────────────

/// Bind a one-shot server that sends `messages` and then closes.
async fn serve(messages: Vec<Message>) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        for msg in messages {
            ws.send(msg).await.unwrap();
        }
        let _ = ws.close(None).await;
    });

    Url::parse(&format!("ws://{addr}/ws")).unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn text_and_control_frames_are_surfaced_in_order() {
    let url = serve(vec![
        Message::text(r#"{"type":"sensor","tipo":"Seguro"}"#),
        Message::Ping(vec![1, 2, 3].into()),
        Message::text(r#"{"type":"ping"}"#),
    ])
    .await;

    let mut socket = WebSocketTransport::default().open(&url).await.unwrap();

    assert_eq!(
        socket.next().await.unwrap().unwrap(),
        Inbound::Text(r#"{"type":"sensor","tipo":"Seguro"}"#.into())
    );
    assert_eq!(socket.next().await.unwrap().unwrap(), Inbound::Control);
    assert_eq!(
        socket.next().await.unwrap().unwrap(),
        Inbound::Text(r#"{"type":"ping"}"#.into())
    );
    assert!(socket.next().await.is_none(), "close frame should end the stream");
}

#[tokio::test]
async fn connect_refused_is_a_connect_error() {
    // Grab a free port, then release it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    let result = WebSocketTransport::new(Duration::from_secs(2)).open(&url).await;

    assert!(
        matches!(result, Err(Error::WebSocketConnect(_))),
        "expected WebSocketConnect error, got: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn close_is_idempotent() {
    let url = serve(vec![Message::text(r#"{"type":"ping"}"#)]).await;
    let mut socket = WebSocketTransport::default().open(&url).await.unwrap();

    socket.close().await;
    socket.close().await;
}
