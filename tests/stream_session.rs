mod common;

use common::{ledger_closed, Peer, RecordingReporter};
use futures_util::{SinkExt, StreamExt};
use ledger_watcher::types::{Acknowledgement, EventRecord};
use ledger_watcher::{SessionState, StreamConfig, StreamSession, WatchError};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

const LEDGER_ACK: &str = include_str!("fixtures/ledger_ack.json");
const TRANSACTION_ACK: &str = include_str!("fixtures/transaction_ack.json");
const TRANSACTION_EVENT: &str = include_str!("fixtures/transaction_event.json");

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return text,
            Some(Ok(_)) => continue,
            other => panic!("peer expected a text frame, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_ledger_ack_reported_once_before_events() {
    let peer = Peer::bind().await;
    let mut session = StreamSession::new(StreamConfig::ledgers().with_endpoint(peer.url()));
    let mut reporter = RecordingReporter::default();
    let cancel = CancellationToken::new();

    let node = async {
        let mut ws = peer.accept().await;

        let directive: serde_json::Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
        assert_eq!(directive["command"], "subscribe");
        assert_eq!(directive["streams"], serde_json::json!(["ledger"]));

        ws.send(Message::Text(LEDGER_ACK.to_string())).await.unwrap();
        ws.send(Message::Text(ledger_closed(101))).await.unwrap();
        // Gaps in the index are fine.
        ws.send(Message::Text(ledger_closed(104))).await.unwrap();
        ws.close(None).await.unwrap();
    };

    let (result, ()) = tokio::join!(session.run(&mut reporter, &cancel), node);

    // The node hung up without being asked to.
    assert!(matches!(result, Err(WatchError::TransportRead(_))));
    assert_eq!(session.state(), SessionState::Failed);

    assert_eq!(reporter.acks.len(), 1);
    match &reporter.acks[0] {
        Acknowledgement::Ledger(ack) => assert_eq!(ack.result.ledger_index, 100),
        other => panic!("unexpected ack: {:?}", other),
    }

    let indices: Vec<u64> = reporter
        .events
        .iter()
        .map(|event| match event {
            EventRecord::Ledger(ledger) => ledger.ledger_index,
            other => panic!("unexpected event: {:?}", other),
        })
        .collect();
    assert_eq!(indices, vec![101, 104]);
}

#[tokio::test]
async fn test_malformed_ack_fails_session() {
    let peer = Peer::bind().await;
    let mut session = StreamSession::new(StreamConfig::ledgers().with_endpoint(peer.url()));
    let mut reporter = RecordingReporter::default();
    let cancel = CancellationToken::new();

    let node = async {
        let mut ws = peer.accept().await;
        next_text(&mut ws).await;

        // No ledger_index in the snapshot.
        let ack = r#"{"id":"x","status":"success","type":"response","result":{"ledger_hash":"AB","validated_ledgers":"1-2"}}"#;
        ws.send(Message::Text(ack.to_string())).await.unwrap();
        let _ = ws.send(Message::Text(ledger_closed(101))).await;
    };

    let (result, ()) = tokio::join!(session.run(&mut reporter, &cancel), node);

    let err = result.unwrap_err();
    assert!(err.is_decode(), "expected decode failure, got {}", err);
    assert_eq!(session.state(), SessionState::Failed);
    assert!(reporter.acks.is_empty());
    assert!(reporter.events.is_empty());
}

#[tokio::test]
async fn test_interrupt_sends_close_frame() {
    let peer = Peer::bind().await;
    let mut session = StreamSession::new(StreamConfig::ledgers().with_endpoint(peer.url()));
    let mut reporter = RecordingReporter::default();
    let cancel = CancellationToken::new();

    let node = async {
        let mut ws = peer.accept().await;
        next_text(&mut ws).await;
        ws.send(Message::Text(LEDGER_ACK.to_string())).await.unwrap();

        // Let the session report the ack and park on the next frame.
        sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        // Anything arriving after the interrupt must not be reported.
        let _ = ws.send(Message::Text(ledger_closed(101))).await;

        let mut saw_close = false;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(_) = message {
                saw_close = true;
                break;
            }
        }
        saw_close
    };

    let (result, saw_close) = tokio::join!(session.run(&mut reporter, &cancel), node);

    assert!(result.is_ok());
    assert!(saw_close, "peer never received a close frame");
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(reporter.acks.len(), 1);
    assert!(reporter.events.is_empty());
}

#[tokio::test]
async fn test_interrupt_while_awaiting_ack() {
    let peer = Peer::bind().await;
    let mut session = StreamSession::new(StreamConfig::ledgers().with_endpoint(peer.url()));
    let mut reporter = RecordingReporter::default();
    let cancel = CancellationToken::new();

    // The node takes the directive and never acknowledges it.
    let node = async {
        let mut ws = peer.accept().await;
        next_text(&mut ws).await;

        sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let mut saw_close = false;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(_) = message {
                saw_close = true;
                break;
            }
        }
        saw_close
    };

    let (result, saw_close) = timeout(
        Duration::from_secs(5),
        async { tokio::join!(session.run(&mut reporter, &cancel), node) },
    )
    .await
    .expect("session ignored the interrupt");

    assert!(result.is_ok());
    assert!(saw_close, "peer never received a close frame");
    assert_eq!(session.state(), SessionState::Closed);
    assert!(reporter.acks.is_empty());
    assert!(reporter.events.is_empty());
}

#[tokio::test]
async fn test_transaction_stream() {
    let peer = Peer::bind().await;
    let mut session =
        StreamSession::new(StreamConfig::transactions().with_endpoint(peer.url()));
    let mut reporter = RecordingReporter::default();
    let cancel = CancellationToken::new();

    let node = async {
        let mut ws = peer.accept().await;

        let directive: serde_json::Value = serde_json::from_str(&next_text(&mut ws).await).unwrap();
        assert_eq!(directive["streams"], serde_json::json!(["transactions"]));

        ws.send(Message::Text(TRANSACTION_ACK.to_string())).await.unwrap();
        ws.send(Message::Ping(b"keepalive".to_vec())).await.unwrap();
        ws.send(Message::Text(TRANSACTION_EVENT.to_string())).await.unwrap();

        let mut saw_pong = false;
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Pong(data) = message {
                assert_eq!(data, b"keepalive".to_vec());
                saw_pong = true;
                break;
            }
        }

        // Drifted schema: required engine_result is gone.
        let _ = ws
            .send(Message::Text(r#"{"type":"transaction","validated":true}"#.to_string()))
            .await;
        saw_pong
    };

    let (result, saw_pong) = tokio::join!(session.run(&mut reporter, &cancel), node);

    assert!(saw_pong);
    assert!(result.unwrap_err().is_decode());
    assert_eq!(session.state(), SessionState::Failed);

    assert!(matches!(reporter.acks[..], [Acknowledgement::Transactions(_)]));
    assert_eq!(reporter.events.len(), 1);
    match &reporter.events[0] {
        EventRecord::Transaction(event) => {
            assert_eq!(event.transaction.transaction_type, "OfferCreate");
            assert_eq!(event.ledger_index, Some(101));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_subscription() {
    let peer = Peer::bind().await;
    let mut session =
        StreamSession::new(StreamConfig::transactions().with_endpoint(peer.url()));
    let mut reporter = RecordingReporter::default();
    let cancel = CancellationToken::new();

    let node = async {
        let mut ws = peer.accept().await;
        next_text(&mut ws).await;
        let ack = r#"{"id":"x","status":"error","type":"response","error":"noPermission"}"#;
        ws.send(Message::Text(ack.to_string())).await.unwrap();
    };

    let (result, ()) = tokio::join!(session.run(&mut reporter, &cancel), node);

    assert!(matches!(result, Err(WatchError::SubscriptionRejected(ref e)) if e == "noPermission"));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(reporter.acks.is_empty());
}
