#![allow(dead_code)]

use ledger_watcher::types::{AccountTransaction, Acknowledgement, EventRecord};
use ledger_watcher::Reporter;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, WebSocketStream};

/// Keeps everything a session reports, in order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub acks: Vec<Acknowledgement>,
    pub events: Vec<EventRecord>,
    pub transactions: Vec<(String, u64)>,
}

impl Reporter for RecordingReporter {
    fn acknowledged(&mut self, ack: &Acknowledgement) {
        self.acks.push(ack.clone());
    }

    fn event(&mut self, event: &EventRecord) {
        self.events.push(event.clone());
    }

    fn new_transaction(&mut self, entry: &AccountTransaction, distinct: u64) {
        self.transactions.push((entry.hash().to_string(), distinct));
    }
}

/// A local WebSocket peer standing in for the ledger node.
pub struct Peer {
    listener: TcpListener,
}

impl Peer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self { listener }
    }

    pub fn url(&self) -> String {
        format!("ws://{}/", self.listener.local_addr().unwrap())
    }

    pub async fn accept(&self) -> WebSocketStream<TcpStream> {
        let (stream, _) = self.listener.accept().await.unwrap();
        accept_async(stream).await.unwrap()
    }
}

pub fn ledger_closed(index: u64) -> String {
    serde_json::json!({
        "type": "ledgerClosed",
        "ledger_hash": format!("{:064X}", index),
        "ledger_index": index,
        "validated_ledgers": format!("32570-{}", index),
        "fee_base": 10,
        "txn_count": 2
    })
    .to_string()
}

/// `account_tx` response body listing `hashes` in order.
pub fn account_tx_page(hashes: &[&str]) -> String {
    let transactions: Vec<_> = hashes
        .iter()
        .enumerate()
        .map(|(i, hash)| {
            serde_json::json!({
                "tx": {
                    "Account": "rLNaPoKeeBjZe2qs6x52yVPZpZ8td4dc6w",
                    "Amount": "1000",
                    "Destination": "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe",
                    "TransactionType": "Payment",
                    "Fee": "12",
                    "Sequence": i + 1,
                    "hash": hash,
                    "ledger_index": 70_000_000 + i
                },
                "meta": {"TransactionResult": "tesSUCCESS", "TransactionIndex": i, "AffectedNodes": []},
                "validated": true
            })
        })
        .collect();

    serde_json::json!({
        "result": {
            "account": "rLNaPoKeeBjZe2qs6x52yVPZpZ8td4dc6w",
            "ledger_index_min": 32570,
            "ledger_index_max": 71_000_000,
            "limit": 200,
            "status": "success",
            "transactions": transactions,
            "validated": true
        }
    })
    .to_string()
}
