// Frame decoding for the subscription streams. The decoder is bound to the
// stream kind the session was opened with. Unknown fields are ignored; a
// frame missing a required field is an error, never skipped.

use serde::de::DeserializeOwned;

use crate::error::WatchError;
use crate::types::{
    AckHeader, Acknowledgement, EventRecord, LedgerAck, LedgerClose, StreamKind, TransactionAck,
    TransactionEvent,
};

#[derive(Debug, Clone, Copy)]
pub struct EventDecoder {
    kind: StreamKind,
}

impl EventDecoder {
    pub fn new(kind: StreamKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Decode the subscribe response. A response whose status is not
    /// `success` is a rejection, whatever else it carries.
    pub fn decode_ack(&self, payload: &[u8]) -> Result<Acknowledgement, WatchError> {
        let header: AckHeader = decode(payload, "subscription acknowledgement")?;
        if header.status != "success" {
            let reason = header
                .error_message
                .or(header.error)
                .unwrap_or_else(|| format!("status {}", header.status));
            return Err(WatchError::SubscriptionRejected(reason));
        }

        match self.kind {
            StreamKind::Ledger => {
                let ack: LedgerAck = decode(payload, "ledger subscription acknowledgement")?;
                Ok(Acknowledgement::Ledger(ack))
            }
            StreamKind::Transactions => {
                let ack: TransactionAck =
                    decode(payload, "transaction subscription acknowledgement")?;
                Ok(Acknowledgement::Transactions(ack))
            }
        }
    }

    pub fn decode_event(&self, payload: &[u8]) -> Result<EventRecord, WatchError> {
        match self.kind {
            StreamKind::Ledger => {
                let ledger: LedgerClose = decode(payload, "ledger event")?;
                Ok(EventRecord::Ledger(ledger))
            }
            StreamKind::Transactions => {
                let event: TransactionEvent = decode(payload, "transaction event")?;
                Ok(EventRecord::Transaction(Box::new(event)))
            }
        }
    }
}

fn decode<T: DeserializeOwned>(payload: &[u8], what: &'static str) -> Result<T, WatchError> {
    serde_json::from_slice(payload).map_err(|source| WatchError::Decode { what, source })
}
