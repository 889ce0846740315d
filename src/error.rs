use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Every failure a session can hit. All of them end the session.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("failed to write {what}: {source}")]
    Write {
        what: &'static str,
        #[source]
        source: tungstenite::Error,
    },

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("stream read failed: {0}")]
    TransportRead(String),

    #[error("subscription rejected by server: {0}")]
    SubscriptionRejected(String),

    #[error("account_tx query failed: {0}")]
    Query(String),
}

impl WatchError {
    /// Returns `true` for failures caused by a payload that did not match
    /// the expected schema.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

impl From<reqwest::Error> for WatchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Query(err.to_string())
    }
}
