use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::PollingConfig;
use crate::dedup::{DedupLedger, EvictionPolicy, Unbounded};
use crate::error::WatchError;
use crate::reporter::Reporter;
use crate::types::{AccountTransaction, AccountTxRequest, AccountTxResponse, AccountTxResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    /// Waiting for the next tick.
    Armed,
    Fetching,
    Stopped,
    Failed,
}

/// Polls an account's full transaction history on a fixed cadence and
/// surfaces only transactions it has not reported before.
pub struct PollingSession<P: EvictionPolicy = Unbounded> {
    client: Client,
    endpoint: String,
    interval: Duration,
    body: Vec<u8>,
    ledger: DedupLedger<P>,
    state: PollState,
}

impl PollingSession<Unbounded> {
    pub fn new(config: PollingConfig) -> Result<Self, WatchError> {
        Self::with_eviction(config, Unbounded)
    }
}

impl<P: EvictionPolicy> PollingSession<P> {
    pub fn with_eviction(config: PollingConfig, policy: P) -> Result<Self, WatchError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;

        // The request never changes: no cursor is advanced between polls.
        let request = AccountTxRequest::full_history(config.account);
        let body = serde_json::to_vec(&request).map_err(|source| WatchError::Encode {
            what: "account_tx request",
            source,
        })?;

        Ok(Self {
            client,
            endpoint: config.endpoint,
            interval: config.interval,
            body,
            ledger: DedupLedger::with_policy(policy),
            state: PollState::Idle,
        })
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn request_body(&self) -> &[u8] {
        &self.body
    }

    pub fn ledger(&self) -> &DedupLedger<P> {
        &self.ledger
    }

    /// Tick on the configured interval until `cancel` fires. Any failed
    /// poll ends the session.
    pub async fn run<R: Reporter>(
        &mut self,
        reporter: &mut R,
        cancel: &CancellationToken,
    ) -> Result<(), WatchError> {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Polling {} every {:?}", self.endpoint, self.interval);
        self.state = PollState::Armed;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Interrupt received, stopping poller");
                    self.state = PollState::Stopped;
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let fresh = self.tick().await?;
            let first = self.ledger.count() - fresh.len() as u64;
            for (offset, entry) in fresh.iter().enumerate() {
                reporter.new_transaction(entry, first + offset as u64 + 1);
            }
        }
    }

    /// One poll: fetch the page and return the entries not seen before, in
    /// response order.
    pub async fn tick(&mut self) -> Result<Vec<AccountTransaction>, WatchError> {
        self.state = PollState::Fetching;
        let result = match self.fetch().await {
            Ok(result) => result,
            Err(e) => {
                error!("Poll of {} failed: {}", self.endpoint, e);
                self.state = PollState::Failed;
                return Err(e);
            }
        };

        let fresh = self.absorb(result);
        debug!(
            "Poll done: {} new, {} distinct so far",
            fresh.len(),
            self.ledger.count()
        );
        self.state = PollState::Armed;
        Ok(fresh)
    }

    pub async fn fetch(&self) -> Result<AccountTxResult, WatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(self.body.clone())
            .send()
            .await
            .map_err(|e| WatchError::Query(format!("request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WatchError::Query(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(WatchError::Query(format!("{} - {}", status, text)));
        }

        let response: AccountTxResponse = serde_json::from_str(&text)
            .map_err(|e| WatchError::Query(format!("malformed response body: {}", e)))?;

        let result = response.result;
        if result.status != "success" {
            let reason = result
                .error_message
                .or(result.error)
                .unwrap_or_else(|| format!("status {}", result.status));
            return Err(WatchError::Query(format!("server returned error: {}", reason)));
        }

        Ok(result)
    }

    /// Record every entry of `result` in the dedup ledger and return those
    /// that were new.
    pub fn absorb(&mut self, result: AccountTxResult) -> Vec<AccountTransaction> {
        if let Some(marker) = &result.marker {
            // More history exists past this page; it is not requested.
            debug!("Ignoring marker ledger={} seq={}", marker.ledger, marker.seq);
        }
        for warning in &result.warnings {
            debug!("Server warning {}: {}", warning.id, warning.message);
        }

        let mut fresh = Vec::new();
        for entry in result.transactions {
            if self.ledger.has(entry.hash()) {
                continue;
            }
            self.ledger
                .insert_at(entry.hash().to_string(), entry.tx.ledger_index);
            fresh.push(entry);
        }
        fresh
    }
}
