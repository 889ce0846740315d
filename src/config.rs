use anyhow::{Context, Result};
use clap::ValueEnum;
use std::env;
use std::time::Duration;

use crate::types::{StreamKind, SubscribeDirective};

pub const DEFAULT_STREAM_ENDPOINT: &str = "wss://s.altnet.rippletest.net:51233/";
pub const DEFAULT_QUERY_ENDPOINT: &str = "https://s1.ripple.com:51234/";
pub const WATCHED_ACCOUNT: &str = "rLNaPoKeeBjZe2qs6x52yVPZpZ8td4dc6w";

/// Mode names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Watch newly validated ledgers
    Ledgers,
    /// Watch newly validated transactions
    Transactions,
    /// Poll the watched account's transaction history
    #[value(name = "acc-tx")]
    AccTx,
}

/// The one session a process runs, with its configuration.
#[derive(Debug, Clone)]
pub enum Mode {
    LedgerStream(StreamConfig),
    TransactionStream(StreamConfig),
    AccountPolling(PollingConfig),
}

impl Mode {
    /// Built-in preset for `arg`, no environment applied.
    pub fn preset(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Ledgers => Mode::LedgerStream(StreamConfig::ledgers()),
            ModeArg::Transactions => Mode::TransactionStream(StreamConfig::transactions()),
            ModeArg::AccTx => Mode::AccountPolling(PollingConfig::account_history()),
        }
    }

    /// Preset for `arg` with `LEDGER_WS_URL`, `LEDGER_RPC_URL` and
    /// `POLL_INTERVAL_SECONDS` overrides applied.
    pub fn from_env(arg: ModeArg) -> Result<Self> {
        Ok(match Self::preset(arg) {
            Mode::LedgerStream(config) => Mode::LedgerStream(config.with_env()),
            Mode::TransactionStream(config) => Mode::TransactionStream(config.with_env()),
            Mode::AccountPolling(config) => Mode::AccountPolling(config.with_env()?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::LedgerStream(_) => "ledgers",
            Mode::TransactionStream(_) => "transactions",
            Mode::AccountPolling(_) => "acc-tx",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub endpoint: String,
    pub kind: StreamKind,
    pub directive: SubscribeDirective,
}

impl StreamConfig {
    pub fn ledgers() -> Self {
        Self::new(
            DEFAULT_STREAM_ENDPOINT,
            StreamKind::Ledger,
            "Example watch for new validated ledgers",
        )
    }

    pub fn transactions() -> Self {
        Self::new(
            DEFAULT_STREAM_ENDPOINT,
            StreamKind::Transactions,
            "Example watch for new validated transactions",
        )
    }

    pub fn new(endpoint: impl Into<String>, kind: StreamKind, id: &str) -> Self {
        Self {
            endpoint: endpoint.into(),
            kind,
            directive: SubscribeDirective::new(id, kind),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn with_env(self) -> Self {
        match env::var("LEDGER_WS_URL") {
            Ok(endpoint) => self.with_endpoint(endpoint),
            Err(_) => self,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub endpoint: String,
    pub account: String,
    pub interval: Duration,
    pub request_timeout: Duration,
}

impl PollingConfig {
    pub fn account_history() -> Self {
        Self {
            endpoint: DEFAULT_QUERY_ENDPOINT.to_string(),
            account: WATCHED_ACCOUNT.to_string(),
            interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn with_env(self) -> Result<Self> {
        let endpoint =
            env::var("LEDGER_RPC_URL").unwrap_or_else(|_| DEFAULT_QUERY_ENDPOINT.to_string());
        let interval_seconds: u64 = env::var("POLL_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("Invalid POLL_INTERVAL_SECONDS")?;
        if interval_seconds == 0 {
            anyhow::bail!("POLL_INTERVAL_SECONDS must be greater than zero");
        }

        Ok(self
            .with_endpoint(endpoint)
            .with_interval(Duration::from_secs(interval_seconds)))
    }
}
