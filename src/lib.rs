// Library modules for ledger-watcher
// The binary only parses arguments and wires a session to the logger.

pub mod config;
pub mod decoder;
pub mod dedup;
pub mod error;
pub mod polling;
pub mod reporter;
pub mod stream;
pub mod time;
pub mod types;

pub use config::{Mode, ModeArg, PollingConfig, StreamConfig};
pub use decoder::EventDecoder;
pub use dedup::{DedupLedger, EvictionPolicy, RetainRecentLedgers, Unbounded};
pub use error::WatchError;
pub use polling::{PollState, PollingSession};
pub use reporter::{LogReporter, Reporter};
pub use stream::{SessionState, StreamSession};

use tokio_util::sync::CancellationToken;

/// Run the session selected by `mode` until `cancel` fires or it fails.
pub async fn run(mode: Mode, cancel: CancellationToken) -> Result<(), WatchError> {
    match mode {
        Mode::LedgerStream(config) | Mode::TransactionStream(config) => {
            let mut reporter = LogReporter::new();
            StreamSession::new(config).run(&mut reporter, &cancel).await
        }
        Mode::AccountPolling(config) => {
            let mut reporter = LogReporter::for_account(config.account.clone());
            PollingSession::new(config)?.run(&mut reporter, &cancel).await
        }
    }
}
