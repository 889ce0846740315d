use tracing::info;

use crate::time::from_ledger_epoch;
use crate::types::{AccountTransaction, Acknowledgement, EventRecord};

/// Receives everything a session surfaces to the operator.
pub trait Reporter {
    fn acknowledged(&mut self, ack: &Acknowledgement);

    fn event(&mut self, event: &EventRecord);

    /// A transaction seen for the first time. `distinct` is the number of
    /// distinct transactions observed so far, this one included.
    fn new_transaction(&mut self, entry: &AccountTransaction, distinct: u64);
}

/// Writes one log line per call.
#[derive(Debug, Default)]
pub struct LogReporter {
    /// Account whose balance change is printed for polled transactions.
    account: Option<String>,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_account(account: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
        }
    }
}

impl Reporter for LogReporter {
    fn acknowledged(&mut self, ack: &Acknowledgement) {
        match ack {
            Acknowledgement::Ledger(ack) => {
                info!(
                    "✅ Subscribed: status={}, type={}, hash={}, index={}, validated_ledgers={}",
                    ack.status,
                    ack.kind,
                    ack.result.ledger_hash,
                    ack.result.ledger_index,
                    ack.result.validated_ledgers.as_deref().unwrap_or("-"),
                );
            }
            Acknowledgement::Transactions(ack) => {
                info!("✅ Subscribed: status={}, type={}", ack.status, ack.kind);
            }
        }
    }

    fn event(&mut self, event: &EventRecord) {
        match event {
            EventRecord::Ledger(ledger) => {
                let closed_at = ledger
                    .ledger_time
                    .and_then(from_ledger_epoch)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                info!(
                    "📦 Ledger closed: hash={}, index={}, txns={}, closed_at={}, validated_ledgers={}",
                    ledger.ledger_hash,
                    ledger.ledger_index,
                    ledger.txn_count.unwrap_or(0),
                    closed_at,
                    ledger.validated_ledgers.as_deref().unwrap_or("-"),
                );
            }
            EventRecord::Transaction(event) => {
                let tx = &event.transaction;
                info!(
                    "💸 Transaction: result={} ({}), ledger={}, index={}, account={}, type={}, hash={}, validated={}",
                    event.engine_result,
                    event.engine_result_code,
                    event.ledger_hash.as_deref().unwrap_or("-"),
                    event.ledger_index.map_or_else(|| "-".to_string(), |i| i.to_string()),
                    tx.account,
                    tx.transaction_type,
                    tx.hash,
                    event.validated,
                );
            }
        }
    }

    fn new_transaction(&mut self, entry: &AccountTransaction, distinct: u64) {
        let tx = &entry.tx;
        let delta = self
            .account
            .as_deref()
            .and_then(|account| entry.meta.native_balance_delta(account))
            .map_or_else(|| "-".to_string(), |drops| format!("{:+} drops", drops));

        info!(
            "🆕 New transaction: account={}, hash={}, ledger_index={}, fee={}, amount={}, type={}, result={}, balance_change={}, signature={}",
            tx.account,
            tx.hash,
            tx.ledger_index.map_or_else(|| "-".to_string(), |i| i.to_string()),
            tx.fee,
            tx.amount.as_ref().map_or_else(|| "-".to_string(), |a| a.to_string()),
            tx.transaction_type,
            entry.meta.transaction_result,
            delta,
            tx.txn_signature.as_deref().unwrap_or("-"),
        );
        info!("📊 Transaction count = {}", distinct);
    }
}
