use serde::{Deserialize, Serialize};
use std::fmt;

/// Which event class a stream session subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Ledger,
    Transactions,
}

impl StreamKind {
    /// Stream name as the server expects it in a subscribe command.
    pub fn stream_name(&self) -> &'static str {
        match self {
            StreamKind::Ledger => "ledger",
            StreamKind::Transactions => "transactions",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stream_name())
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Outbound subscribe command. Sent once, right after the socket opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeDirective {
    pub id: String,
    pub command: String,
    pub streams: Vec<StreamKind>,
}

impl SubscribeDirective {
    pub fn new(id: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            id: id.into(),
            command: "subscribe".to_string(),
            streams: vec![kind],
        }
    }
}

/// Fields common to every subscribe response, checked before the
/// mode-specific shape is decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct AckHeader {
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub error: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAck {
    pub id: Option<String>,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub result: LedgerClose,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionAck {
    pub id: Option<String>,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// First inbound frame after subscribing.
#[derive(Debug, Clone)]
pub enum Acknowledgement {
    Ledger(LedgerAck),
    Transactions(TransactionAck),
}

impl Acknowledgement {
    pub fn status(&self) -> &str {
        match self {
            Acknowledgement::Ledger(ack) => &ack.status,
            Acknowledgement::Transactions(ack) => &ack.status,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Acknowledgement::Ledger(ack) => &ack.kind,
            Acknowledgement::Transactions(ack) => &ack.kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Stream events
// ---------------------------------------------------------------------------

/// A closed ledger, as carried both by the ledger-stream acknowledgement
/// and by every `ledgerClosed` event after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerClose {
    pub ledger_hash: String,
    pub ledger_index: u64,
    pub validated_ledgers: Option<String>,
    /// Seconds since the ledger epoch (2000-01-01 UTC).
    pub ledger_time: Option<u64>,
    pub fee_base: Option<u64>,
    pub fee_ref: Option<u64>,
    pub reserve_base: Option<u64>,
    pub reserve_inc: Option<u64>,
    pub txn_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub engine_result: String,
    pub engine_result_code: i32,
    pub engine_result_message: Option<String>,
    pub ledger_hash: Option<String>,
    pub ledger_index: Option<u64>,
    pub transaction: Transaction,
    pub meta: Option<TransactionMeta>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub validated: bool,
}

/// Every frame after the acknowledgement.
#[derive(Debug, Clone)]
pub enum EventRecord {
    Ledger(LedgerClose),
    Transaction(Box<TransactionEvent>),
}

// ---------------------------------------------------------------------------
// Transactions and metadata (shared by stream and query payloads)
// ---------------------------------------------------------------------------

/// Either native drops (serialized as a decimal string) or an issued
/// currency amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Drops(String),
    Issued {
        value: String,
        currency: Option<String>,
        issuer: Option<String>,
    },
}

impl Amount {
    /// Native amount in drops, if this is a native amount.
    pub fn as_drops(&self) -> Option<i64> {
        match self {
            Amount::Drops(drops) => drops.parse().ok(),
            Amount::Issued { .. } => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Drops(drops) => write!(f, "{} drops", drops),
            Amount::Issued {
                value,
                currency,
                issuer,
            } => {
                write!(f, "{}", value)?;
                if let Some(currency) = currency {
                    write!(f, " {}", currency)?;
                }
                if let Some(issuer) = issuer {
                    write!(f, "/{}", issuer)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "Fee")]
    pub fee: String,
    #[serde(rename = "Sequence")]
    pub sequence: u32,
    pub hash: String,
    #[serde(rename = "Flags")]
    pub flags: Option<u32>,
    #[serde(rename = "LastLedgerSequence")]
    pub last_ledger_sequence: Option<u32>,
    #[serde(rename = "SigningPubKey")]
    pub signing_pub_key: Option<String>,
    #[serde(rename = "TxnSignature")]
    pub txn_signature: Option<String>,
    #[serde(rename = "Amount")]
    pub amount: Option<Amount>,
    #[serde(rename = "Destination")]
    pub destination: Option<String>,
    #[serde(rename = "DestinationTag")]
    pub destination_tag: Option<u32>,
    #[serde(rename = "SourceTag")]
    pub source_tag: Option<u32>,
    #[serde(rename = "TakerGets")]
    pub taker_gets: Option<Amount>,
    #[serde(rename = "TakerPays")]
    pub taker_pays: Option<Amount>,
    /// Seconds since the ledger epoch.
    pub date: Option<u64>,
    pub ledger_index: Option<u64>,
    #[serde(rename = "inLedger")]
    pub in_ledger: Option<u64>,
    pub owner_funds: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(rename = "AffectedNodes", default)]
    pub affected_nodes: Vec<AffectedNode>,
    #[serde(rename = "TransactionIndex")]
    pub transaction_index: Option<u32>,
    #[serde(rename = "TransactionResult")]
    pub transaction_result: String,
    pub delivered_amount: Option<Amount>,
}

impl TransactionMeta {
    /// Net change of `account`'s native balance in drops, taken from its
    /// `AccountRoot` entry. `None` when the transaction did not touch it.
    pub fn native_balance_delta(&self, account: &str) -> Option<i64> {
        self.affected_nodes
            .iter()
            .find_map(|node| node.native_balance_delta(account))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AffectedNode {
    ModifiedNode(LedgerEntryChange),
    CreatedNode(LedgerEntryChange),
    DeletedNode(LedgerEntryChange),
}

impl AffectedNode {
    pub fn change(&self) -> &LedgerEntryChange {
        match self {
            AffectedNode::ModifiedNode(change)
            | AffectedNode::CreatedNode(change)
            | AffectedNode::DeletedNode(change) => change,
        }
    }

    fn native_balance_delta(&self, account: &str) -> Option<i64> {
        let change = self.change();
        if change.ledger_entry_type != "AccountRoot" {
            return None;
        }

        match self {
            AffectedNode::CreatedNode(change) => {
                let fields = change.new_fields.as_ref()?;
                if fields.account.as_deref() != Some(account) {
                    return None;
                }
                fields.balance.as_ref()?.as_drops()
            }
            AffectedNode::ModifiedNode(change) | AffectedNode::DeletedNode(change) => {
                let fin = change.final_fields.as_ref()?;
                if fin.account.as_deref() != Some(account) {
                    return None;
                }
                let after = fin.balance.as_ref()?.as_drops()?;
                // No previous balance means the balance did not move.
                let before = match change
                    .previous_fields
                    .as_ref()
                    .and_then(|prev| prev.balance.as_ref())
                {
                    Some(balance) => balance.as_drops()?,
                    None => after,
                };
                Some(after - before)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntryChange {
    #[serde(rename = "LedgerEntryType")]
    pub ledger_entry_type: String,
    #[serde(rename = "LedgerIndex")]
    pub ledger_index: String,
    #[serde(rename = "FinalFields")]
    pub final_fields: Option<EntryFields>,
    #[serde(rename = "PreviousFields")]
    pub previous_fields: Option<EntryFields>,
    #[serde(rename = "NewFields")]
    pub new_fields: Option<EntryFields>,
    #[serde(rename = "PreviousTxnID")]
    pub previous_txn_id: Option<String>,
    #[serde(rename = "PreviousTxnLgrSeq")]
    pub previous_txn_lgr_seq: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFields {
    #[serde(rename = "Account")]
    pub account: Option<String>,
    #[serde(rename = "Balance")]
    pub balance: Option<Amount>,
    #[serde(rename = "Flags")]
    pub flags: Option<u32>,
    #[serde(rename = "OwnerCount")]
    pub owner_count: Option<u32>,
    #[serde(rename = "Sequence")]
    pub sequence: Option<u32>,
}

// ---------------------------------------------------------------------------
// account_tx query
// ---------------------------------------------------------------------------

/// JSON-RPC body for the account history query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTxRequest {
    pub method: String,
    pub params: Vec<AccountTxParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTxParams {
    pub account: String,
    pub binary: bool,
    pub forward: bool,
    pub ledger_index_min: i64,
    pub ledger_index_max: i64,
}

impl AccountTxRequest {
    /// Whole-history request for `account`. `-1` on both bounds means
    /// "every ledger the server has".
    pub fn full_history(account: impl Into<String>) -> Self {
        Self {
            method: "account_tx".to_string(),
            params: vec![AccountTxParams {
                account: account.into(),
                binary: false,
                forward: false,
                ledger_index_min: -1,
                ledger_index_max: -1,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTxResponse {
    pub result: AccountTxResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTxResult {
    pub status: String,
    #[serde(default)]
    pub transactions: Vec<AccountTransaction>,
    pub account: Option<String>,
    pub ledger_index_min: Option<i64>,
    pub ledger_index_max: Option<i64>,
    pub limit: Option<u32>,
    pub marker: Option<Marker>,
    pub validated: Option<bool>,
    pub error: Option<String>,
    pub error_message: Option<String>,
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub ledger: u64,
    pub seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTransaction {
    pub tx: Transaction,
    pub meta: TransactionMeta,
    #[serde(default)]
    pub validated: bool,
}

impl AccountTransaction {
    pub fn hash(&self) -> &str {
        &self.tx.hash
    }
}
