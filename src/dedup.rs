// Seen-transaction ledger for the polling session. The distinct counter
// only ever grows, even when an eviction policy drops old hashes.

use std::collections::{BTreeMap, HashSet};

/// Decides which hashes to forget. The ledger tells the policy about every
/// new hash and asks it for evictions right after.
pub trait EvictionPolicy {
    fn record(&mut self, hash: &str, ledger_index: Option<u64>);

    /// Hashes to drop now. Each hash is returned at most once.
    fn evict(&mut self) -> Vec<String>;
}

/// Never forgets. Each hash is reported once for the life of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl EvictionPolicy for Unbounded {
    fn record(&mut self, _hash: &str, _ledger_index: Option<u64>) {}

    fn evict(&mut self) -> Vec<String> {
        Vec::new()
    }
}

/// Keeps only hashes from the last `window` ledgers. Hashes recorded
/// without a ledger index are kept.
#[derive(Debug, Clone)]
pub struct RetainRecentLedgers {
    window: u64,
    newest: Option<u64>,
    by_ledger: BTreeMap<u64, Vec<String>>,
}

impl RetainRecentLedgers {
    pub fn new(window: u64) -> Self {
        Self {
            window,
            newest: None,
            by_ledger: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> u64 {
        self.window
    }
}

impl EvictionPolicy for RetainRecentLedgers {
    fn record(&mut self, hash: &str, ledger_index: Option<u64>) {
        let Some(index) = ledger_index else {
            return;
        };
        self.newest = Some(self.newest.map_or(index, |newest| newest.max(index)));
        self.by_ledger.entry(index).or_default().push(hash.to_string());
    }

    fn evict(&mut self) -> Vec<String> {
        let Some(newest) = self.newest else {
            return Vec::new();
        };
        let cutoff = newest.saturating_sub(self.window);

        // Everything below the cutoff leaves the index in one split.
        let kept = self.by_ledger.split_off(&cutoff);
        let expired = std::mem::replace(&mut self.by_ledger, kept);
        expired.into_values().flatten().collect()
    }
}

#[derive(Debug, Default)]
pub struct DedupLedger<P: EvictionPolicy = Unbounded> {
    seen: HashSet<String>,
    count: u64,
    policy: P,
}

impl DedupLedger<Unbounded> {
    pub fn new() -> Self {
        Self::with_policy(Unbounded)
    }
}

impl<P: EvictionPolicy> DedupLedger<P> {
    pub fn with_policy(policy: P) -> Self {
        Self {
            seen: HashSet::new(),
            count: 0,
            policy,
        }
    }

    pub fn has(&self, hash: &str) -> bool {
        self.seen.contains(hash)
    }

    /// Record `hash`. Inserting a hash that is already present changes nothing.
    pub fn insert(&mut self, hash: impl Into<String>) {
        self.insert_at(hash, None);
    }

    /// Record `hash` together with the ledger it was included in, so that
    /// ledger-based eviction can age it out.
    pub fn insert_at(&mut self, hash: impl Into<String>, ledger_index: Option<u64>) {
        let hash = hash.into();
        if self.seen.contains(&hash) {
            return;
        }

        self.policy.record(&hash, ledger_index);
        self.seen.insert(hash);
        self.count += 1;

        for hash in self.policy.evict() {
            self.seen.remove(&hash);
        }
    }

    /// Distinct hashes inserted over the ledger's lifetime.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Hashes currently retained.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
