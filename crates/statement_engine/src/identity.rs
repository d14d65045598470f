use crate::model::Transaction;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Content fingerprint for transactions without a natural unique key:
/// lowercase hex over date, memo and amount.
pub fn fingerprint(tx: &Transaction) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tx.date.format("%Y-%m-%d").to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(tx.memo.as_bytes());
    hasher.update(b"|");
    hasher.update(tx.amount.to_string().as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

/// Tracks the ids issued within one parse session and repairs collisions.
///
/// Two transactions with identical date, memo and amount would fingerprint
/// identically; the second one gets a `-N` suffix on the id and a ` #N+1`
/// suffix on the memo so both stay distinguishable in the output. The
/// registry must not be shared between parse sessions.
#[derive(Debug, Default)]
pub struct IdRegistry {
    issued: HashSet<String>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a fingerprint id to `tx`. Positional ids are trusted as
    /// already unique and left untouched.
    pub fn assign(&mut self, tx: &mut Transaction) {
        if !tx.id.is_empty() {
            return;
        }
        let base = fingerprint(tx);
        if self.issued.insert(base.clone()) {
            tx.id = base;
            return;
        }
        let mut counter = 1usize;
        loop {
            let candidate = format!("{base}-{counter}");
            if self.issued.insert(candidate.clone()) {
                tx.id = candidate;
                tx.memo = format!("{} #{}", tx.memo, counter + 1);
                return;
            }
            counter += 1;
        }
    }
}
