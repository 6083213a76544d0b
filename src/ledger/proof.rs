//! Hash-chained transaction proofs.
//!
//! Every write is a transaction `n` with an entry digest
//! `H(n ‖ len(key) ‖ key ‖ value)`. The ledger state after `n` transactions is
//! `root_n = H(root_{n-1} ‖ entry_n)`, starting from an all-zero root.
//!
//! A [`Proof`] hands the client the entry digests from some earlier
//! transaction up to the current head. The client folds them from a root it
//! already trusts, checks that the entry it asked about is one of them, and
//! only then moves its [`TrustedState`] forward. A server that rewrites or
//! drops history can't produce a chain that reproduces the trusted root.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// SHA-256 output
pub type Digest = [u8; 32];

/// root of an empty ledger
pub const ZERO_ROOT: Digest = [0u8; 32];

/// digest of a single transaction
pub fn entry_digest(tx: u64, key: &[u8], value: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(tx.to_be_bytes());
    hasher.update((key.len() as u64).to_be_bytes());
    hasher.update(key);
    hasher.update(value);
    hasher.finalize().into()
}

/// fold one entry into a state root
pub fn chain(root: &Digest, entry: &Digest) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(root);
    hasher.update(entry);
    hasher.finalize().into()
}

/// Entry digests linking `start_root` to `head_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// transaction the chain starts after
    pub start: u64,
    /// state root after `start`
    pub start_root: Digest,
    /// entry digests of transactions `start + 1 ..= head`
    pub leaves: Vec<Digest>,
    /// state root after the head transaction
    pub head_root: Digest,
}

impl Proof {
    /// last transaction covered by this proof
    pub fn head(&self) -> u64 {
        self.start + self.leaves.len() as u64
    }
}

/// The newest ledger state a client has verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedState {
    pub tx: u64,
    pub root: Digest,
}

impl Default for TrustedState {
    fn default() -> Self {
        Self {
            tx: 0,
            root: ZERO_ROOT,
        }
    }
}

impl TrustedState {
    /// Check that transaction `tx` with digest `entry` is part of `proof`, and
    /// that the proof extends this state. Returns the state at the proof head.
    pub fn verify(&self, tx: u64, entry: &Digest, proof: &Proof) -> Result<TrustedState, String> {
        let head = proof.head();
        if tx == 0 || tx <= proof.start || tx > head {
            return Err(format!("transaction {} is outside proof range {}..={}", tx, proof.start + 1, head));
        }
        if proof.start > self.tx {
            return Err(format!(
                "proof starts at transaction {} beyond trusted transaction {}",
                proof.start, self.tx
            ));
        }
        if head < self.tx {
            return Err(format!("ledger head {} is behind trusted transaction {}", head, self.tx));
        }
        if proof.start == 0 && proof.start_root != ZERO_ROOT {
            return Err("proof from genesis does not start at the empty root".to_string());
        }
        if proof.start == self.tx && proof.start_root != self.root {
            return Err(format!("state at transaction {} does not match trusted root", self.tx));
        }

        let mut root = proof.start_root;
        for (n, leaf) in (proof.start + 1..).zip(&proof.leaves) {
            if n == tx && leaf != entry {
                return Err(format!("entry digest of transaction {} does not match its content", tx));
            }
            root = chain(&root, leaf);
            if n == self.tx && root != self.root {
                return Err(format!("history rewritten at or before transaction {}", self.tx));
            }
        }

        if root != proof.head_root {
            return Err("proof does not reproduce the advertised head root".to_string());
        }

        Ok(TrustedState { tx: head, root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// roots[n] and entries[n-1] for a tiny ledger
    fn ledger(values: &[&str]) -> (Vec<Digest>, Vec<Digest>) {
        let mut roots = vec![ZERO_ROOT];
        let mut entries = Vec::new();
        for (i, v) in values.iter().enumerate() {
            let entry = entry_digest(i as u64 + 1, b"key", v.as_bytes());
            let next = chain(roots.last().unwrap(), &entry);
            entries.push(entry);
            roots.push(next);
        }
        (roots, entries)
    }

    fn proof(roots: &[Digest], entries: &[Digest], start: u64) -> Proof {
        Proof {
            start,
            start_root: roots[start as usize],
            leaves: entries[start as usize..].to_vec(),
            head_root: *roots.last().unwrap(),
        }
    }

    #[test]
    fn test_fresh_client_verifies_from_genesis() {
        let (roots, entries) = ledger(&["a", "b", "c"]);
        let state = TrustedState::default()
            .verify(2, &entries[1], &proof(&roots, &entries, 0))
            .unwrap();
        assert_eq!(state, TrustedState { tx: 3, root: roots[3] });
    }

    #[test]
    fn test_incremental_verification() {
        let (roots, entries) = ledger(&["a", "b", "c", "d"]);
        let trusted = TrustedState { tx: 2, root: roots[2] };

        // reading a newer entry
        let next = trusted.verify(4, &entries[3], &proof(&roots, &entries, 2)).unwrap();
        assert_eq!(next.tx, 4);

        // reading an older entry passes through the trusted root
        let again = trusted.verify(1, &entries[0], &proof(&roots, &entries, 0)).unwrap();
        assert_eq!(again, next);
    }

    #[test]
    fn test_tampered_value_rejected() {
        let (roots, entries) = ledger(&["a", "b"]);
        let forged = entry_digest(2, b"key", b"evil");
        let err = TrustedState::default()
            .verify(2, &forged, &proof(&roots, &entries, 0))
            .unwrap_err();
        assert!(err.contains("does not match its content"));
    }

    #[test]
    fn test_rewritten_history_rejected() {
        let (roots, _) = ledger(&["a", "b", "c"]);
        let trusted = TrustedState { tx: 2, root: roots[2] };

        let (forked_roots, forked_entries) = ledger(&["a", "x", "c"]);
        let err = trusted
            .verify(3, &forked_entries[2], &proof(&forked_roots, &forked_entries, 0))
            .unwrap_err();
        assert!(err.contains("history rewritten"));
    }

    #[test]
    fn test_rollback_rejected() {
        let (roots, _) = ledger(&["a", "b", "c"]);
        let trusted = TrustedState { tx: 3, root: roots[3] };

        let (short_roots, short_entries) = ledger(&["a"]);
        let err = trusted
            .verify(1, &short_entries[0], &proof(&short_roots, &short_entries, 0))
            .unwrap_err();
        assert!(err.contains("behind trusted"));
    }

    #[test]
    fn test_entry_outside_range() {
        let (roots, entries) = ledger(&["a", "b"]);
        let err = TrustedState::default()
            .verify(5, &entries[0], &proof(&roots, &entries, 0))
            .unwrap_err();
        assert!(err.contains("outside proof range"));
    }
}
