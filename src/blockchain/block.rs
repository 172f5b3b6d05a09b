use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::sync::atomic::{AtomicBool, Ordering};

use super::transaction::{Transaction, TransactionError};

/// Raised when an interruptible mining run observes its cancellation flag.
#[derive(Debug, Error)]
#[error("mining was cancelled before a valid hash was found")]
pub struct MiningCancelled;

/// A batch of transactions linked to its predecessor by hash.
///
/// Transaction order inside the batch is part of the block's identity: the
/// hash covers the serialized batch in order, so any reordering changes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// When the block was created
    pub timestamp: DateTime<Utc>,

    /// Transactions included in this block, in execution order
    pub transactions: Vec<Transaction>,

    /// Hash of the preceding block; the empty string only on genesis
    pub previous_hash: String,

    /// Hash of this block, set by mining
    pub hash: String,

    /// Proof-of-work counter, mutated only while mining
    pub nonce: u64,
}

impl Block {
    /// Creates an unmined block. The hash stays empty and the nonce zero
    /// until [`Block::mine`] runs.
    pub fn new(
        timestamp: DateTime<Utc>,
        transactions: Vec<Transaction>,
        previous_hash: String,
    ) -> Self {
        Block {
            timestamp,
            transactions,
            previous_hash,
            hash: String::new(),
            nonce: 0,
        }
    }

    /// Hex-encoded SHA-256 digest over timestamp, previous hash, nonce and
    /// the serialized transaction batch. Always recomputed from the current
    /// fields; validation never trusts the stored `hash`.
    pub fn compute_hash(&self) -> String {
        let preimage = serde_json::json!({
            "timestamp": self.timestamp,
            "previous_hash": self.previous_hash,
            "nonce": self.nonce,
            "transactions": self.transactions,
        });

        let mut hasher = Sha256::new();
        hasher.update(preimage.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Runs proof of work: increments the nonce and rehashes until the hash's
    /// first `difficulty` hex characters are all `'0'`.
    ///
    /// The search is sequential and unbounded; its cost is the point. Hosts
    /// that need an escape hatch should use [`Block::mine_interruptible`].
    pub fn mine(&mut self, difficulty: usize) {
        let never = AtomicBool::new(false);
        // the flag is never raised, so the search cannot be cancelled
        let _ = self.mine_interruptible(difficulty, &never);
    }

    /// Proof of work with a cancellation flag checked each iteration. Returns
    /// [`MiningCancelled`] if the flag is raised before a hash is found; the
    /// block is left unmined in that case.
    pub fn mine_interruptible(
        &mut self,
        difficulty: usize,
        cancel: &AtomicBool,
    ) -> Result<(), MiningCancelled> {
        let target = "0".repeat(difficulty);

        while !self.hash.starts_with(&target) || self.hash.is_empty() {
            if cancel.load(Ordering::Relaxed) {
                self.nonce = 0;
                self.hash = String::new();
                return Err(MiningCancelled);
            }

            self.nonce += 1;
            self.hash = self.compute_hash();
        }

        debug!("hash found after {} nonce increments: {}", self.nonce, self.hash);
        Ok(())
    }

    /// True iff every transaction in the batch passes its own signature
    /// check. Short-circuits on the first invalid transaction and propagates
    /// the first verification error.
    pub fn has_valid_transactions(&self) -> Result<bool, TransactionError> {
        for tx in &self.transactions {
            if !tx.is_valid()? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::Wallet;

    fn sample_batch() -> Vec<Transaction> {
        let sender = Wallet::generate();
        let recipient = Wallet::generate();

        let mut tx = Transaction::new(sender.address().clone(), recipient.address().clone(), 25.0);
        tx.sign(&sender).unwrap();
        vec![tx]
    }

    #[test]
    fn new_block_starts_unmined() {
        let block = Block::new(Utc::now(), sample_batch(), "prev".to_string());

        assert!(block.hash.is_empty());
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn mining_satisfies_difficulty_prefix() {
        let mut block = Block::new(Utc::now(), sample_batch(), "prev".to_string());
        block.mine(2);

        assert!(block.hash.starts_with("00"));
        assert_eq!(block.hash, block.compute_hash());
        assert!(block.nonce > 0);
    }

    #[test]
    fn empty_batch_is_minable() {
        let mut block = Block::new(Utc::now(), Vec::new(), "prev".to_string());
        block.mine(1);

        assert!(block.hash.starts_with('0'));
    }

    #[test]
    fn reordering_transactions_changes_hash() {
        let a = Wallet::generate();
        let b = Wallet::generate();

        let mut first = Transaction::new(a.address().clone(), b.address().clone(), 1.0);
        first.sign(&a).unwrap();
        let mut second = Transaction::new(b.address().clone(), a.address().clone(), 2.0);
        second.sign(&b).unwrap();

        let timestamp = Utc::now();
        let forward = Block::new(timestamp, vec![first.clone(), second.clone()], "p".into());
        let reversed = Block::new(timestamp, vec![second, first], "p".into());

        assert_ne!(forward.compute_hash(), reversed.compute_hash());
    }

    #[test]
    fn cancelled_mining_leaves_block_unmined() {
        let mut block = Block::new(Utc::now(), sample_batch(), "prev".to_string());
        let cancel = AtomicBool::new(true);

        assert!(block.mine_interruptible(4, &cancel).is_err());
        assert!(block.hash.is_empty());
        assert_eq!(block.nonce, 0);
    }

    #[test]
    fn batch_with_tampered_transaction_is_invalid() {
        let mut block = Block::new(Utc::now(), sample_batch(), "prev".to_string());
        block.transactions[0].amount = 9999.0;

        assert!(!block.has_valid_transactions().unwrap());
    }

    #[test]
    fn unsigned_transaction_in_batch_propagates_error() {
        let sender = Wallet::generate();
        let recipient = Wallet::generate();
        let unsigned =
            Transaction::new(sender.address().clone(), recipient.address().clone(), 1.0);

        let block = Block::new(Utc::now(), vec![unsigned], "prev".to_string());

        assert!(matches!(
            block.has_valid_transactions(),
            Err(TransactionError::MissingSignature)
        ));
    }
}
