use chrono::{DateTime, Utc};
use log::info;
use thiserror::Error;

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use super::block::{Block, MiningCancelled};
use super::crypto::Address;
use super::transaction::{Sender, Transaction, TransactionError};

/// Default number of leading zero hex digits a mined hash must have
const DEFAULT_DIFFICULTY: usize = 2;

/// Default amount minted to the miner per block
const DEFAULT_MINING_REWARD: f64 = 100.0;

/// Previous-hash marker reserved for the genesis block. It is a fixed
/// sentinel, never the output of the digest function.
const GENESIS_PREVIOUS_HASH: &str = "";

/// Errors that can occur when submitting transactions or mining
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("transaction is missing a sender or recipient address")]
    MalformedTransaction,

    #[error("transaction signature does not verify")]
    InvalidTransaction,

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("chain tip changed while mining, block discarded")]
    StaleTip,

    #[error(transparent)]
    MiningCancelled(#[from] MiningCancelled),
}

/// Pool and chain live behind one lock: a mining cycle must see a consistent
/// snapshot of both, and appends must not interleave.
#[derive(Debug)]
struct ChainState {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
}

/// The ledger: an append-only chain of mined blocks plus the staging pool of
/// accepted-but-unmined transactions.
///
/// Blocks are only ever appended at the end; nothing edits a block in place
/// once mined. Tampering is therefore detectable by [`Blockchain::is_valid`]:
/// any edit changes the block's recomputed digest and breaks linkage with its
/// successor.
#[derive(Debug, Clone)]
pub struct Blockchain {
    state: Arc<Mutex<ChainState>>,

    /// Leading zero hex digits required of a mined hash
    difficulty: usize,

    /// Amount minted to the miner per mined block
    mining_reward: f64,
}

impl Blockchain {
    /// Creates a ledger with default difficulty and reward. The genesis block
    /// is synthesized immediately; the chain is never empty.
    pub fn new() -> Self {
        Self::with_params(DEFAULT_DIFFICULTY, DEFAULT_MINING_REWARD)
    }

    /// Creates a ledger with explicit difficulty and mining reward.
    pub fn with_params(difficulty: usize, mining_reward: f64) -> Self {
        let state = ChainState {
            chain: vec![Self::genesis_block()],
            pending: Vec::new(),
        };

        Blockchain {
            state: Arc::new(Mutex::new(state)),
            difficulty,
            mining_reward,
        }
    }

    /// Builds the first block: fixed timestamp, empty batch, sentinel
    /// previous hash. Its own hash is computed once, not mined.
    fn genesis_block() -> Block {
        let mut genesis = Block::new(
            DateTime::<Utc>::UNIX_EPOCH,
            Vec::new(),
            GENESIS_PREVIOUS_HASH.to_string(),
        );
        genesis.hash = genesis.compute_hash();
        genesis
    }

    /// The block at the tip of the chain.
    pub fn latest_block(&self) -> Block {
        let state = self.state.lock().unwrap();
        state.chain.last().cloned().unwrap()
    }

    /// Accepts a transaction into the pending pool.
    ///
    /// Rejects transactions with an absent sender or recipient
    /// ([`BlockchainError::MalformedTransaction`]) and transactions whose
    /// signature does not verify ([`BlockchainError::InvalidTransaction`]);
    /// verification errors such as a missing signature propagate as
    /// [`BlockchainError::Transaction`]. Balance sufficiency and replay are
    /// deliberately not checked: acceptance is signature- and shape-validity
    /// only.
    pub fn submit_transaction(&self, transaction: Transaction) -> Result<(), BlockchainError> {
        match &transaction.sender {
            Sender::Wallet(address) if !address.0.is_empty() => {}
            _ => return Err(BlockchainError::MalformedTransaction),
        }
        if transaction.recipient.0.is_empty() {
            return Err(BlockchainError::MalformedTransaction);
        }

        if !transaction.is_valid()? {
            return Err(BlockchainError::InvalidTransaction);
        }

        let mut state = self.state.lock().unwrap();
        state.pending.push(transaction);

        Ok(())
    }

    /// Packages the pending pool into a new block, mines it, and appends it
    /// to the chain. The pool is then replaced by a single reward transaction
    /// minting `mining_reward` to `reward_address`.
    ///
    /// An empty pool still produces a minable block. This is the only
    /// operation that grows the chain.
    pub fn mine_pending_transactions(
        &self,
        reward_address: &Address,
    ) -> Result<Block, BlockchainError> {
        let never = AtomicBool::new(false);
        self.mine_pending_interruptible(reward_address, &never)
    }

    /// Like [`Blockchain::mine_pending_transactions`] but checks `cancel`
    /// inside the mining loop, failing with
    /// [`BlockchainError::MiningCancelled`] once the flag is raised.
    ///
    /// The lock is held only to snapshot the pool and tip hash, and again to
    /// append; proof of work runs unlocked. If another append lands in
    /// between, the mined block would link a stale predecessor, so the append
    /// is refused with [`BlockchainError::StaleTip`] and the pool is left
    /// untouched.
    pub fn mine_pending_interruptible(
        &self,
        reward_address: &Address,
        cancel: &AtomicBool,
    ) -> Result<Block, BlockchainError> {
        let (batch, tip_hash) = {
            let state = self.state.lock().unwrap();
            let tip = state.chain.last().unwrap();
            (state.pending.clone(), tip.hash.clone())
        };

        let mut block = Block::new(Utc::now(), batch, tip_hash.clone());
        block.mine_interruptible(self.difficulty, cancel)?;

        let mut state = self.state.lock().unwrap();
        if state.chain.last().unwrap().hash != tip_hash {
            return Err(BlockchainError::StaleTip);
        }

        info!(
            "block mined: {} ({} transactions)",
            block.hash,
            block.transactions.len()
        );

        state.chain.push(block.clone());
        state.pending = vec![Transaction::reward(reward_address.clone(), self.mining_reward)];

        Ok(block)
    }

    /// Net balance of `address`: every transaction it sent debits the amount,
    /// every transaction it received credits it. Reward transactions only
    /// ever credit, so total supply grows by the mining reward per block. May
    /// be negative, since submission does not enforce balance sufficiency.
    pub fn balance_of(&self, address: &Address) -> f64 {
        let state = self.state.lock().unwrap();
        let mut balance = 0.0;

        for block in &state.chain {
            for tx in &block.transactions {
                if let Sender::Wallet(sender) = &tx.sender {
                    if sender == address {
                        balance -= tx.amount;
                    }
                }
                if &tx.recipient == address {
                    balance += tx.amount;
                }
            }
        }

        balance
    }

    /// Every mined transaction involving `address`, as sender or recipient,
    /// in chain order. Empty if the address never transacted.
    pub fn transaction_history(&self, address: &Address) -> Vec<Transaction> {
        let state = self.state.lock().unwrap();
        let mut history = Vec::new();

        for block in &state.chain {
            for tx in &block.transactions {
                let sent = matches!(&tx.sender, Sender::Wallet(sender) if sender == address);
                if sent || &tx.recipient == address {
                    history.push(tx.clone());
                }
            }
        }

        history
    }

    /// Walks the chain from index 1 (genesis is exempt from linkage checks)
    /// and verifies, for each block: every transaction's signature, the
    /// stored hash against the recomputed digest, and the previous-hash link
    /// to its predecessor. Returns false at the first violation.
    pub fn is_valid(&self) -> bool {
        let state = self.state.lock().unwrap();

        for i in 1..state.chain.len() {
            let current = &state.chain[i];
            let previous = &state.chain[i - 1];

            if !matches!(current.has_valid_transactions(), Ok(true)) {
                return false;
            }
            if current.hash != current.compute_hash() {
                return false;
            }
            if current.previous_hash != previous.hash {
                return false;
            }
        }

        true
    }

    /// Snapshot of the full chain.
    pub fn chain(&self) -> Vec<Block> {
        self.state.lock().unwrap().chain.clone()
    }

    /// Snapshot of the pending pool.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().pending.clone()
    }

    /// The configured proof-of-work difficulty.
    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// The configured per-block mining reward.
    pub fn mining_reward(&self) -> f64 {
        self.mining_reward
    }

    /// Test-only access for tampering with a mined block in place. The
    /// public surface has no mutation path into the chain.
    #[cfg(test)]
    fn with_block_mut<F: FnOnce(&mut Block)>(&self, index: usize, f: F) {
        let mut state = self.state.lock().unwrap();
        f(&mut state.chain[index]);
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}
