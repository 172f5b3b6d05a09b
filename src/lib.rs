//! A single-node ledger engine: an append-only chain of proof-of-work mined
//! blocks carrying Ed25519-signed value transfers.
//!
//! Callers submit signed [`Transaction`]s into the [`Blockchain`]'s pending
//! pool, trigger mining to seal the pool into a new [`Block`], and query
//! balances, per-address history and chain integrity. Persistence, transport
//! and any user interface are out of scope; the engine models one
//! authoritative in-process copy of the ledger.
//!
//! ```
//! use ledgerchain::{Blockchain, Transaction, Wallet};
//!
//! let ledger = Blockchain::with_params(2, 100.0);
//! let alice = Wallet::generate();
//! let bob = Wallet::generate();
//! let miner = Wallet::generate();
//!
//! let mut tx = Transaction::new(alice.address().clone(), bob.address().clone(), 50.0);
//! tx.sign(&alice).unwrap();
//!
//! ledger.submit_transaction(tx).unwrap();
//! ledger.mine_pending_transactions(miner.address()).unwrap();
//!
//! assert_eq!(ledger.balance_of(bob.address()), 50.0);
//! assert!(ledger.is_valid());
//! ```

pub mod blockchain;

pub use blockchain::{
    Address, Block, Blockchain, BlockchainError, CryptoError, DigitalSignature, MiningCancelled,
    Sender, Transaction, TransactionError, Wallet,
};
