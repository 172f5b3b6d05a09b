// Ledger engine module
//
// This module contains the core ledger implementation including:
// - Transaction structure with signing and verification
// - Block structure with proof-of-work mining
// - Blockchain structure with chain validation and derived queries
// - Cryptography utilities (keypairs, addresses, signatures)

pub mod block;
pub mod chain;
pub mod crypto;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, MiningCancelled};
pub use chain::{Blockchain, BlockchainError};
pub use crypto::{Address, CryptoError, DigitalSignature, Wallet};
pub use transaction::{Sender, Transaction, TransactionError};
