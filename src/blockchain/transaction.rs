use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::crypto::{Address, CryptoError, DigitalSignature, Wallet};

/// Errors that can occur when signing or verifying a transaction
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("signing key does not match the sender address")]
    Authorization,

    #[error("transaction carries no signature")]
    MissingSignature,

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// The originator of a transaction.
///
/// `Issued` marks value minted by the system itself (mining rewards); such
/// transactions carry no signature and are always valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    Issued,
    Wallet(Address),
}

/// A single value transfer, signed by the sender's key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Who the value comes from
    pub sender: Sender,

    /// Who the value goes to
    pub recipient: Address,

    /// Amount being transferred
    pub amount: f64,

    /// Signature over the hash of the unsigned fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<DigitalSignature>,
}

impl Transaction {
    /// Creates a new unsigned transfer from `sender` to `recipient`.
    pub fn new(sender: Address, recipient: Address, amount: f64) -> Self {
        Transaction {
            sender: Sender::Wallet(sender),
            recipient,
            amount,
            signature: None,
        }
    }

    /// Creates a mining-reward transaction. Rewards mint value: they have no
    /// sending wallet and never require a signature.
    pub fn reward(recipient: Address, amount: f64) -> Self {
        Transaction {
            sender: Sender::Issued,
            recipient,
            amount,
            signature: None,
        }
    }

    /// Whether this transaction mints value rather than transferring it.
    pub fn is_reward(&self) -> bool {
        matches!(self.sender, Sender::Issued)
    }

    /// Hex-encoded SHA-256 digest over the unsigned fields (sender, recipient,
    /// amount). The signature is never part of the preimage; it is produced
    /// over this digest.
    pub fn compute_hash(&self) -> String {
        let preimage = serde_json::json!({
            "sender": self.sender,
            "recipient": self.recipient.0,
            "amount": self.amount,
        });

        let mut hasher = Sha256::new();
        hasher.update(preimage.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Signs the transaction with `wallet`.
    ///
    /// Fails with [`TransactionError::Authorization`] when the wallet's
    /// address is not the declared sender, so nobody can sign away another
    /// party's funds. Meant to be called once, before submission.
    pub fn sign(&mut self, wallet: &Wallet) -> Result<(), TransactionError> {
        match &self.sender {
            Sender::Wallet(address) if address == wallet.address() => {}
            _ => return Err(TransactionError::Authorization),
        }

        let digest = self.compute_hash();
        self.signature = Some(wallet.sign(digest.as_bytes()));

        Ok(())
    }

    /// Checks the transaction's signature.
    ///
    /// Reward transactions are unconditionally valid. For wallet senders the
    /// stored signature is verified against the unsigned-field digest with
    /// the public key recovered from the sender address.
    pub fn is_valid(&self) -> Result<bool, TransactionError> {
        let sender = match &self.sender {
            Sender::Issued => return Ok(true),
            Sender::Wallet(address) => address,
        };

        let signature = self
            .signature
            .as_ref()
            .ok_or(TransactionError::MissingSignature)?;

        let digest = self.compute_hash();
        Ok(sender.verifies(digest.as_bytes(), signature)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_transaction_is_valid() {
        let sender = Wallet::generate();
        let recipient = Wallet::generate();

        let mut tx = Transaction::new(sender.address().clone(), recipient.address().clone(), 50.0);
        tx.sign(&sender).unwrap();

        assert!(tx.signature.is_some());
        assert!(tx.is_valid().unwrap());
    }

    #[test]
    fn unsigned_transaction_reports_missing_signature() {
        let sender = Wallet::generate();
        let recipient = Wallet::generate();

        let tx = Transaction::new(sender.address().clone(), recipient.address().clone(), 50.0);

        assert!(matches!(
            tx.is_valid(),
            Err(TransactionError::MissingSignature)
        ));
    }

    #[test]
    fn signing_for_another_sender_is_rejected() {
        let sender = Wallet::generate();
        let recipient = Wallet::generate();
        let attacker = Wallet::generate();

        let mut tx = Transaction::new(sender.address().clone(), recipient.address().clone(), 50.0);

        assert!(matches!(
            tx.sign(&attacker),
            Err(TransactionError::Authorization)
        ));
        assert!(tx.signature.is_none());
    }

    #[test]
    fn reward_transaction_is_always_valid() {
        let miner = Wallet::generate();

        let tx = Transaction::reward(miner.address().clone(), 100.0);

        assert!(tx.is_reward());
        assert!(tx.signature.is_none());
        assert!(tx.is_valid().unwrap());
    }

    #[test]
    fn tampered_amount_breaks_signature() {
        let sender = Wallet::generate();
        let recipient = Wallet::generate();

        let mut tx = Transaction::new(sender.address().clone(), recipient.address().clone(), 50.0);
        tx.sign(&sender).unwrap();

        tx.amount = 5000.0;
        assert!(!tx.is_valid().unwrap());
    }

    #[test]
    fn hash_excludes_signature() {
        let sender = Wallet::generate();
        let recipient = Wallet::generate();

        let mut tx = Transaction::new(sender.address().clone(), recipient.address().clone(), 50.0);
        let before = tx.compute_hash();
        tx.sign(&sender).unwrap();

        assert_eq!(before, tx.compute_hash());
    }
}
