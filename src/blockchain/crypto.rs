use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

/// Errors that can occur while handling keys and signatures
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// A wallet address: the base58 encoding of an Ed25519 public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Recovers the public key this address encodes.
    pub fn to_public_key(&self) -> Result<VerifyingKey, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let key_bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey("wrong public key length".to_string()))?;

        VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    /// Checks whether `signature` is a valid signature over `message` by the
    /// key this address encodes.
    pub fn verifies(
        &self,
        message: &[u8],
        signature: &DigitalSignature,
    ) -> Result<bool, CryptoError> {
        let public_key = self.to_public_key()?;
        let signature = signature.to_signature()?;

        Ok(public_key.verify(message, &signature).is_ok())
    }
}

impl From<&VerifyingKey> for Address {
    fn from(public_key: &VerifyingKey) -> Self {
        Address(bs58::encode(public_key.as_bytes()).into_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        bs58::decode(s)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        Ok(Address(s.to_string()))
    }
}

/// A base58-encoded Ed25519 signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalSignature(pub String);

impl DigitalSignature {
    fn from_signature(signature: &Signature) -> Self {
        DigitalSignature(bs58::encode(signature.to_bytes()).into_string())
    }

    fn to_signature(&self) -> Result<Signature, CryptoError> {
        let bytes = bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| CryptoError::DecodingError(e.to_string()))?;

        let signature_bytes: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature("wrong signature length".to_string()))?;

        Ok(Signature::from_bytes(&signature_bytes))
    }
}

/// An Ed25519 keypair together with its derived address.
///
/// The engine itself never holds private keys; wallets live with the caller
/// and are only borrowed to sign transactions.
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Generates a wallet with a fresh random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let address = Address::from(&signing_key.verifying_key());

        Wallet {
            signing_key,
            address,
        }
    }

    /// Rebuilds a wallet from a previously exported secret key.
    pub fn from_secret_key(secret_key_bytes: &[u8]) -> Result<Self, CryptoError> {
        let key_bytes: [u8; 32] = secret_key_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKey("wrong private key length".to_string()))?;

        let signing_key = SigningKey::from_bytes(&key_bytes);
        let address = Address::from(&signing_key.verifying_key());

        Ok(Wallet {
            signing_key,
            address,
        })
    }

    /// The address derived from this wallet's public key.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Signs a message with this wallet's private key.
    pub fn sign(&self, message: &[u8]) -> DigitalSignature {
        DigitalSignature::from_signature(&self.signing_key.sign(message))
    }

    /// Exports the secret key so the wallet can be rebuilt later.
    pub fn secret_key_bytes(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_wallet_has_address() {
        let wallet = Wallet::generate();
        assert!(!wallet.address().0.is_empty());
    }

    #[test]
    fn sign_and_verify() {
        let wallet = Wallet::generate();
        let message = b"transfer 50 coins";

        let signature = wallet.sign(message);
        assert!(wallet.address().verifies(message, &signature).unwrap());

        // A different message must not verify against the same signature
        assert!(!wallet
            .address()
            .verifies(b"transfer 5000 coins", &signature)
            .unwrap());
    }

    #[test]
    fn signature_from_other_key_rejected() {
        let signer = Wallet::generate();
        let other = Wallet::generate();
        let message = b"payload";

        let signature = signer.sign(message);
        assert!(!other.address().verifies(message, &signature).unwrap());
    }

    #[test]
    fn address_round_trips_to_public_key() {
        let wallet = Wallet::generate();
        let public_key = wallet.address().to_public_key().unwrap();
        assert_eq!(Address::from(&public_key), *wallet.address());
    }

    #[test]
    fn wallet_round_trips_through_secret_key() {
        let wallet = Wallet::generate();
        let restored = Wallet::from_secret_key(&wallet.secret_key_bytes()).unwrap();
        assert_eq!(restored.address(), wallet.address());
    }

    #[test]
    fn malformed_address_rejected() {
        let wallet = Wallet::generate();
        let signature = wallet.sign(b"msg");

        let bogus = Address("not-base58-0OIl".to_string());
        assert!(bogus.verifies(b"msg", &signature).is_err());
    }
}
