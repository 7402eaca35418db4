//! Core domain types shared across the chain: account/key newtypes plus
//! the block and transaction entities.
//!
//! As in the teacher's layout, the goal is to avoid naked byte buffers in
//! public APIs: every fixed-width field gets its own type instead of a
//! bare `[u8; N]` or `Vec<u8>`.

pub mod block;
pub mod error;
pub mod tx;

pub use block::{Block, BlockId, Header, NxtConsensusData};
pub use error::BlockError;
pub use tx::{Deadline, Transaction, TxGenesis, TxPayment};

use crate::codec::{base58, CodecError, Hash32};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

/// An Ed25519 public key: the block generator field, and a transaction
/// signer/recipient identity.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn from_signing_key(sk: &SigningKey) -> Self {
        PublicKey(sk.verifying_key().to_bytes())
    }

    pub fn to_verifying_key(&self) -> Result<VerifyingKey, CodecError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| CodecError::InvalidEncoding)
    }

    /// Account identifier rendered as Base58, e.g. for logs or a CLI.
    pub fn to_base58(&self) -> String {
        base58::encode(&self.0)
    }

    pub fn from_base58(s: &str) -> Result<Self, CodecError> {
        let bytes = base58::decode(s)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CodecError::InvalidEncoding)?;
        Ok(PublicKey(arr))
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_base58())
    }
}

/// A detached Ed25519 signature, always exactly 64 bytes.
#[derive(Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct SignatureBytes(pub [u8; 64]);

impl std::fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignatureBytes({})", hex::encode(self.0))
    }
}

/// A fixed-width recipient address used by payment transactions.
///
/// The spec's wire layout fixes this field at 25 bytes regardless of the
/// 32-byte public keys used elsewhere; it is treated as an opaque account
/// handle rather than interpreted further by the core.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RecipientAddress(pub [u8; 25]);

impl RecipientAddress {
    /// Derives a recipient address by hashing a public key down to 25 bytes.
    ///
    /// This is a convenience for constructing test fixtures and demo
    /// payments from a generator/account public key; the core does not
    /// otherwise interpret recipient addresses.
    pub fn from_public_key(pk: &PublicKey) -> Self {
        let h = Hash32::compute(&pk.0);
        let mut out = [0u8; 25];
        out.copy_from_slice(&h.0[..25]);
        RecipientAddress(out)
    }
}

impl std::fmt::Debug for RecipientAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecipientAddress({})", hex::encode(self.0))
    }
}
