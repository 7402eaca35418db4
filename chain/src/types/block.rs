//! Block entity: canonical byte layout, signing, and verification.
//!
//! Canonical header layout (everything that gets signed):
//!
//! ```text
//! version(1) || timestamp(8) || parentId(64) || consensusLen(4) || consensusBytes ||
//! txCount(4) || for each tx: txLen(4) || txBytes || generator(32)
//! ```
//!
//! `signature = Sign(generator_priv, SHA-256(header))` and `blockId` is
//! the 64-byte signature itself. The genesis block has no real signer;
//! its "signature" is a deterministic stretch of the header hash instead
//! (see [`Block::genesis`]), so it still gives every block a stable,
//! content-derived 64-byte id.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};

use crate::codec::{be, CodecError, Hash32};
use crate::types::error::BlockError;
use crate::types::tx::Transaction;
use crate::types::PublicKey;

/// 64-byte block identifier; equal to the block's signature.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub [u8; 64]);

impl BlockId {
    /// Sentinel used as the genesis block's `parentId`.
    pub const ZERO: BlockId = BlockId([0u8; 64]);

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl std::fmt::Debug for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BlockId({})", hex::encode(self.0))
    }
}

/// Nxt-style consensus data carried by every header: the base target
/// (difficulty) and the generation signature derived from the parent.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NxtConsensusData {
    pub base_target: u64,
    pub generation_signature: Hash32,
}

impl NxtConsensusData {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 32);
        be::write_u64(&mut out, self.base_target);
        out.extend_from_slice(&self.generation_signature.0);
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != 40 {
            return Err(CodecError::InvalidEncoding);
        }
        let mut pos = 0usize;
        let base_target = be::read_u64(bytes, &mut pos).ok_or(CodecError::InvalidEncoding)?;
        let gs = be::read_bytes(bytes, &mut pos, 32).ok_or(CodecError::InvalidEncoding)?;
        let mut gs_arr = [0u8; 32];
        gs_arr.copy_from_slice(gs);
        Ok(NxtConsensusData {
            base_target,
            generation_signature: Hash32(gs_arr),
        })
    }

    /// The genesis block's fixed consensus data.
    pub fn genesis() -> Self {
        NxtConsensusData {
            base_target: crate::consensus::params::GENESIS_BASE_TARGET,
            generation_signature: Hash32::ZERO,
        }
    }
}

/// Block header: everything that participates in signing.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub version: u8,
    pub timestamp: u64,
    pub parent_id: BlockId,
    pub consensus_data: NxtConsensusData,
    pub transactions: Vec<Transaction>,
    pub generator: PublicKey,
}

impl Header {
    /// Canonical byte layout used both for signing and for computing the
    /// block id (via the signature).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.version);
        be::write_u64(&mut out, self.timestamp);
        out.extend_from_slice(&self.parent_id.0);

        let consensus_bytes = self.consensus_data.encode();
        be::write_u32(&mut out, consensus_bytes.len() as u32);
        out.extend_from_slice(&consensus_bytes);

        be::write_u32(&mut out, self.transactions.len() as u32);
        for tx in &self.transactions {
            let tx_bytes = tx.serialize();
            be::write_u32(&mut out, tx_bytes.len() as u32);
            out.extend_from_slice(&tx_bytes);
        }

        out.extend_from_slice(&self.generator.0);
        out
    }

    pub fn header_hash(&self) -> Hash32 {
        Hash32::compute(&self.canonical_bytes())
    }

    fn parse(buf: &[u8], pos: &mut usize) -> Result<Self, BlockError> {
        let version = *buf.get(*pos).ok_or(BlockError::InvalidEncoding)?;
        *pos += 1;

        let timestamp = be::read_u64(buf, pos).ok_or(BlockError::InvalidEncoding)?;

        let parent_bytes = be::read_bytes(buf, pos, 64).ok_or(BlockError::InvalidEncoding)?;
        let mut parent_arr = [0u8; 64];
        parent_arr.copy_from_slice(parent_bytes);

        let consensus_len = be::read_u32(buf, pos).ok_or(BlockError::InvalidEncoding)? as usize;
        let consensus_bytes =
            be::read_bytes(buf, pos, consensus_len).ok_or(BlockError::InvalidEncoding)?;
        let consensus_data = NxtConsensusData::decode(consensus_bytes)?;

        let tx_count = be::read_u32(buf, pos).ok_or(BlockError::InvalidEncoding)? as usize;
        let mut transactions = Vec::with_capacity(tx_count);
        for _ in 0..tx_count {
            let tx_len = be::read_u32(buf, pos).ok_or(BlockError::InvalidEncoding)? as usize;
            let tx_bytes = be::read_bytes(buf, pos, tx_len).ok_or(BlockError::InvalidEncoding)?;
            transactions.push(Transaction::parse(tx_bytes)?);
        }

        let generator_bytes = be::read_bytes(buf, pos, 32).ok_or(BlockError::InvalidEncoding)?;
        let mut generator_arr = [0u8; 32];
        generator_arr.copy_from_slice(generator_bytes);

        Ok(Header {
            version,
            timestamp,
            parent_id: BlockId(parent_arr),
            consensus_data,
            transactions,
            generator: PublicKey(generator_arr),
        })
    }
}

/// A block: header plus the 64-byte signature that also serves as its id.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub signature: crate::types::SignatureBytes,
}

impl Block {
    /// Signs a non-genesis header with `signing_key`, which must match
    /// `header.generator`.
    pub fn sign(header: Header, signing_key: &ed25519_dalek::SigningKey) -> Self {
        let hash = header.header_hash();
        let sig = signing_key.sign(&hash.0);
        Block {
            header,
            signature: crate::types::SignatureBytes(sig.to_bytes()),
        }
    }

    /// Builds the genesis block. It is unsigned: its 64-byte id is a
    /// deterministic stretch of the header hash rather than an Ed25519
    /// signature, since there is no signing key behind it.
    pub fn genesis(transactions: Vec<Transaction>, generator: PublicKey, timestamp: u64) -> Self {
        let header = Header {
            version: 1,
            timestamp,
            parent_id: BlockId::ZERO,
            consensus_data: NxtConsensusData::genesis(),
            transactions,
            generator,
        };
        let hash = header.header_hash();
        let mut id = [0u8; 64];
        id[..32].copy_from_slice(&hash.0);
        id[32..].copy_from_slice(&Hash32::compute(&hash.0).0);
        Block {
            header,
            signature: crate::types::SignatureBytes(id),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.header.parent_id == BlockId::ZERO
    }

    pub fn block_id(&self) -> BlockId {
        BlockId(self.signature.0)
    }

    /// Invariant 1: the signature verifies against `generator` over the
    /// canonical header bytes. The genesis block is exempt (unsigned).
    pub fn verify_signature(&self) -> bool {
        if self.is_genesis() {
            return true;
        }
        let Ok(vk) = self.header.generator.to_verifying_key() else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&self.signature.0);
        let hash = self.header.header_hash();
        vk.verify(&hash.0, &sig).is_ok()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.header.canonical_bytes();
        out.extend_from_slice(&self.signature.0);
        out
    }

    /// Decodes a block from the wire and eagerly verifies its signature,
    /// so a block with tampered or mismatched bytes is rejected right at
    /// deserialization rather than surfacing as a generic decode error
    /// further down the validation pipeline.
    pub fn parse(buf: &[u8]) -> Result<Self, BlockError> {
        let mut pos = 0usize;
        let header = Header::parse(buf, &mut pos)?;
        let sig_bytes = be::read_bytes(buf, &mut pos, 64).ok_or(BlockError::InvalidEncoding)?;
        if pos != buf.len() {
            return Err(BlockError::InvalidEncoding);
        }
        let mut sig = [0u8; 64];
        sig.copy_from_slice(sig_bytes);
        let block = Block {
            header,
            signature: crate::types::SignatureBytes(sig),
        };
        if !block.verify_signature() {
            return Err(BlockError::InvalidSignature);
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecipientAddress;
    use rand::rngs::OsRng;

    fn dummy_tx(byte: u8) -> Transaction {
        Transaction::Genesis(crate::types::TxGenesis {
            recipient: RecipientAddress([byte; 25]),
            amount: 10,
            timestamp: 0,
        })
    }

    #[test]
    fn genesis_is_deterministic_and_unsigned() {
        let generator = PublicKey([7u8; 32]);
        let b1 = Block::genesis(vec![dummy_tx(1)], generator, 0);
        let b2 = Block::genesis(vec![dummy_tx(1)], generator, 0);
        assert_eq!(b1.block_id(), b2.block_id());
        assert_ne!(b1.block_id(), BlockId::ZERO);
        assert!(b1.verify_signature());
    }

    #[test]
    fn signed_block_roundtrips_and_verifies() {
        let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let generator = PublicKey::from_signing_key(&signing_key);

        let header = Header {
            version: 1,
            timestamp: 1_700_000_001,
            parent_id: BlockId([1u8; 64]),
            consensus_data: NxtConsensusData {
                base_target: 100,
                generation_signature: Hash32::compute(b"gensig"),
            },
            transactions: vec![dummy_tx(2), dummy_tx(3)],
            generator,
        };

        let block = Block::sign(header, &signing_key);
        assert!(block.verify_signature());
        assert!(!block.is_genesis());

        let bytes = block.serialize();
        let parsed = Block::parse(&bytes).expect("round trip");
        assert_eq!(parsed, block);
        assert_eq!(parsed.header.transactions.len(), 2);
    }

    #[test]
    fn tampered_header_fails_verification() {
        let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let generator = PublicKey::from_signing_key(&signing_key);

        let header = Header {
            version: 1,
            timestamp: 1,
            parent_id: BlockId([2u8; 64]),
            consensus_data: NxtConsensusData {
                base_target: 1,
                generation_signature: Hash32::ZERO,
            },
            transactions: vec![],
            generator,
        };

        let mut block = Block::sign(header, &signing_key);
        block.header.timestamp += 1;
        assert!(!block.verify_signature());
    }
}
