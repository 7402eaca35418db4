//! Structural validity predicate for blocks: cheap, deterministic checks
//! that don't need the parent's consensus data (invariants 1, 3, 4 plus
//! the soft size/count limits).

use crate::consensus::config::ConsensusConfig;
use crate::consensus::error::ValidationError;
use crate::consensus::validator::BlockValidator;
use crate::types::Block;

#[derive(Clone, Debug)]
pub struct StructuralValidity {
    max_block_txs: usize,
    max_block_size_bytes: usize,
}

impl StructuralValidity {
    pub fn new(cfg: &ConsensusConfig) -> Self {
        Self {
            max_block_txs: cfg.max_block_txs,
            max_block_size_bytes: cfg.max_block_size_bytes,
        }
    }

    fn check_signature(&self, block: &Block) -> Result<(), ValidationError> {
        if block.verify_signature() {
            Ok(())
        } else {
            Err(ValidationError::BadSignature)
        }
    }

    fn check_tx_count(&self, block: &Block) -> Result<(), ValidationError> {
        let found = block.header.transactions.len();
        if found > self.max_block_txs {
            return Err(ValidationError::TooManyTransactions {
                limit: self.max_block_txs,
                found,
            });
        }
        Ok(())
    }

    fn check_block_size(&self, block: &Block) -> Result<(), ValidationError> {
        let found = block.serialize().len();
        if found > self.max_block_size_bytes {
            return Err(ValidationError::BlockTooLarge {
                limit: self.max_block_size_bytes,
                found,
            });
        }
        Ok(())
    }

    fn check_transactions_structurally_valid(&self, block: &Block) -> Result<(), ValidationError> {
        for tx in &block.header.transactions {
            if !tx.is_structurally_valid() {
                return Err(ValidationError::InvalidTransaction(
                    "fee, signature, or amount invariant violated",
                ));
            }
        }
        Ok(())
    }
}

impl BlockValidator for StructuralValidity {
    fn validate(&self, block: &Block) -> Result<(), ValidationError> {
        self.check_signature(block)?;
        self.check_tx_count(block)?;
        self.check_block_size(block)?;
        self.check_transactions_structurally_valid(block)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockId, Header, NxtConsensusData, PublicKey, RecipientAddress, TxGenesis};
    use rand::rngs::OsRng;

    fn cfg(max_txs: usize, max_size: usize) -> ConsensusConfig {
        ConsensusConfig {
            max_block_txs: max_txs,
            max_block_size_bytes: max_size,
            ..ConsensusConfig::default()
        }
    }

    fn signed_block(tx_count: usize) -> Block {
        let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
        let generator = PublicKey::from_signing_key(&signing_key);
        let transactions = (0..tx_count)
            .map(|i| {
                crate::types::Transaction::Genesis(TxGenesis {
                    recipient: RecipientAddress([i as u8; 25]),
                    amount: 1,
                    timestamp: 0,
                })
            })
            .collect();
        let header = Header {
            version: 1,
            timestamp: 1,
            parent_id: BlockId([1u8; 64]),
            consensus_data: NxtConsensusData::genesis(),
            transactions,
            generator,
        };
        Block::sign(header, &signing_key)
    }

    #[test]
    fn accepts_well_formed_block() {
        let v = StructuralValidity::new(&cfg(10, 1_000_000));
        assert!(v.validate(&signed_block(2)).is_ok());
    }

    #[test]
    fn rejects_too_many_transactions() {
        let v = StructuralValidity::new(&cfg(1, 1_000_000));
        let err = v.validate(&signed_block(2)).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::TooManyTransactions { limit: 1, found: 2 }
        ));
    }

    #[test]
    fn rejects_oversized_block() {
        let v = StructuralValidity::new(&cfg(10, 1));
        let err = v.validate(&signed_block(1)).unwrap_err();
        assert!(matches!(err, ValidationError::BlockTooLarge { .. }));
    }

    #[test]
    fn rejects_tampered_signature() {
        let v = StructuralValidity::new(&cfg(10, 1_000_000));
        let mut block = signed_block(1);
        block.header.timestamp += 1;
        let err = v.validate(&block).unwrap_err();
        assert_eq!(err, ValidationError::BadSignature);
    }
}
