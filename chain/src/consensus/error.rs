//! Error types for the consensus layer.

/// Why a block failed a validity predicate.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("signature does not verify against the generator's public key")]
    BadSignature,
    #[error("timestamp {block} is not after parent timestamp {parent}")]
    TimestampNotMonotonic { parent: u64, block: u64 },
    #[error("timestamp {0} is too far in the future")]
    TimestampInFuture(u64),
    #[error("generation signature does not match the expected value derived from the parent")]
    BadGenerationSignature,
    #[error("base target {found} does not match the expected retargeted value {expected}")]
    BadBaseTarget { expected: u64, found: u64 },
    #[error("hit {hit} does not fall under target {target} for the claimed deadline")]
    HitExceedsTarget { hit: u128, target: u128 },
    #[error("block carries {found} transactions, more than the limit of {limit}")]
    TooManyTransactions { limit: usize, found: usize },
    #[error("block is {found} bytes, more than the limit of {limit}")]
    BlockTooLarge { limit: usize, found: usize },
    #[error("transaction failed structural validity: {0}")]
    InvalidTransaction(&'static str),
}

/// High-level errors raised while importing or forging blocks.
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("parent block {0:?} is not present in the tree")]
    ParentMissing(crate::types::BlockId),
    #[error("block {0:?} is already present in the tree")]
    AlreadyPresent(crate::types::BlockId),
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}
