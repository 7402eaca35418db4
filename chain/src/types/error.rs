//! Transaction/block decode errors (spec component C3).
//!
//! Distinct from [`crate::codec::CodecError`]: that one covers the
//! low-level byte helpers (Base58, fixed-width ints), while this one
//! covers the higher-level `typeId`-dispatched decode of a transaction
//! or block, which has a failure mode the codec layer doesn't —
//! an unrecognized `typeId` byte.

use crate::codec::CodecError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("invalid encoding")]
    InvalidEncoding,
    #[error("unknown transaction type id: {0}")]
    UnknownTransactionType(u8),
    #[error("signature does not verify")]
    InvalidSignature,
}

impl From<CodecError> for BlockError {
    fn from(_: CodecError) -> Self {
        BlockError::InvalidEncoding
    }
}
