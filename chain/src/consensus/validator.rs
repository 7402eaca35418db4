//! Block validity predicates used by consensus.

use crate::types::Block;

use super::error::ValidationError;

/// Pluggable validity predicate for blocks.
///
/// Implementations should be deterministic and side-effect free. Structural
/// checks (signature, size) and consensus checks (hit/target, retarget) are
/// composed into a single predicate via [`CombinedValidator`].
pub trait BlockValidator {
    fn validate(&self, block: &Block) -> Result<(), ValidationError>;
}

/// A trivial validator that accepts every block. Useful for tests.
pub struct AcceptAllValidator;

impl BlockValidator for AcceptAllValidator {
    fn validate(&self, _block: &Block) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Composes two validators, running `a` then `b` and failing fast on the
/// first error.
pub struct CombinedValidator<A, B> {
    pub a: A,
    pub b: B,
}

impl<A, B> CombinedValidator<A, B> {
    pub fn new(a: A, b: B) -> Self {
        Self { a, b }
    }
}

impl<A, B> BlockValidator for CombinedValidator<A, B>
where
    A: BlockValidator,
    B: BlockValidator,
{
    fn validate(&self, block: &Block) -> Result<(), ValidationError> {
        self.a.validate(block)?;
        self.b.validate(block)?;
        Ok(())
    }
}
