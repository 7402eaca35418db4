//! Balance ledger collaborator.
//!
//! Effective balance backs the hit/target computation (spec: `target(P,
//! tp, G, now) = P.baseTarget * eta * effectiveBalance(G)`) and the
//! controller's "apply state transitions" step on block import. Full
//! transaction-driven balance accounting is out of scope; this is the
//! minimal seam the core consults and updates, mirroring [`crate::pool`]
//! and [`crate::wallet`].

use crate::types::{Block, PublicKey};

pub trait BalanceLedger: Send + Sync {
    /// The stake backing `account`, as of the current best chain tip.
    fn effective_balance(&self, account: &PublicKey) -> u64;

    /// Applies a newly appended block's transactions. Mutation is
    /// external to the core (spec: "update balance sheet; mutation is
    /// external"); the controller calls this once per appended block.
    fn apply_block(&mut self, block: &Block);
}

/// A ledger reporting the same fixed balance for every account, for
/// tests and single-node demos where stake accounting isn't exercised.
#[derive(Clone, Copy, Debug)]
pub struct FixedBalanceLedger {
    pub balance: u64,
}

impl FixedBalanceLedger {
    pub fn new(balance: u64) -> Self {
        Self { balance }
    }
}

impl BalanceLedger for FixedBalanceLedger {
    fn effective_balance(&self, _account: &PublicKey) -> u64 {
        self.balance
    }

    fn apply_block(&mut self, _block: &Block) {}
}
