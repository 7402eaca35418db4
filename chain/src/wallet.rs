//! Forging-accounts collaborator.
//!
//! The controller's "attempt forging across all wallet accounts" step
//! (spec section 4.6, state **Generating**) needs a source of signing
//! identities and their effective balances. Wallet key management proper
//! is out of scope; this trait is the minimal seam the core consumes,
//! mirroring the teacher's `TxPool`-as-collaborator pattern.

use ed25519_dalek::SigningKey;

use crate::types::PublicKey;

pub trait ForgingAccounts: Send + Sync {
    /// Every account this node can forge with, as `(account, signing key)`
    /// pairs. Returns an empty vec if the wallet is locked or has no
    /// accounts (forging then yields `None` for every account).
    fn accounts(&self) -> Vec<(PublicKey, SigningKey)>;

    /// The stake backing `account` as of the current best chain tip.
    /// Balance accounting lives outside the core; this is read-only.
    fn effective_balance(&self, account: &PublicKey) -> u64;
}

/// An in-memory wallet for tests and demos: a fixed set of signing keys
/// with a fixed effective balance.
pub struct StaticWallet {
    accounts: Vec<(PublicKey, SigningKey)>,
    balance: u64,
}

impl StaticWallet {
    pub fn new(accounts: Vec<SigningKey>, balance: u64) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|sk| (PublicKey::from_signing_key(&sk), sk))
            .collect();
        Self { accounts, balance }
    }
}

impl ForgingAccounts for StaticWallet {
    fn accounts(&self) -> Vec<(PublicKey, SigningKey)> {
        self.accounts.clone()
    }

    fn effective_balance(&self, _account: &PublicKey) -> u64 {
        self.balance
    }
}
