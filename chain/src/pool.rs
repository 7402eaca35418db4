//! Unconfirmed transaction pool collaborator.
//!
//! Consensus and forging don't care how transactions are gossiped or
//! stored; they only need a way to select a batch for inclusion in a
//! block, and to drain the ones that made it in.

use crate::types::Transaction;

pub trait TxPool: Send + Sync {
    /// Selects up to `max_txs` not-yet-expired transactions for a
    /// candidate block at `now` (milliseconds), respecting `max_bytes` as
    /// a soft cap on their total serialized size.
    fn select_for_block(&mut self, max_txs: usize, max_bytes: usize, now: u64) -> Vec<Transaction>;

    /// Removes transactions that were included in an appended block.
    fn drain(&mut self, txs: &[Transaction]);
}

/// A simple FIFO in-memory pool, for tests and single-node demos.
#[derive(Default)]
pub struct InMemoryTxPool {
    pending: Vec<Transaction>,
}

impl InMemoryTxPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, tx: Transaction) {
        self.pending.push(tx);
    }
}

impl TxPool for InMemoryTxPool {
    fn select_for_block(&mut self, max_txs: usize, max_bytes: usize, now: u64) -> Vec<Transaction> {
        let mut selected = Vec::new();
        let mut used_bytes = 0usize;
        for tx in &self.pending {
            if selected.len() >= max_txs {
                break;
            }
            if tx.is_expired(now) {
                continue;
            }
            let len = tx.serialize().len();
            if used_bytes + len > max_bytes {
                continue;
            }
            used_bytes += len;
            selected.push(tx.clone());
        }
        selected
    }

    fn drain(&mut self, txs: &[Transaction]) {
        self.pending.retain(|tx| !txs.contains(tx));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecipientAddress, TxGenesis};

    fn genesis_tx(amount: u64) -> Transaction {
        Transaction::Genesis(TxGenesis {
            recipient: RecipientAddress([1u8; 25]),
            amount,
            timestamp: 0,
        })
    }

    #[test]
    fn select_respects_max_txs() {
        let mut pool = InMemoryTxPool::new();
        pool.submit(genesis_tx(1));
        pool.submit(genesis_tx(2));
        pool.submit(genesis_tx(3));

        let selected = pool.select_for_block(2, 10_000, 0);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn drain_removes_included_transactions() {
        let mut pool = InMemoryTxPool::new();
        let tx = genesis_tx(7);
        pool.submit(tx.clone());

        pool.drain(&[tx.clone()]);
        let selected = pool.select_for_block(10, 10_000, 0);
        assert!(selected.is_empty());
    }

    #[test]
    fn expired_transactions_are_skipped() {
        let mut pool = InMemoryTxPool::new();
        let tx = Transaction::Genesis(TxGenesis {
            recipient: RecipientAddress([1u8; 25]),
            amount: 1,
            timestamp: 0,
        });
        pool.submit(tx);

        let far_future = crate::types::Deadline(0).0 + 10 * 24 * 60 * 60 * 1000;
        let selected = pool.select_for_block(10, 10_000, far_future);
        assert!(selected.is_empty());
    }
}
