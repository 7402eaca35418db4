//! Consensus configuration parameters.

use super::params;

/// Protocol-level and implementation-level knobs for the consensus
/// engine.
#[derive(Clone, Debug)]
pub struct ConsensusConfig {
    /// Target average delay between blocks, in seconds.
    pub avg_delay_secs: u64,
    /// Soft limit on the number of transactions per block.
    pub max_block_txs: usize,
    /// Soft limit on the total serialized size of a block, in bytes.
    pub max_block_size_bytes: usize,
    /// How far into the future (seconds) a block timestamp may be
    /// relative to the local clock before it is rejected.
    pub max_future_drift_secs: u64,
    /// Whether to allow empty blocks when the transaction pool is empty.
    pub allow_empty_blocks: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            avg_delay_secs: params::AVG_DELAY_SECS,
            max_block_txs: 10_000,
            max_block_size_bytes: 1_000_000,
            max_future_drift_secs: 15,
            allow_empty_blocks: true,
        }
    }
}
