//! Protocol-level constants for the Nxt-style consensus rule.

/// Base target assigned to the genesis block; defines the initial
/// difficulty before any retargeting has taken place.
pub const GENESIS_BASE_TARGET: u64 = 153_722_867;

/// Target average delay between blocks, in seconds.
pub const AVG_DELAY_SECS: u64 = 2;

/// Encoded length of `base_target` in a header, in bytes.
pub const BASE_TARGET_LENGTH: usize = 8;

/// Encoded length of a generation signature, in bytes.
pub const GENERATOR_SIGNATURE_LENGTH: usize = 32;
