//! Chain library crate.
//!
//! This crate provides the core building blocks for a Nxt-style
//! delegated proof-of-stake chain:
//!
//! - strongly-typed domain types and canonical serialization (`types`),
//! - hash and codec primitives (`codec`),
//! - an authenticated segment store with Merkle proofs (`merkle`),
//! - persistent key-value storage backends (`storage`),
//! - the base-target consensus engine (`consensus`),
//! - structural block validity predicates (`validation`),
//! - the content-addressed block tree / fork store (`tree`),
//! - external collaborator seams the core consults (`time`, `wallet`,
//!   `pool`, `ledger`, `network`),
//! - the sync/forge controller actor (`controller`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! `main.rs` composes these pieces into the `nxt-node` binary.

pub mod codec;
pub mod config;
pub mod consensus;
pub mod controller;
pub mod ledger;
pub mod merkle;
pub mod metrics;
pub mod network;
pub mod pool;
pub mod storage;
pub mod time;
pub mod tree;
pub mod types;
pub mod validation;
pub mod wallet;

// Re-export top-level configuration types.
pub use config::{MerkleConfig, MetricsConfig, NodeConfig};

// Re-export "core" consensus types and traits.
pub use consensus::{AcceptAllValidator, BlockValidator, CombinedValidator, ConsensusConfig, ConsensusError, ValidationError};

// Re-export the controller actor.
pub use controller::{channel, spawn_ticker, Controller, ControllerMessage, SyncConfig, SyncState};

// Re-export the balance ledger collaborator.
pub use ledger::{BalanceLedger, FixedBalanceLedger};

// Re-export the Merkle authenticated store.
pub use merkle::{AuthDataBlock, MerkleTree, DEFAULT_SEGMENT_SIZE};

// Re-export the metrics registry and exporter.
pub use metrics::{ConsensusMetrics, MetricsRegistry, run_prometheus_http_server};

// Re-export the network collaborator.
pub use network::{NetworkHandle, NetworkMessage, NoPeersNetwork, PeerData};

// Re-export the unconfirmed transaction pool collaborator.
pub use pool::{InMemoryTxPool, TxPool};

// Re-export storage backends.
pub use storage::{InMemoryStorage, RocksDbConfig, RocksDbStorage, Storage, StorageError};

// Re-export the wall-clock collaborator.
pub use time::{Clock, SystemClock};

// Re-export the block tree / fork store.
pub use tree::{AppendError, BlockTree, BlockTreeNode};

// Re-export block/structural validity.
pub use validation::StructuralValidity;

// Re-export the forging-accounts collaborator.
pub use wallet::{ForgingAccounts, StaticWallet};

// Re-export domain types at the crate root for convenience.
pub use types::*;
