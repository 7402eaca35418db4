//! Top-level configuration for a chain node.
//!
//! This module aggregates configuration for:
//!
//! - consensus parameters (`ConsensusConfig`),
//! - the sync/forge controller (`SyncConfig`),
//! - persistent storage (RocksDB path and segment size for the
//!   authenticated store),
//! - the metrics exporter (enable flag + listen address).
//!
//! The goal is a single `NodeConfig` that `main.rs` can construct from
//! defaults, a config file, or environment variables.

use std::net::SocketAddr;

use crate::consensus::ConsensusConfig;
use crate::controller::SyncConfig;
use crate::storage::RocksDbConfig;

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        // Safe to unwrap: this is a fixed, valid address literal.
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Configuration for the authenticated segment store ([`crate::merkle`]).
#[derive(Clone, Debug)]
pub struct MerkleConfig {
    /// Segment size in bytes for the authenticated data tree.
    pub segment_size: usize,
}

impl Default for MerkleConfig {
    fn default() -> Self {
        Self {
            segment_size: crate::merkle::DEFAULT_SEGMENT_SIZE,
        }
    }
}

/// Top-level configuration for a chain node.
///
/// This aggregates all the sub-configs needed to wire up a typical node:
///
/// - consensus tuning (`consensus`),
/// - sync/forge controller cadence (`sync`),
/// - persistent storage (`storage`),
/// - the authenticated segment store (`merkle`),
/// - Prometheus metrics exporter (`metrics`).
#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    pub consensus: ConsensusConfig,
    pub sync: SyncConfig,
    pub storage: RocksDbConfig,
    pub merkle: MerkleConfig,
    pub metrics: MetricsConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_metrics_listen_addr() {
        let cfg = NodeConfig::default();
        assert_eq!(cfg.metrics.listen_addr.port(), 9898);
        assert!(cfg.metrics.enabled);
    }
}
