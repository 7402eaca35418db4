// src/main.rs
//
// Minimal demo node that wires up the chain library:
//
// - RocksDB-backed block tree, reconstructed on boot if non-empty
// - Nxt-style consensus via the sync/forge controller
// - a single demo forging account with a fixed effective balance
// - no real peers (offline generation), so the node forges on its own
// - Prometheus metrics exporter on /metrics

use std::sync::Arc;

use rand::rngs::OsRng;

use nxtchain::{
    BlockId, BlockTree, Controller, ControllerMessage, FixedBalanceLedger, InMemoryTxPool,
    MetricsRegistry, NoPeersNetwork, NodeConfig, PublicKey, RocksDbStorage, StaticWallet,
    SystemClock, Transaction, TxGenesis, controller, run_prometheus_http_server,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run_node().await {
        tracing::error!(error = %err, "fatal error");
        std::process::exit(1);
    }
}

async fn run_node() -> Result<(), String> {
    let cfg = NodeConfig::default();

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::warn!(error = %e, "metrics HTTP server error");
            }
        });
        tracing::info!(%addr, "metrics exporter listening on /metrics");
    }

    // ---------------------------
    // Storage + block tree
    // ---------------------------

    let storage: RocksDbStorage<BlockId, nxtchain::Block> = RocksDbStorage::open(&cfg.storage)
        .map_err(|e| format!("failed to open RocksDB store at {:?}: {e:?}", cfg.storage.path))?;

    let existing_blocks = storage.iter_values();
    let tree = if existing_blocks.is_empty() {
        let mut tree = BlockTree::new(storage, &cfg.consensus);
        let genesis_tx = Transaction::Genesis(TxGenesis {
            recipient: nxtchain::RecipientAddress([0u8; 25]),
            amount: 1_000_000_000,
            timestamp: 0,
        });
        let genesis = nxtchain::Block::genesis(vec![genesis_tx], PublicKey([0u8; 32]), 0);
        tree.append_block(genesis, 0)
            .map_err(|e| format!("failed to append genesis block: {e}"))?;
        tree
    } else {
        BlockTree::rebuild(storage, existing_blocks, &cfg.consensus)
    };
    tracing::info!(height = tree.height(), score = %tree.score(), "block tree ready");

    // ---------------------------
    // Demo forging identity
    // ---------------------------

    let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
    let wallet = StaticWallet::new(vec![signing_key], 1_000_000);
    let ledger = FixedBalanceLedger::new(1_000_000);

    // ---------------------------
    // Controller
    // ---------------------------

    let (sender, receiver) = controller::channel();
    let mut sync_cfg = cfg.sync.clone();
    sync_cfg.offline_generation = true;

    let ctl = Controller::new(
        tree,
        InMemoryTxPool::new(),
        wallet,
        NoPeersNetwork,
        ledger,
        Arc::new(SystemClock),
        sync_cfg,
        cfg.consensus.clone(),
        Some(metrics.clone()),
        sender.clone(),
    );

    let ticker = controller::spawn_ticker(sender.clone());

    // No real peer ever answers `GetMaxChainScore` here, since this demo
    // runs with `NoPeersNetwork`. Feed the controller `MaxChainScore(None)`
    // directly on the same cadence, standing in for "no peer responded".
    let no_peer_sender = sender.clone();
    let no_peer_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            interval.tick().await;
            if no_peer_sender.send(ControllerMessage::MaxChainScore(None)).is_err() {
                return;
            }
        }
    });

    tracing::info!("starting node (offline generation enabled, no peers)");
    let run_handle = tokio::spawn(ctl.run(receiver));
    drop(sender);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for ctrl-c: {e}"))?;
    tracing::info!("shutdown signal received, flushing storage");

    ticker.abort();
    no_peer_task.abort();

    let mut ctl = run_handle
        .await
        .map_err(|e| format!("controller task panicked: {e}"))?;
    ctl.close_storage();
    Ok(())
}
