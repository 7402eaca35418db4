//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed consensus/sync metrics, and an
//! async HTTP exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{self, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

/// Consensus and sync metrics.
#[derive(Clone)]
pub struct ConsensusMetrics {
    /// Latency of a single `append_block` call, in seconds.
    pub block_append_seconds: Histogram,
    /// Total blocks rejected by the tree (any `AppendError` variant).
    pub blocks_rejected_total: IntCounter,
    /// Height of the best chain.
    pub chain_height: Gauge,
    /// Cumulative score of the best chain.
    pub chain_score: Gauge,
    /// Current controller FSM state: 0 = offline, 1 = syncing, 2 = generating.
    pub sync_state: Gauge,
    /// Total forging attempts (across all wallet accounts).
    pub forge_attempts_total: IntCounter,
    /// Total blocks successfully forged locally.
    pub forged_blocks_total: IntCounter,
}

impl ConsensusMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let block_append_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consensus_block_append_seconds",
                "Time to validate and append a candidate block, in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(block_append_seconds.clone()))?;

        let blocks_rejected_total = IntCounter::with_opts(Opts::new(
            "consensus_blocks_rejected_total",
            "Total number of candidate blocks rejected on append",
        ))?;
        registry.register(Box::new(blocks_rejected_total.clone()))?;

        let chain_height = Gauge::with_opts(Opts::new(
            "consensus_chain_height",
            "Height of the best chain's tip",
        ))?;
        registry.register(Box::new(chain_height.clone()))?;

        let chain_score = Gauge::with_opts(Opts::new(
            "consensus_chain_score",
            "Cumulative score of the best chain's tip",
        ))?;
        registry.register(Box::new(chain_score.clone()))?;

        let sync_state = Gauge::with_opts(Opts::new(
            "sync_controller_state",
            "Controller FSM state: 0=offline, 1=syncing, 2=generating",
        ))?;
        registry.register(Box::new(sync_state.clone()))?;

        let forge_attempts_total = IntCounter::with_opts(Opts::new(
            "forge_attempts_total",
            "Total forging attempts across all wallet accounts",
        ))?;
        registry.register(Box::new(forge_attempts_total.clone()))?;

        let forged_blocks_total = IntCounter::with_opts(Opts::new(
            "forge_blocks_total",
            "Total blocks successfully forged locally",
        ))?;
        registry.register(Box::new(forged_blocks_total.clone()))?;

        Ok(Self {
            block_append_seconds,
            blocks_rejected_total,
            chain_height,
            chain_score,
            sync_state,
            forge_attempts_total,
            forged_blocks_total,
        })
    }
}

/// Wrapper around a Prometheus registry and the consensus metrics. Wrap in
/// an [`Arc`] and share across the controller and forging worker.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub consensus: ConsensusMetrics,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("nxtchain".to_string()), None)?;
        let consensus = ConsensusMetrics::register(&registry)?;
        Ok(Self {
            registry,
            consensus,
        })
    }

    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "failed to encode Prometheus metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics on `GET /metrics`.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                tracing::warn!(error = %err, "prometheus HTTP connection error");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}
