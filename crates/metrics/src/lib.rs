//! Metrics and tracing setup for etcdkit.
//!
//! Provides a global [`ClientMetrics`] singleton backed by the `prometheus`
//! crate and a text encoder for dumping it.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::OnceLock;

// ────────────────────────── Tracing ──────────────────────────

/// Initialize the tracing subscriber with env-filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

// ────────────────────────── Prometheus metrics ──────────────────────────

/// Global metrics instance.
static METRICS: OnceLock<ClientMetrics> = OnceLock::new();

/// Retrieve (or lazily create) the global metrics singleton.
pub fn metrics() -> &'static ClientMetrics {
    METRICS.get_or_init(ClientMetrics::new)
}

/// All Prometheus metrics for an etcdkit client process.
pub struct ClientMetrics {
    pub registry: Registry,

    // ── Calls (one per put/get, regardless of attempts) ──
    pub calls: IntCounterVec,
    pub call_latency_secs: HistogramVec,

    // ── Attempts (one per endpoint tried) ──
    pub attempts: IntCounterVec,
    pub failovers: IntCounter,

    // ── Transport RPC latency ──
    pub rpc_latency_secs: HistogramVec,
}

// Manual Debug impl because prometheus types don't derive Debug.
impl std::fmt::Debug for ClientMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientMetrics").finish_non_exhaustive()
    }
}

/// Default histogram buckets (seconds) for call/RPC latency.
const LATENCY_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

impl ClientMetrics {
    fn new() -> Self {
        let registry = Registry::new();

        let calls = IntCounterVec::new(
            Opts::new("etcdkit_calls_total", "Client calls, by operation and outcome"),
            &["op", "outcome"],
        )
        .expect("calls counter vec");
        let call_latency_secs = HistogramVec::new(
            HistogramOpts::new(
                "etcdkit_call_latency_seconds",
                "End-to-end call latency in seconds, including failover",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
            &["op"],
        )
        .expect("call_latency_secs histogram");

        let attempts = IntCounterVec::new(
            Opts::new(
                "etcdkit_attempts_total",
                "Per-endpoint attempts, by operation and outcome",
            ),
            &["op", "outcome"],
        )
        .expect("attempts counter vec");
        let failovers = IntCounter::with_opts(Opts::new(
            "etcdkit_failovers_total",
            "Times a call moved on to the next endpoint",
        ))
        .expect("failovers counter");

        let rpc_latency_secs = HistogramVec::new(
            HistogramOpts::new("etcdkit_rpc_latency_seconds", "Transport RPC latency in seconds")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["op"],
        )
        .expect("rpc_latency_secs histogram");

        // Register all metrics
        registry
            .register(Box::new(calls.clone()))
            .expect("register calls");
        registry
            .register(Box::new(call_latency_secs.clone()))
            .expect("register call_latency_secs");
        registry
            .register(Box::new(attempts.clone()))
            .expect("register attempts");
        registry
            .register(Box::new(failovers.clone()))
            .expect("register failovers");
        registry
            .register(Box::new(rpc_latency_secs.clone()))
            .expect("register rpc_latency_secs");

        Self {
            registry,
            calls,
            call_latency_secs,
            attempts,
            failovers,
            rpc_latency_secs,
        }
    }
}

/// Encode all registered metrics in Prometheus text exposition format.
pub fn encode_metrics() -> String {
    let m = metrics();
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&m.registry.gather(), &mut buf)
        .expect("prometheus text encoding");
    String::from_utf8(buf).expect("prometheus output is valid UTF-8")
}

/// Helper: start a call latency timer. Records elapsed time on drop.
pub fn start_call_timer(op: &str) -> prometheus::HistogramTimer {
    metrics()
        .call_latency_secs
        .with_label_values(&[op])
        .start_timer()
}

/// Helper: start a transport RPC latency timer.
pub fn start_rpc_timer(op: &str) -> prometheus::HistogramTimer {
    metrics()
        .rpc_latency_secs
        .with_label_values(&[op])
        .start_timer()
}

// ────────────────────────── Tests ──────────────────────────
