use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::{LazyLock, Once};

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Voucher counters
pub static VOUCHERS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("nitro_auth_vouchers_total", "Vouchers received by outcome"),
        &["outcome"],
    )
    .unwrap()
});

pub static CHANNELS_OPENED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "nitro_auth_channels_opened_total",
        "Bearer tokens issued for previously unseen channels",
    )
    .unwrap()
});

pub static LEDGER_CHANNELS: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new("nitro_auth_ledger_channels", "Channels held in the credit ledger").unwrap()
});

pub static VERIFIER_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "nitro_auth_verifier_latency_seconds",
            "Voucher verification latency",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

// Metering counters
pub static AUTHORIZATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nitro_auth_authorizations_total",
            "Metering decisions by outcome",
        ),
        &["outcome"],
    )
    .unwrap()
});

// Proxy metrics
pub static RPC_FORWARDED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "nitro_auth_rpc_forwarded_total",
            "JSON-RPC calls forwarded upstream, per allow-listed method",
        ),
        &["method"],
    )
    .unwrap()
});

pub static UPSTREAM_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "nitro_auth_upstream_errors_total",
        "Forwards that failed to reach the upstream node",
    )
    .unwrap()
});

pub static UPSTREAM_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("nitro_auth_upstream_latency_seconds", "Upstream forward latency")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

static REGISTER: Once = Once::new();

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(VOUCHERS_TOTAL.clone()),
            Box::new(CHANNELS_OPENED.clone()),
            Box::new(LEDGER_CHANNELS.clone()),
            Box::new(VERIFIER_LATENCY.clone()),
            Box::new(AUTHORIZATIONS_TOTAL.clone()),
            Box::new(RPC_FORWARDED_TOTAL.clone()),
            Box::new(UPSTREAM_ERRORS.clone()),
            Box::new(UPSTREAM_LATENCY.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!(error = %e, "failed to register metric");
            }
        }
    });
}

/// Render the registry in Prometheus text format.
pub fn metrics_output() -> Result<String, prometheus::Error> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
