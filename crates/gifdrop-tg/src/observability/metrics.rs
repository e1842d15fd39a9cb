use crate::config::from_env_or_panic;
use crate::observability::GLOBAL_LABELS;
use crate::util::units::{KB, MB};
use metrics_exporter_prometheus::Matcher;
use serde::Deserialize;

/// Histogram buckets to measure the distribution of request durations in seconds
const DEFAULT_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

const KB_F: f64 = KB as f64;
const MB_F: f64 = MB as f64;

/// Buckets for the artifact size histograms
const DEFAULT_BLOB_SIZE_BUCKETS: &[f64] = &[
    KB_F * 4.,
    KB_F * 16.,
    KB_F * 64.,
    KB_F * 256.,
    MB_F * 1.,
    MB_F * 2.,
    MB_F * 4.,
    MB_F * 6.,
    MB_F * 8.,
    MB_F * 10.,
    MB_F * 20.,
    MB_F * 50.,
];

#[derive(Deserialize)]
struct MetricsConfig {
    /// The Prometheus endpoint doubles as the deployment liveness probe:
    /// it responds 200 to any GET while the process is healthy.
    #[serde(default = "default_port")]
    port: u16,
}

fn default_port() -> u16 {
    2000
}

pub fn init_metrics() {
    let config: MetricsConfig = from_env_or_panic("METRICS_");

    let mut builder = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.port))
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_owned()),
            DEFAULT_DURATION_BUCKETS,
        )
        .expect("BUG: the duration buckets are non-empty")
        .set_buckets_for_metric(
            Matcher::Suffix("size_bytes".to_owned()),
            DEFAULT_BLOB_SIZE_BUCKETS,
        )
        .expect("BUG: the size buckets are non-empty");

    for (key, value) in GLOBAL_LABELS {
        builder = builder.add_global_label(*key, *value);
    }

    builder
        .install()
        .expect("BUG: failed to initialize the metrics listener");
}
