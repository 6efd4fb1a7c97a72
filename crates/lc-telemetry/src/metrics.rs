//! Prometheus metrics for the material status sync core.
//!
//! All metrics follow the naming convention: `lc_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., rollbacks_total)
//! - **Gauge**: Value that can go up or down (e.g., store_version)
//! - **Histogram**: Distribution of values (e.g., remote_request_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts,
    HistogramVec, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Process-wide registry every sync metric lives in.
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // STATUS CHANGES
    // =========================================================================

    /// Status change requests by outcome
    pub static ref STATUS_CHANGES: CounterVec = CounterVec::new(
        Opts::new("lc_material_status_changes_total", "Material status change requests"),
        &["outcome"]  // outcome: committed/rolled_back/rejected
    ).expect("metric creation failed");

    /// Optimistic updates reverted after a remote failure
    pub static ref ROLLBACKS: Counter = Counter::new(
        "lc_material_rollbacks_total",
        "Optimistic updates reverted after a failed remote call"
    ).expect("metric creation failed");

    // =========================================================================
    // STORE
    // =========================================================================

    /// Authoritative refetches by result
    pub static ref REFETCHES: CounterVec = CounterVec::new(
        Opts::new("lc_store_refetches_total", "Authoritative store refetches"),
        &["result"]  // result: applied/stale/failed
    ).expect("metric creation failed");

    /// Current store version
    pub static ref STORE_VERSION: Gauge = Gauge::new(
        "lc_store_version",
        "Store-wide version after the most recent local mutation or refetch"
    ).expect("metric creation failed");

    // =========================================================================
    // REMOTE CALLS
    // =========================================================================

    /// Remote request duration
    pub static ref REMOTE_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "lc_remote_request_duration_seconds",
            "Time spent waiting for the backend"
        ).buckets(exponential_buckets(0.005, 2.0, 12).unwrap_or_default()),
        &["operation"]  // operation: update_material/fetch_projects/update_project
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT BUS
    // =========================================================================

    /// Events published to the update bus
    pub static ref BUS_EVENTS_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("lc_bus_events_published_total", "Events published to the update bus"),
        &["topic"]
    ).expect("metric creation failed");
}

/// Handle proving the metrics were registered.
#[derive(Clone)]
pub struct MetricsHandle {
    registry: Registry,
}

impl MetricsHandle {
    /// Gather and encode every registered metric.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        encode_registry(&self.registry)
    }
}

/// Adds the sync metrics to [`REGISTRY`]. Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(STATUS_CHANGES.clone()),
        Box::new(ROLLBACKS.clone()),
        Box::new(REFETCHES.clone()),
        Box::new(STORE_VERSION.clone()),
        Box::new(REMOTE_REQUEST_DURATION.clone()),
        Box::new(BUS_EVENTS_PUBLISHED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}

/// Renders the registry in the Prometheus text exposition format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    encode_registry(&REGISTRY)
}

fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Records wall time into a histogram when dropped.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Starts timing; the elapsed seconds are recorded on drop.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing a remote operation. Observation happens on drop.
pub fn time_remote(operation: &str) -> HistogramTimer {
    HistogramTimer::new(&REMOTE_REQUEST_DURATION.with_label_values(&[operation]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_is_idempotent() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_status_change_counter_moves() {
        let before = STATUS_CHANGES.with_label_values(&["committed"]).get();
        STATUS_CHANGES.with_label_values(&["committed"]).inc();
        assert!(STATUS_CHANGES.with_label_values(&["committed"]).get() >= before + 1.0);
    }

    #[test]
    fn test_encode_contains_metric_names() {
        let handle = register_metrics().unwrap();
        ROLLBACKS.inc();
        let text = handle.encode().unwrap();
        assert!(text.contains("lc_material_rollbacks_total"));
    }

    #[test]
    fn test_timer_observes_on_drop() {
        let histogram = REMOTE_REQUEST_DURATION.with_label_values(&["fetch_projects"]);
        let before = histogram.get_sample_count();
        {
            let _timer = time_remote("fetch_projects");
        }
        assert_eq!(histogram.get_sample_count(), before + 1);
    }
}
