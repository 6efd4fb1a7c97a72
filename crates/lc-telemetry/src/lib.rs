//! # LC Telemetry
//!
//! Logging and metrics for the material status sync core.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LC_SERVICE_NAME` | `laser-shop-sync` | Service name in log lines |
//! | `LC_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `LC_JSON_LOGS` | `false` | JSON log lines (default `true` in containers) |
//! | `LC_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{build_filter, init_logging};
pub use metrics::{
    encode_metrics, register_metrics, time_remote, HistogramTimer, MetricsHandle,
    BUS_EVENTS_PUBLISHED, REFETCHES, REMOTE_REQUEST_DURATION, ROLLBACKS, STATUS_CHANGES,
    STORE_VERSION,
};

use thiserror::Error;

/// Errors raised while bringing up logging or metrics.
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("metrics registry error: {0}")]
    MetricsInit(String),

    #[error("bad telemetry configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Keep the returned guard alive until shutdown.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Initialize metrics first
    let metrics = register_metrics()?;

    logging::init_logging(&config)?;

    Ok(TelemetryGuard { metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Metrics registered by [`init_telemetry`].
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Telemetry stopped");
    }
}

/// Bumps a labelled counter: `metric_inc!(COUNTER, &["label"])`.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
