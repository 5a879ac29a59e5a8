// Structured logging
pub mod logging;

// Metric names and recording helpers
pub mod metrics;

// Re-export commonly used items for convenience
pub use logging::{init_from_env, init_logging, LogFormat};
pub use metrics::{describe_metrics, install_prometheus_exporter};
