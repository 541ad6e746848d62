//! Driver metrics
//!
//! Counters of driver operations by outcome and gauges of the last reported
//! array capacity, kept in a registry owned by the driver.

use crate::domain::share::ShareStats;
use crate::error::{Error, Result};
use prometheus::{Encoder, GaugeVec, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus metrics of one driver instance
pub struct DriverMetrics {
    registry: Registry,
    operations: IntCounterVec,
    capacity_gb: GaugeVec,
}

impl DriverMetrics {
    /// Create and register all driver metrics
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let operations = IntCounterVec::new(
            Opts::new(
                "flashblade_driver_operations_total",
                "Driver operations by outcome",
            ),
            &["operation", "outcome"],
        )
        .map_err(metrics_error)?;

        let capacity_gb = GaugeVec::new(
            Opts::new(
                "flashblade_capacity_gb",
                "Array capacity from the last stats refresh, in GiB",
            ),
            &["kind"],
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(operations.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(capacity_gb.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            operations,
            capacity_gb,
        })
    }

    /// Count one finished operation
    pub fn record<T>(&self, operation: &str, result: &Result<T>) {
        let outcome = match result {
            Ok(_) => "ok",
            Err(Error::BackendFault(_)) => "backend_fault",
            Err(_) => "rejected",
        };
        self.operations
            .with_label_values(&[operation, outcome])
            .inc();
    }

    /// Number of recorded operations with the given outcome
    pub fn operation_count(&self, operation: &str, outcome: &str) -> u64 {
        self.operations
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Publish capacity from a stats refresh
    pub fn observe_stats(&self, stats: &ShareStats) {
        self.capacity_gb
            .with_label_values(&["total"])
            .set(stats.total_capacity_gb);
        self.capacity_gb
            .with_label_values(&["free"])
            .set(stats.free_capacity_gb);
        self.capacity_gb
            .with_label_values(&["provisioned"])
            .set(stats.provisioned_capacity_gb);
    }

    /// Render all metrics in the text exposition format
    pub fn encode(&self) -> Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics: {}", e))
}
