//! Metrics instrumentation for synth-dns.
//!
//! All metrics are prefixed with `synth_dns.`

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Register descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(
        "synth_dns.query.count",
        "Queries handled, by record type and result"
    );
    describe_histogram!(
        "synth_dns.query.duration.seconds",
        Unit::Seconds,
        "Time spent answering a query"
    );
    describe_histogram!(
        "synth_dns.query.records_returned",
        Unit::Count,
        "Records in a non-empty answer"
    );
    describe_counter!(
        "synth_dns.inventory.lookup.count",
        "Inventory calls, by operation and outcome"
    );
    describe_histogram!(
        "synth_dns.inventory.lookup.duration.seconds",
        Unit::Seconds,
        "Inventory call latency"
    );
}

/// Record a DNS query.
pub fn record_query(record_type: &str, result: QueryResult, duration: std::time::Duration) {
    let result_str = match result {
        QueryResult::Success => "success",
        QueryResult::NoData => "nodata",
        QueryResult::NotApplicable => "not_applicable",
        QueryResult::Refused => "refused",
        QueryResult::Error => "error",
    };

    counter!("synth_dns.query.count", "type" => record_type.to_string(), "result" => result_str)
        .increment(1);
    histogram!("synth_dns.query.duration.seconds", "type" => record_type.to_string())
        .record(duration.as_secs_f64());
}

/// Query result type for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryResult {
    /// Query returned records.
    Success,
    /// The name is ours but has no records of the requested type.
    NoData,
    /// The name is outside the synthetic zone and was refused.
    NotApplicable,
    /// Source address outside the allowlist.
    Refused,
    /// Query failed with an error.
    Error,
}

/// Record an inventory lookup.
pub fn record_inventory_lookup(
    op: InventoryOp,
    result: InventoryResult,
    duration: std::time::Duration,
) {
    let op_str = match op {
        InventoryOp::List => "list",
        InventoryOp::Inspect => "inspect",
    };
    let result_str = match result {
        InventoryResult::Found => "found",
        InventoryResult::Missing => "missing",
        InventoryResult::Error => "error",
        InventoryResult::Timeout => "timeout",
    };

    counter!("synth_dns.inventory.lookup.count", "op" => op_str, "result" => result_str)
        .increment(1);
    histogram!("synth_dns.inventory.lookup.duration.seconds", "op" => op_str)
        .record(duration.as_secs_f64());
}

/// Inventory operations.
#[derive(Debug, Clone, Copy)]
pub enum InventoryOp {
    /// Full scan (address → name).
    List,
    /// Single entry lookup (name → addresses).
    Inspect,
}

/// Inventory lookup outcomes.
#[derive(Debug, Clone, Copy)]
pub enum InventoryResult {
    /// A matching entry was found.
    Found,
    /// No entry matched.
    Missing,
    /// The backend returned an error.
    Error,
    /// The backend did not answer in time.
    Timeout,
}

/// Record records returned for a successful lookup.
pub fn record_records_returned(record_type: &str, count: usize) {
    histogram!("synth_dns.query.records_returned", "type" => record_type.to_string())
        .record(count as f64);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
