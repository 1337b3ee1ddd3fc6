use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::normalize::QueryOp;

/// One observed query execution, as retained in the rolling history.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMetrics {
    /// Normalized query text (literals stripped, whitespace collapsed).
    pub normalized: String,
    pub op: QueryOp,
    pub table: Option<String>,
    pub duration_ms: u64,
    pub rows: Option<u64>,
    pub timestamp: DateTime<Utc>,
    /// Monotonic offset from analyzer start, used for window arithmetic.
    #[serde(skip)]
    pub(crate) offset: Duration,
}

/// Warning families emitted by the detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    SlowQuery,
    RepeatedQuery,
    MissingIndex,
    LargeResultSet,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::SlowQuery => "slow_query",
            WarningKind::RepeatedQuery => "repeated_query",
            WarningKind::MissingIndex => "missing_index",
            WarningKind::LargeResultSet => "large_result_set",
        }
    }
}

/// Advisory severity. Warnings never block or alter execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One advisory finding from a detector.
#[derive(Debug, Clone, Serialize)]
pub struct PerfWarning {
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,
    pub normalized_query: String,
    pub table: Option<String>,
}

/// Aggregate view over the rolling history.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub total_queries: u64,
    pub by_operation: BTreeMap<String, u64>,
    pub avg_duration_ms: f64,
    pub max_duration_ms: u64,
    pub slow_queries: u64,
    pub warnings_by_kind: BTreeMap<String, u64>,
}
