//! Runtime query observation and performance heuristics.
//!
//! The analyzer watches normalized query text, execution time and result
//! sizes, keeps a bounded rolling history, and emits advisory warnings for
//! slow queries, repeated queries (the N+1 signal), unindexed predicates
//! and oversized result sets. It never blocks or alters execution.

pub mod analyzer;
pub mod metrics;
pub mod normalize;

pub use analyzer::{AnalyzerConfig, QueryAnalyzer, QueryObservation};
pub use metrics::{
    PerfWarning, PerformanceReport, QueryMetrics, Severity, WarningKind,
};
pub use normalize::{classify, normalize, QueryOp};
