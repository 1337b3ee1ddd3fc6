use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;

use sonda_core::SchemaInfo;

use crate::metrics::{PerfWarning, PerformanceReport, QueryMetrics, Severity, WarningKind};
use crate::normalize::{classify, normalize, table_from_query, where_columns, QueryOp};

/// Analyzer thresholds and detector switches.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub slow_query_threshold_ms: u64,
    pub large_result_set_threshold: u64,
    /// Occurrences of one normalized query within the window that trigger
    /// the repeated-query warning.
    pub repeat_threshold: usize,
    /// Trailing window inspected by the repeated-query detector.
    pub repeat_window: Duration,
    /// Retention horizon for per-query occurrence lists.
    pub repeat_retention: Duration,
    /// Entries kept in the rolling history before eviction.
    pub history_cap: usize,
    pub detect_slow_queries: bool,
    pub detect_repeated_queries: bool,
    pub detect_missing_indexes: bool,
    pub detect_large_result_sets: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 1_000,
            large_result_set_threshold: 1_000,
            repeat_threshold: 5,
            repeat_window: Duration::from_secs(5),
            repeat_retention: Duration::from_secs(10),
            history_cap: 1_000,
            detect_slow_queries: true,
            detect_repeated_queries: true,
            detect_missing_indexes: true,
            detect_large_result_sets: true,
        }
    }
}

/// One executed query as reported by the data-access layer.
#[derive(Debug, Clone)]
pub struct QueryObservation {
    pub sql: String,
    pub duration: Duration,
    /// Result-set size for reads, when the caller knows it.
    pub rows: Option<u64>,
    /// Table the statement targets, when the caller knows it.
    pub table: Option<String>,
}

/// Monotonic time source, injectable so window tests need no sleeping.
trait Clock: Send + Sync {
    fn elapsed(&self) -> Duration;
}

struct SystemClock {
    start: Instant,
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

struct AnalyzerState {
    history: VecDeque<QueryMetrics>,
    /// Occurrence offsets per normalized query, evicted past the
    /// retention horizon.
    occurrences: HashMap<String, VecDeque<Duration>>,
    warnings: VecDeque<PerfWarning>,
    total_queries: u64,
    by_operation: BTreeMap<String, u64>,
    total_duration_ms: u64,
    max_duration_ms: u64,
    slow_queries: u64,
    warnings_by_kind: BTreeMap<String, u64>,
    observations_since_sweep: usize,
    schema: Option<Arc<SchemaInfo>>,
}

/// Observes executed queries and emits advisory performance warnings.
///
/// In-memory only: observation never suspends and never fails. Interior
/// state is a single mutex under the one-writer-per-engine assumption.
pub struct QueryAnalyzer {
    config: AnalyzerConfig,
    clock: Box<dyn Clock>,
    state: Mutex<AnalyzerState>,
}

impl QueryAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            clock: Box::new(SystemClock {
                start: Instant::now(),
            }),
            state: Mutex::new(AnalyzerState::new()),
        }
    }

    /// Attach (or replace) the schema snapshot consulted by the
    /// missing-index detector. The analyzer works without one.
    pub fn set_schema(&self, schema: Arc<SchemaInfo>) {
        self.state.lock().expect("analyzer lock").schema = Some(schema);
    }

    /// Record one executed query and run the detectors.
    ///
    /// Returns the warnings raised for this observation; they are also
    /// logged and retained for `report`.
    pub fn observe(&self, observation: QueryObservation) -> Vec<PerfWarning> {
        let now = self.clock.elapsed();
        let normalized = normalize(&observation.sql);
        let op = classify(&observation.sql);
        let duration_ms = observation.duration.as_millis() as u64;
        let table = observation
            .table
            .clone()
            .or_else(|| table_from_query(&normalized));

        let mut state = self.state.lock().expect("analyzer lock");

        state.total_queries += 1;
        *state.by_operation.entry(op.as_str().to_string()).or_insert(0) += 1;
        state.total_duration_ms += duration_ms;
        state.max_duration_ms = state.max_duration_ms.max(duration_ms);

        state.history.push_back(QueryMetrics {
            normalized: normalized.clone(),
            op,
            table: table.clone(),
            duration_ms,
            rows: observation.rows,
            timestamp: Utc::now(),
            offset: now,
        });
        while state.history.len() > self.config.history_cap {
            state.history.pop_front();
        }

        let mut warnings = Vec::new();

        if self.config.detect_slow_queries {
            self.detect_slow(duration_ms, &normalized, &table, &mut state, &mut warnings);
        }
        if self.config.detect_repeated_queries {
            self.detect_repeated(now, &normalized, &table, &mut state, &mut warnings);
        }
        if self.config.detect_missing_indexes {
            self.detect_missing_index(op, &normalized, &table, &state, &mut warnings);
        }
        if self.config.detect_large_result_sets {
            self.detect_large_result(observation.rows, &normalized, &table, &mut warnings);
        }

        for warning in &warnings {
            *state
                .warnings_by_kind
                .entry(warning.kind.as_str().to_string())
                .or_insert(0) += 1;
            state.warnings.push_back(warning.clone());
            while state.warnings.len() > self.config.history_cap {
                state.warnings.pop_front();
            }
            tracing::warn!(
                event = "performance_warning",
                kind = warning.kind.as_str(),
                severity = ?warning.severity,
                table = warning.table.as_deref().unwrap_or(""),
                query = %warning.normalized_query,
                "{}",
                warning.message,
            );
        }

        state.observations_since_sweep += 1;
        if state.observations_since_sweep >= 128 {
            state.observations_since_sweep = 0;
            let horizon = now.saturating_sub(self.config.repeat_retention);
            state.occurrences.retain(|_, offsets| {
                while offsets.front().is_some_and(|offset| *offset < horizon) {
                    offsets.pop_front();
                }
                !offsets.is_empty()
            });
        }

        warnings
    }

    /// Aggregate counts and timings over the rolling history.
    pub fn report(&self) -> PerformanceReport {
        let state = self.state.lock().expect("analyzer lock");
        let avg = if state.total_queries == 0 {
            0.0
        } else {
            state.total_duration_ms as f64 / state.total_queries as f64
        };
        PerformanceReport {
            total_queries: state.total_queries,
            by_operation: state.by_operation.clone(),
            avg_duration_ms: avg,
            max_duration_ms: state.max_duration_ms,
            slow_queries: state.slow_queries,
            warnings_by_kind: state.warnings_by_kind.clone(),
        }
    }

    /// Retained warnings, oldest first.
    pub fn warnings(&self) -> Vec<PerfWarning> {
        let state = self.state.lock().expect("analyzer lock");
        state.warnings.iter().cloned().collect()
    }

    /// The rolling history, oldest first (bounded by `history_cap`).
    pub fn recent(&self) -> Vec<QueryMetrics> {
        let state = self.state.lock().expect("analyzer lock");
        state.history.iter().cloned().collect()
    }

    fn detect_slow(
        &self,
        duration_ms: u64,
        normalized: &str,
        table: &Option<String>,
        state: &mut AnalyzerState,
        warnings: &mut Vec<PerfWarning>,
    ) {
        let threshold = self.config.slow_query_threshold_ms;
        if threshold == 0 || duration_ms <= threshold {
            return;
        }
        state.slow_queries += 1;
        let severity = if duration_ms >= threshold * 3 {
            Severity::High
        } else {
            Severity::Medium
        };
        warnings.push(PerfWarning {
            kind: WarningKind::SlowQuery,
            severity,
            message: format!("query took {duration_ms}ms (threshold {threshold}ms)"),
            normalized_query: normalized.to_string(),
            table: table.clone(),
        });
    }

    fn detect_repeated(
        &self,
        now: Duration,
        normalized: &str,
        table: &Option<String>,
        state: &mut AnalyzerState,
        warnings: &mut Vec<PerfWarning>,
    ) {
        let offsets = state
            .occurrences
            .entry(normalized.to_string())
            .or_default();
        offsets.push_back(now);

        let retention_horizon = now.saturating_sub(self.config.repeat_retention);
        while offsets.front().is_some_and(|offset| *offset < retention_horizon) {
            offsets.pop_front();
        }

        let window_horizon = now.saturating_sub(self.config.repeat_window);
        let in_window = offsets
            .iter()
            .filter(|offset| **offset >= window_horizon)
            .count();

        if in_window >= self.config.repeat_threshold {
            warnings.push(PerfWarning {
                kind: WarningKind::RepeatedQuery,
                severity: Severity::High,
                message: format!(
                    "same query executed {in_window} times within {:?}; likely N+1 access pattern",
                    self.config.repeat_window
                ),
                normalized_query: normalized.to_string(),
                table: table.clone(),
            });
        }
    }

    fn detect_missing_index(
        &self,
        op: QueryOp,
        normalized: &str,
        table: &Option<String>,
        state: &AnalyzerState,
        warnings: &mut Vec<PerfWarning>,
    ) {
        if op != QueryOp::Select {
            return;
        }
        let schema = match &state.schema {
            Some(schema) => schema,
            None => return,
        };
        let table_name = match table {
            Some(name) => name,
            None => return,
        };
        let info = match schema
            .tables
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(table_name))
        {
            Some(info) => info,
            None => return,
        };

        for column in where_columns(normalized) {
            // Only columns that exist on the table; the regex also catches
            // aliases and expressions, which are not ours to judge.
            let candidate = match info
                .columns
                .iter()
                .find(|candidate| candidate.name.eq_ignore_ascii_case(&column))
            {
                Some(candidate) => candidate,
                None => continue,
            };
            if !info.is_column_indexed(&candidate.name) {
                warnings.push(PerfWarning {
                    kind: WarningKind::MissingIndex,
                    severity: Severity::Medium,
                    message: format!(
                        "filter on {}.{column} is not covered by an index",
                        info.name
                    ),
                    normalized_query: normalized.to_string(),
                    table: Some(info.name.clone()),
                });
            }
        }
    }

    fn detect_large_result(
        &self,
        rows: Option<u64>,
        normalized: &str,
        table: &Option<String>,
        warnings: &mut Vec<PerfWarning>,
    ) {
        let threshold = self.config.large_result_set_threshold;
        let rows = match rows {
            Some(rows) if threshold > 0 && rows > threshold => rows,
            _ => return,
        };
        let severity = if rows >= threshold * 3 {
            Severity::High
        } else {
            Severity::Medium
        };
        warnings.push(PerfWarning {
            kind: WarningKind::LargeResultSet,
            severity,
            message: format!("result set of {rows} rows exceeds threshold {threshold}"),
            normalized_query: normalized.to_string(),
            table: table.clone(),
        });
    }
}

impl AnalyzerState {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            occurrences: HashMap::new(),
            warnings: VecDeque::new(),
            total_queries: 0,
            by_operation: BTreeMap::new(),
            total_duration_ms: 0,
            max_duration_ms: 0,
            slow_queries: 0,
            warnings_by_kind: BTreeMap::new(),
            observations_since_sweep: 0,
            schema: None,
        }
    }
}
