//! Lightweight Prometheus-compatible metrics using atomic counters.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::EntityKind;

/// Operation recorded by the metrics collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

const ALL_OPERATIONS: [Operation; 4] = [
    Operation::Read,
    Operation::Create,
    Operation::Update,
    Operation::Delete,
];

const ALL_KINDS: [EntityKind; 3] = [EntityKind::Graph, EntityKind::Service, EntityKind::Relation];

/// Per-entity operation counters.
struct KindMetrics {
    ops_total: [AtomicU64; 4],
    errors_total: [AtomicU64; 4],
}

impl KindMetrics {
    const fn new() -> Self {
        Self {
            ops_total: [const { AtomicU64::new(0) }; 4],
            errors_total: [const { AtomicU64::new(0) }; 4],
        }
    }
}

fn op_index(op: Operation) -> usize {
    match op {
        Operation::Read => 0,
        Operation::Create => 1,
        Operation::Update => 2,
        Operation::Delete => 3,
    }
}

/// Application-wide metrics collected via atomic counters.
pub struct Metrics {
    graphs: KindMetrics,
    services: KindMetrics,
    relations: KindMetrics,
    watermark_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Live row totals rendered as gauges.
#[derive(Debug, Clone, Copy, Default)]
pub struct Totals {
    pub graphs: i64,
    pub services: i64,
    pub relations: i64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            graphs: KindMetrics::new(),
            services: KindMetrics::new(),
            relations: KindMetrics::new(),
            watermark_failures: AtomicU64::new(0),
        }
    }

    fn kind(&self, kind: EntityKind) -> &KindMetrics {
        match kind {
            EntityKind::Graph => &self.graphs,
            EntityKind::Service => &self.services,
            EntityKind::Relation => &self.relations,
        }
    }

    /// Record a successful operation.
    pub fn record(&self, kind: EntityKind, op: Operation) {
        self.kind(kind).ops_total[op_index(op)].fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed operation.
    pub fn record_error(&self, kind: EntityKind, op: Operation) {
        let m = self.kind(kind);
        m.ops_total[op_index(op)].fetch_add(1, Ordering::Relaxed);
        m.errors_total[op_index(op)].fetch_add(1, Ordering::Relaxed);
    }

    /// Records the outcome of an operation and hands the result back.
    pub fn observe<T, E>(&self, kind: EntityKind, op: Operation, result: Result<T, E>) -> Result<T, E> {
        match &result {
            Ok(_) => self.record(kind, op),
            Err(_) => self.record_error(kind, op),
        }
        result
    }

    /// Record a creation rolled back because its watermark could not advance.
    pub fn record_watermark_failure(&self) {
        self.watermark_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Creations rolled back on a watermark failure.
    pub fn watermark_failures_total(&self) -> u64 {
        self.watermark_failures.load(Ordering::Relaxed)
    }

    /// Total operations recorded for `kind`/`op`, errors included.
    pub fn ops_total(&self, kind: EntityKind, op: Operation) -> u64 {
        self.kind(kind).ops_total[op_index(op)].load(Ordering::Relaxed)
    }

    /// Failed operations recorded for `kind`/`op`.
    pub fn errors_total(&self, kind: EntityKind, op: Operation) -> u64 {
        self.kind(kind).errors_total[op_index(op)].load(Ordering::Relaxed)
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self, totals: Totals, uptime_seconds: u64) -> String {
        let mut out = String::with_capacity(2048);

        gauge(&mut out, "svcgraph_graphs_total", "Current number of graphs", totals.graphs);
        gauge(
            &mut out,
            "svcgraph_services_total",
            "Services across all graphs",
            totals.services,
        );
        gauge(
            &mut out,
            "svcgraph_relations_total",
            "Relations across all graphs",
            totals.relations,
        );
        gauge(
            &mut out,
            "svcgraph_uptime_seconds",
            "Server uptime in seconds",
            uptime_seconds,
        );

        let _ = writeln!(
            out,
            "# HELP svcgraph_operations_total Total operations handled."
        );
        let _ = writeln!(out, "# TYPE svcgraph_operations_total counter");
        for kind in ALL_KINDS {
            for op in ALL_OPERATIONS {
                let total = self.ops_total(kind, op);
                let _ = writeln!(
                    out,
                    "svcgraph_operations_total{{entity=\"{kind}\",op=\"{}\"}} {total}",
                    op.label()
                );
            }
        }

        let _ = writeln!(
            out,
            "# HELP svcgraph_operation_errors_total Total failed operations."
        );
        let _ = writeln!(out, "# TYPE svcgraph_operation_errors_total counter");
        for kind in ALL_KINDS {
            for op in ALL_OPERATIONS {
                let errors = self.errors_total(kind, op);
                let _ = writeln!(
                    out,
                    "svcgraph_operation_errors_total{{entity=\"{kind}\",op=\"{}\"}} {errors}",
                    op.label()
                );
            }
        }

        let _ = writeln!(
            out,
            "# HELP svcgraph_watermark_failures_total Creations rolled back on watermark failure."
        );
        let _ = writeln!(out, "# TYPE svcgraph_watermark_failures_total counter");
        let _ = writeln!(
            out,
            "svcgraph_watermark_failures_total {}",
            self.watermark_failures_total()
        );

        out
    }
}

fn gauge(out: &mut String, name: &str, help: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
    let _ = writeln!(out, "{name} {value}");
}
