//! Query-path metrics, published through a `watch` channel and rendered in
//! Prometheus text exposition format (0.0.4).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use tokio::sync::watch;

/// Content type of [`QueryMetricsSnapshot::render`] output.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Histogram upper bounds in seconds.
const BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Operation {
    Embedding,
    Search,
    Llm,
    Total,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Search => "search",
            Self::Llm => "llm",
            Self::Total => "total",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QueryStatus {
    Success,
    Error,
}

impl QueryStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    /// Cumulative counts per entry of `BUCKETS`.
    pub buckets: [u64; BUCKETS.len()],
    pub sum: f64,
    pub count: u64,
}

impl Histogram {
    pub fn observe(&mut self, secs: f64) {
        for (bound, slot) in BUCKETS.iter().zip(self.buckets.iter_mut()) {
            if secs <= *bound {
                *slot += 1;
            }
        }
        self.sum += secs;
        self.count += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryMetricsSnapshot {
    pub queries: BTreeMap<(String, QueryStatus), u64>,
    pub durations: BTreeMap<Operation, Histogram>,
    /// Average score of the contexts returned by the last query that had any.
    pub context_relevance: f64,
    pub cache_hits: u64,
}

impl QueryMetricsSnapshot {
    #[must_use]
    pub fn queries_total(&self, status: QueryStatus) -> u64 {
        self.queries
            .iter()
            .filter(|((_, s), _)| *s == status)
            .map(|(_, n)| n)
            .sum()
    }

    /// Render every metric family in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("# HELP rag_queries_total Total RAG queries\n");
        out.push_str("# TYPE rag_queries_total counter\n");
        for ((collection, status), n) in &self.queries {
            let _ = writeln!(
                out,
                "rag_queries_total{{collection=\"{}\",status=\"{}\"}} {n}",
                escape_label(collection),
                status.as_str()
            );
        }

        out.push_str("# HELP rag_query_duration_seconds Query processing time\n");
        out.push_str("# TYPE rag_query_duration_seconds histogram\n");
        for (op, h) in &self.durations {
            let op = op.as_str();
            for (bound, n) in BUCKETS.iter().zip(h.buckets.iter()) {
                let _ = writeln!(
                    out,
                    "rag_query_duration_seconds_bucket{{operation=\"{op}\",le=\"{bound}\"}} {n}"
                );
            }
            let _ = writeln!(
                out,
                "rag_query_duration_seconds_bucket{{operation=\"{op}\",le=\"+Inf\"}} {}",
                h.count
            );
            let _ = writeln!(
                out,
                "rag_query_duration_seconds_sum{{operation=\"{op}\"}} {}",
                h.sum
            );
            let _ = writeln!(
                out,
                "rag_query_duration_seconds_count{{operation=\"{op}\"}} {}",
                h.count
            );
        }

        out.push_str(
            "# HELP rag_context_relevance_score Average relevance score of retrieved contexts\n",
        );
        out.push_str("# TYPE rag_context_relevance_score gauge\n");
        let _ = writeln!(out, "rag_context_relevance_score {}", self.context_relevance);

        out.push_str("# HELP rag_embedding_cache_hits_total Embedding cache hits\n");
        out.push_str("# TYPE rag_embedding_cache_hits_total counter\n");
        let _ = writeln!(out, "rag_embedding_cache_hits_total {}", self.cache_hits);

        out
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

pub struct MetricsCollector {
    tx: watch::Sender<QueryMetricsSnapshot>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<QueryMetricsSnapshot>) {
        let (tx, rx) = watch::channel(QueryMetricsSnapshot::default());
        (Self { tx }, rx)
    }

    pub fn update(&self, f: impl FnOnce(&mut QueryMetricsSnapshot)) {
        self.tx.send_modify(f);
    }

    pub fn record_query(&self, collection: &str, status: QueryStatus) {
        self.update(|m| {
            *m.queries.entry((collection.to_owned(), status)).or_default() += 1;
        });
    }

    pub fn observe(&self, op: Operation, elapsed: Duration) {
        self.update(|m| m.durations.entry(op).or_default().observe(elapsed.as_secs_f64()));
    }

    pub fn set_context_relevance(&self, avg: f64) {
        self.update(|m| m.context_relevance = avg);
    }

    pub fn cache_hit(&self) {
        self.update(|m| m.cache_hits += 1);
    }

    #[must_use]
    pub fn snapshot(&self) -> QueryMetricsSnapshot {
        self.tx.borrow().clone()
    }
}
