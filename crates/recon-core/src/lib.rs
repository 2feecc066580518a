//! Recon service core: configuration, query path, context assembly, embedding
//! cache, health aggregation and metrics.

pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod prompt;
pub mod query;

pub use config::Config;
pub use error::{ConfigError, QueryError};
pub use health::HealthReport;
pub use metrics::{MetricsCollector, PROMETHEUS_CONTENT_TYPE, QueryMetricsSnapshot};
pub use prompt::ContextResult;
pub use query::{QueryRequest, QueryResponse, QueryService, QuerySettings};
