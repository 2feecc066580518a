use serde::Serialize;
use serde_json::Value;

pub const HEALTHY: &str = "healthy";
pub const UNHEALTHY: &str = "unhealthy";
pub const DEGRADED: &str = "degraded";

/// Aggregated dependency status. The vector store and the embedder are
/// mandatory; a down LLM only shows in `llm_status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub qdrant_status: String,
    pub embedder_status: String,
    pub llm_status: String,
    /// `{vectors_count, status}` of the default collection, `{}` when absent.
    pub collection_info: Value,
    /// Seconds since the service was built.
    pub uptime: f64,
}

impl HealthReport {
    #[must_use]
    pub fn new(qdrant_ok: bool, embedder_ok: bool, llm_ok: bool) -> Self {
        let label = |ok: bool| if ok { HEALTHY } else { UNHEALTHY }.to_owned();
        Self {
            status: if qdrant_ok && embedder_ok {
                HEALTHY
            } else {
                DEGRADED
            }
            .to_owned(),
            qdrant_status: label(qdrant_ok),
            embedder_status: label(embedder_ok),
            llm_status: label(llm_ok),
            collection_info: Value::Object(serde_json::Map::new()),
            uptime: 0.0,
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_down_does_not_degrade() {
        let report = HealthReport::new(true, true, false);
        assert!(report.is_healthy());
        assert_eq!(report.llm_status, UNHEALTHY);
    }

    #[test]
    fn mandatory_dependency_down_degrades() {
        assert_eq!(HealthReport::new(false, true, true).status, DEGRADED);
        assert_eq!(HealthReport::new(true, false, true).status, DEGRADED);
    }

    #[test]
    fn serializes_empty_collection_info_as_object() {
        let json = serde_json::to_value(HealthReport::new(true, true, true)).unwrap();
        assert_eq!(json["collection_info"], serde_json::json!({}));
        assert_eq!(json["status"], "healthy");
    }
}
