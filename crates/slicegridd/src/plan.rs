//! Request plans: a JSON list of engine calls run in order.
//!
//! ```json
//! [
//!   { "op": "schedule_namespace",
//!     "namespace": { "key": "t1/ns", "quota_slice": { "cpu_millis": 1000, "memory_bytes": 1073741824 }, "total_slices": 4 } },
//!   { "op": "schedule_pod",
//!     "pod": { "key": "t1/ns/web-0", "namespace_key": "t1/ns", "request": { "cpu_millis": 250, "memory_bytes": 268435456 } } },
//!   { "op": "deschedule_namespace", "key": "t1/ns" }
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use slicegrid_engine::{Engine, EngineError};
use slicegrid_state::{Namespace, Pod};
use tracing::debug;

/// One engine call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    ScheduleNamespace { namespace: Namespace },
    EnsureNamespacePlacements { namespace: Namespace },
    DescheduleNamespace { key: String },
    SchedulePod { pod: Pod },
    DeschedulePod { key: String },
}

impl Request {
    pub fn op(&self) -> &'static str {
        match self {
            Request::ScheduleNamespace { .. } => "schedule_namespace",
            Request::EnsureNamespacePlacements { .. } => "ensure_namespace_placements",
            Request::DescheduleNamespace { .. } => "deschedule_namespace",
            Request::SchedulePod { .. } => "schedule_pod",
            Request::DeschedulePod { .. } => "deschedule_pod",
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Request::ScheduleNamespace { namespace }
            | Request::EnsureNamespacePlacements { namespace } => namespace.key.as_str(),
            Request::SchedulePod { pod } => pod.key.as_str(),
            Request::DescheduleNamespace { key } | Request::DeschedulePod { key } => key.as_str(),
        }
    }
}

/// Result of one request, printed as a JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub op: &'static str,
    pub key: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<Namespace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod: Option<Pod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl Outcome {
    fn new(request: &Request) -> Self {
        Self {
            op: request.op(),
            key: request.key().to_string(),
            ok: true,
            namespace: None,
            pod: None,
            error: None,
            retryable: None,
        }
    }

    fn failed(mut self, err: &EngineError) -> Self {
        self.ok = false;
        self.error = Some(err.to_string());
        self.retryable = Some(err.is_retryable());
        self
    }
}

pub fn load(path: &Path) -> anyhow::Result<Vec<Request>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Execute one request against the engine.
pub async fn execute(engine: &Engine, request: &Request) -> Outcome {
    let outcome = Outcome::new(request);
    debug!(op = outcome.op, key = %outcome.key, "executing request");

    let result = match request {
        Request::ScheduleNamespace { namespace } => engine
            .schedule_namespace(namespace)
            .await
            .map(|ns| Outcome {
                namespace: Some(ns),
                ..outcome.clone()
            }),
        Request::EnsureNamespacePlacements { namespace } => engine
            .ensure_namespace_placements(namespace)
            .await
            .map(|()| Outcome {
                namespace: Some(namespace.clone()),
                ..outcome.clone()
            }),
        Request::DescheduleNamespace { key } => engine
            .deschedule_namespace(key)
            .await
            .map(|()| outcome.clone()),
        Request::SchedulePod { pod } => engine.schedule_pod(pod).await.map(|p| Outcome {
            pod: Some(p),
            ..outcome.clone()
        }),
        Request::DeschedulePod { key } => engine
            .deschedule_pod(key)
            .await
            .map(|()| outcome.clone()),
    };

    result.unwrap_or_else(|err| outcome.failed(&err))
}

/// Execute every request in order. Failures do not stop the run.
pub async fn run(engine: &Engine, requests: &[Request]) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(requests.len());
    for request in requests {
        outcomes.push(execute(engine, request).await);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use slicegrid_placement::ScoringFit;
    use slicegrid_state::{Cluster, InMemoryCache, ResourceQuantity};

    const PLAN: &str = r#"[
        { "op": "schedule_namespace",
          "namespace": { "key": "t1/ns", "quota_slice": { "cpu_millis": 1000, "memory_bytes": 1024 }, "total_slices": 3 } },
        { "op": "schedule_pod",
          "pod": { "key": "t1/ns/web-0", "namespace_key": "t1/ns", "request": { "cpu_millis": 100, "memory_bytes": 100 } } },
        { "op": "schedule_pod",
          "pod": { "key": "t2/ns/web-0", "namespace_key": "t2/ns" } },
        { "op": "schedule_namespace",
          "namespace": { "key": "t1/ns", "quota_slice": { "cpu_millis": 1000, "memory_bytes": 1024 }, "total_slices": 5 } },
        { "op": "deschedule_pod", "key": "t1/ns/web-0" },
        { "op": "deschedule_namespace", "key": "t1/ns" },
        { "op": "deschedule_namespace", "key": "t1/ns" }
    ]"#;

    fn test_engine() -> (Engine, InMemoryCache) {
        let cache = InMemoryCache::new();
        cache.add_cluster(Cluster::new("east", ResourceQuantity::new(2000, 2048)));
        cache.add_cluster(Cluster::new("west", ResourceQuantity::new(2000, 2048)));
        let engine = Engine::new(Arc::new(cache.clone()), Arc::new(ScoringFit::default()));
        (engine, cache)
    }

    #[test]
    fn parses_every_op() {
        let requests: Vec<Request> = serde_json::from_str(PLAN).unwrap();
        let ops: Vec<&str> = requests.iter().map(Request::op).collect();
        assert_eq!(
            ops,
            vec![
                "schedule_namespace",
                "schedule_pod",
                "schedule_pod",
                "schedule_namespace",
                "deschedule_pod",
                "deschedule_namespace",
                "deschedule_namespace",
            ]
        );
        assert_eq!(requests[2].key(), "t2/ns/web-0");
    }

    #[tokio::test]
    async fn run_reports_each_outcome() {
        let (engine, cache) = test_engine();
        let requests: Vec<Request> = serde_json::from_str(PLAN).unwrap();

        let outcomes = run(&engine, &requests).await;
        let ok: Vec<bool> = outcomes.iter().map(|o| o.ok).collect();
        assert_eq!(ok, vec![true, true, false, false, true, true, true]);

        assert_eq!(outcomes[0].namespace.as_ref().unwrap().placed_slices(), 3);
        assert!(outcomes[1].pod.as_ref().unwrap().cluster.is_some());
        assert_eq!(outcomes[2].retryable, Some(true));
        assert_eq!(outcomes[3].retryable, Some(false));
        assert!(cache.namespaces().is_empty());
    }

    #[test]
    fn outcome_json_skips_empty_fields() {
        let request = Request::DeschedulePod {
            key: "t1/ns/p".to_string(),
        };
        let json = serde_json::to_value(Outcome::new(&request)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "op": "deschedule_pod", "key": "t1/ns/p", "ok": true })
        );
    }
}
