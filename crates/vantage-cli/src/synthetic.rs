//! Deterministic demo data
//!
//! Payloads are shaped after the kind's [`DataShape`] and seeded from the
//! kind id and resolved params, so the same widget config always renders
//! the same numbers.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use vantage_catalog::{DataShape, FetchRequest, WidgetCatalog};
use vantage_core::{DataProvider, ProviderError, WidgetData};

pub(crate) struct SyntheticProvider {
    catalog: Arc<WidgetCatalog>,
    failing: HashSet<String>,
    latency: Duration,
}

impl SyntheticProvider {
    pub(crate) fn new(catalog: Arc<WidgetCatalog>) -> Self {
        Self {
            catalog,
            failing: HashSet::new(),
            latency: Duration::ZERO,
        }
    }

    /// Kinds whose loads always fail
    pub(crate) fn with_failing(mut self, kinds: impl IntoIterator<Item = String>) -> Self {
        self.failing.extend(kinds);
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl DataProvider for SyntheticProvider {
    async fn fetch(&self, request: &FetchRequest) -> Result<WidgetData, ProviderError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.contains(request.kind_id.as_str()) {
            return Err(format!("{} returned 503", request.endpoint).into());
        }
        let shape = self
            .catalog
            .get(request.kind_id.as_str())
            .map(|kind| kind.shape)
            .ok_or_else(|| ProviderError::from(format!("no such kind: {}", request.kind_id)))?;
        Ok(generate(shape, &mut StdRng::seed_from_u64(seed(request))))
    }
}

fn seed(request: &FetchRequest) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.kind_id.hash(&mut hasher);
    // BTreeMap keeps params in a stable order
    serde_json::to_string(&request.params)
        .unwrap_or_default()
        .hash(&mut hasher);
    hasher.finish()
}

fn generate(shape: DataShape, rng: &mut StdRng) -> Value {
    match shape {
        DataShape::Scalar => json!({
            "value": (rng.gen_range(0.0..100.0_f64) * 10.0).round() / 10.0,
            "delta": (rng.gen_range(-5.0..5.0_f64) * 10.0).round() / 10.0,
        }),
        DataShape::TimeSeries => {
            let mut level = rng.gen_range(5.0..15.0_f64);
            let points: Vec<Value> = (0..12)
                .map(|t| {
                    level = (level + rng.gen_range(-1.5..1.5)).max(0.0);
                    json!({ "t": t, "v": (level * 100.0).round() / 100.0 })
                })
                .collect();
            json!({ "points": points })
        }
        DataShape::Table => {
            let rows: Vec<Value> = (1..=5)
                .map(|i| {
                    json!({
                        "account": format!("account-{i:03}"),
                        "health": rng.gen_range(0..=100),
                        "mrr": rng.gen_range(200..20_000),
                    })
                })
                .collect();
            json!({ "columns": ["account", "health", "mrr"], "rows": rows })
        }
        DataShape::Distribution => {
            let buckets = ["low", "medium", "high", "critical"]
                .iter()
                .map(|label| json!({ "label": label, "count": rng.gen_range(0..500) }))
                .collect::<Vec<_>>();
            json!({ "buckets": buckets })
        }
        DataShape::Feed => {
            let items: Vec<Value> = (0..rng.gen_range(1..6))
                .map(|i| {
                    let severity = ["info", "warning", "critical"][rng.gen_range(0..3)];
                    json!({ "id": i, "severity": severity, "message": format!("signal #{i}") })
                })
                .collect();
            json!({ "items": items })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_model::WidgetConfig;

    fn request(catalog: &WidgetCatalog, kind: &str) -> FetchRequest {
        FetchRequest::resolve(catalog.get(kind).unwrap(), &WidgetConfig::new())
    }

    #[tokio::test]
    async fn same_request_same_payload() {
        let catalog = Arc::new(WidgetCatalog::builtin());
        let provider = SyntheticProvider::new(catalog.clone());
        let req = request(&catalog, "churn_trend");

        let a = provider.fetch(&req).await.unwrap();
        let b = provider.fetch(&req).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a["points"].as_array().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn payload_follows_shape() {
        let catalog = Arc::new(WidgetCatalog::builtin());
        let provider = SyntheticProvider::new(catalog.clone());

        let table = provider.fetch(&request(&catalog, "customer_list")).await.unwrap();
        assert_eq!(table["rows"].as_array().unwrap().len(), 5);
        let scalar = provider.fetch(&request(&catalog, "nps_score")).await.unwrap();
        assert!(scalar["value"].is_f64());
    }

    #[tokio::test]
    async fn configured_failures() {
        let catalog = Arc::new(WidgetCatalog::builtin());
        let provider =
            SyntheticProvider::new(catalog.clone()).with_failing(["alerts_feed".to_string()]);
        let err = provider
            .fetch(&request(&catalog, "alerts_feed"))
            .await
            .unwrap_err();
        assert!(err.to_string().ends_with("returned 503"));
    }
}
