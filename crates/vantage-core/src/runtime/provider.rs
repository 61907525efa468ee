//! Data providers
//!
//! A [`DataProvider`] turns a resolved [`FetchRequest`] into widget data.
//! Providers are registered per widget kind, with an optional fallback.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use vantage_catalog::FetchRequest;
use vantage_model::KindId;

/// Opaque payload rendered by a widget
pub type WidgetData = serde_json::Value;

/// Provider failure, surfaced verbatim as the widget's error message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl From<&str> for ProviderError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for ProviderError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Fetches data for one widget instance
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Load data for `request`
    async fn fetch(&self, request: &FetchRequest) -> Result<WidgetData, ProviderError>;
}

/// Providers keyed by widget kind
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<KindId, Arc<dyn DataProvider>>,
    fallback: Option<Arc<dyn DataProvider>>,
}

impl ProviderRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry where every kind uses `provider`
    #[must_use]
    pub fn with_fallback(provider: Arc<dyn DataProvider>) -> Self {
        Self {
            providers: HashMap::new(),
            fallback: Some(provider),
        }
    }

    /// Register provider for a kind, replacing any previous one
    pub fn register(&mut self, kind_id: impl Into<KindId>, provider: Arc<dyn DataProvider>) {
        self.providers.insert(kind_id.into(), provider);
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with(mut self, kind_id: impl Into<KindId>, provider: Arc<dyn DataProvider>) -> Self {
        self.register(kind_id, provider);
        self
    }

    /// Provider for `kind_id`, or the fallback
    #[must_use]
    pub fn resolve(&self, kind_id: &str) -> Option<Arc<dyn DataProvider>> {
        self.providers
            .get(kind_id)
            .or(self.fallback.as_ref())
            .cloned()
    }

    /// Check if a kind-specific provider exists
    #[inline]
    #[must_use]
    pub fn contains(&self, kind_id: &str) -> bool {
        self.providers.contains_key(kind_id)
    }

    /// Get number of kind-specific providers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if registry has neither providers nor fallback
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty() && self.fallback.is_none()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.providers.keys().map(KindId::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("kinds", &kinds)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(WidgetData);

    #[async_trait]
    impl DataProvider for Fixed {
        async fn fetch(&self, _request: &FetchRequest) -> Result<WidgetData, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn request(kind: &str) -> FetchRequest {
        FetchRequest {
            kind_id: kind.into(),
            endpoint: "/x".into(),
            params: Default::default(),
        }
    }

    #[tokio::test]
    async fn specific_provider_beats_fallback() {
        let registry = ProviderRegistry::with_fallback(Arc::new(Fixed(json!("fallback"))))
            .with("nps_score", Arc::new(Fixed(json!("nps"))));

        let nps = registry.resolve("nps_score").unwrap();
        assert_eq!(nps.fetch(&request("nps_score")).await.unwrap(), json!("nps"));

        let other = registry.resolve("alerts_feed").unwrap();
        assert_eq!(other.fetch(&request("alerts_feed")).await.unwrap(), json!("fallback"));
        assert!(registry.contains("nps_score"));
        assert!(!registry.contains("alerts_feed"));
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve("nps_score").is_none());
    }
}
