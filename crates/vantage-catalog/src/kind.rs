//! Widget kind metadata
//!
//! A [`WidgetKind`] is an immutable catalog entry. Besides display metadata it
//! carries everything the runtime needs to fetch data for an instance:
//! a [`DataShape`] tag and a [`DataSource`] descriptor that is resolved
//! against the instance config into a [`FetchRequest`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use vantage_model::{GridSize, KindId, Permission, WidgetConfig};

/// Grouping used by the widget library picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetCategory {
    /// Headline numbers
    Overview,
    /// Churn analytics
    Churn,
    /// Customer records
    Customers,
    /// Revenue analytics
    Revenue,
    /// Product engagement
    Engagement,
    /// Risk scoring
    Risk,
    /// Alerts and audit trails
    Operations,
}

impl WidgetCategory {
    /// Display label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Churn => "Churn",
            Self::Customers => "Customers",
            Self::Revenue => "Revenue",
            Self::Engagement => "Engagement",
            Self::Risk => "Risk",
            Self::Operations => "Operations",
        }
    }
}

impl fmt::Display for WidgetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shape of the payload a kind's data provider returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataShape {
    /// Single value with optional delta
    Scalar,
    /// Ordered `(timestamp, value)` points
    TimeSeries,
    /// Rows and columns
    Table,
    /// Buckets with counts
    Distribution,
    /// Reverse-chronological entries
    Feed,
}

/// Where a kind's data comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Logical endpoint understood by the data provider
    pub endpoint: String,
    /// Config keys forwarded as query parameters
    pub params: Vec<String>,
}

impl DataSource {
    /// Create descriptor
    #[must_use]
    pub fn new<I, S>(endpoint: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoint: endpoint.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetKind {
    /// Unique across the catalog
    pub kind_id: KindId,
    /// Display name
    pub display_name: String,
    /// One-line description
    pub description: String,
    /// Icon name
    pub icon: String,
    /// Library grouping
    pub category: WidgetCategory,
    /// Size of a freshly added instance
    pub default_geometry: GridSize,
    /// Any-of; empty means always visible
    pub required_permissions: BTreeSet<Permission>,
    /// Config of a freshly added instance
    pub default_config: WidgetConfig,
    /// Payload shape
    pub shape: DataShape,
    /// Fetch descriptor
    pub source: DataSource,
}

impl WidgetKind {
    /// Create kind with empty metadata
    #[must_use]
    pub fn new(
        kind_id: impl Into<KindId>,
        display_name: impl Into<String>,
        category: WidgetCategory,
        default_geometry: GridSize,
        shape: DataShape,
        source: DataSource,
    ) -> Self {
        Self {
            kind_id: kind_id.into(),
            display_name: display_name.into(),
            description: String::new(),
            icon: String::new(),
            category,
            default_geometry,
            required_permissions: BTreeSet::new(),
            default_config: WidgetConfig::new(),
            shape,
            source,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With icon
    #[inline]
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Add a permission that grants visibility
    #[inline]
    #[must_use]
    pub fn requires(mut self, permission: impl Into<Permission>) -> Self {
        self.required_permissions.insert(permission.into());
        self
    }

    /// Add a default config entry
    #[inline]
    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>, value: Value) -> Self {
        self.default_config.insert(key.into(), value);
        self
    }

    /// Whether visibility is unrestricted
    #[inline]
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.required_permissions.is_empty()
    }
}

/// A kind's data source resolved against one instance config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Kind being fetched
    pub kind_id: KindId,
    /// Endpoint from the kind's descriptor
    pub endpoint: String,
    /// Declared params present in config (or defaults)
    pub params: BTreeMap<String, Value>,
}

impl FetchRequest {
    /// Resolve `kind.source` against `config`.
    ///
    /// Declared params missing from `config` fall back to `kind.default_config`;
    /// params absent from both are omitted.
    #[must_use]
    pub fn resolve(kind: &WidgetKind, config: &WidgetConfig) -> Self {
        let params = kind
            .source
            .params
            .iter()
            .filter_map(|name| {
                config
                    .get(name)
                    .or_else(|| kind.default_config.get(name))
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect();

        Self {
            kind_id: kind.kind_id.clone(),
            endpoint: kind.source.endpoint.clone(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn churn_trend() -> WidgetKind {
        WidgetKind::new(
            "churn_trend",
            "Churn Trend",
            WidgetCategory::Churn,
            GridSize::new(8, 4),
            DataShape::TimeSeries,
            DataSource::new("/analytics/churn/trend", ["period", "granularity"]),
        )
        .requires("analytics.read")
        .with_default("period", json!("90d"))
        .with_default("granularity", json!("week"))
    }

    #[test]
    fn resolve_prefers_instance_config() {
        let kind = churn_trend();
        let mut config = WidgetConfig::new();
        config.insert("period".into(), json!("30d"));
        config.insert("unrelated".into(), json!(true));

        let req = FetchRequest::resolve(&kind, &config);
        assert_eq!(req.endpoint, "/analytics/churn/trend");
        assert_eq!(req.params["period"], json!("30d"));
        assert_eq!(req.params["granularity"], json!("week"));
        assert!(!req.params.contains_key("unrelated"));
    }

    #[test]
    fn resolve_omits_unknown_params() {
        let kind = WidgetKind::new(
            "x",
            "X",
            WidgetCategory::Overview,
            GridSize::new(2, 2),
            DataShape::Scalar,
            DataSource::new("/x", ["missing"]),
        );
        let req = FetchRequest::resolve(&kind, &WidgetConfig::new());
        assert!(req.params.is_empty());
    }

    #[test]
    fn public_kinds() {
        assert!(!churn_trend().is_public());
    }
}
