//! Widget catalog
//!
//! Read-only registry of [`WidgetKind`]s keyed by `kind_id`, in registration
//! order. Built once at startup and shared behind an `Arc`; adding a widget
//! kind is a registration here, never a change to dashboard logic.

use crate::kind::{DataShape, DataSource, WidgetCategory, WidgetKind};
use indexmap::IndexMap;
use serde_json::json;
use std::collections::BTreeMap;
use vantage_model::{GridSize, KindId};

/// Catalog construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// `kind_id` registered twice
    #[error("widget kind already registered: {0}")]
    DuplicateKind(KindId),
}

/// Registry of widget kinds
#[derive(Debug, Clone, Default)]
pub struct WidgetCatalog {
    kinds: IndexMap<KindId, WidgetKind>,
}

impl WidgetCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: IndexMap::new(),
        }
    }

    /// Register a kind
    ///
    /// # Errors
    /// `CatalogError::DuplicateKind` if the id is taken.
    pub fn register(&mut self, kind: WidgetKind) -> Result<(), CatalogError> {
        if self.kinds.contains_key(&kind.kind_id) {
            return Err(CatalogError::DuplicateKind(kind.kind_id));
        }
        self.kinds.insert(kind.kind_id.clone(), kind);
        Ok(())
    }

    /// Build a catalog from kinds
    ///
    /// # Errors
    /// `CatalogError::DuplicateKind` on the first repeated id.
    pub fn from_kinds(kinds: impl IntoIterator<Item = WidgetKind>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for kind in kinds {
            catalog.register(kind)?;
        }
        Ok(catalog)
    }

    /// Look up a kind; unknown ids are simply absent
    #[inline]
    #[must_use]
    pub fn get(&self, kind_id: &str) -> Option<&WidgetKind> {
        self.kinds.get(kind_id)
    }

    /// Check if kind exists
    #[inline]
    #[must_use]
    pub fn contains(&self, kind_id: &str) -> bool {
        self.kinds.contains_key(kind_id)
    }

    /// All kinds in registration order
    #[must_use]
    pub fn list_all(&self) -> Vec<&WidgetKind> {
        self.kinds.values().collect()
    }

    /// Iterate over kinds
    pub fn iter(&self) -> impl Iterator<Item = &WidgetKind> {
        self.kinds.values()
    }

    /// Kinds grouped by category, registration order within a group
    #[must_use]
    pub fn by_category(&self) -> BTreeMap<WidgetCategory, Vec<&WidgetKind>> {
        let mut groups: BTreeMap<WidgetCategory, Vec<&WidgetKind>> = BTreeMap::new();
        for kind in self.kinds.values() {
            groups.entry(kind.category).or_default().push(kind);
        }
        groups
    }

    /// Get number of kinds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Built-in customer analytics widgets
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for kind in builtin_kinds() {
            // Built-in ids are distinct literals
            let _ = catalog.register(kind);
        }
        catalog
    }
}

fn builtin_kinds() -> Vec<WidgetKind> {
    vec![
        WidgetKind::new(
            "churn_summary",
            "Churn Summary",
            WidgetCategory::Overview,
            GridSize::new(4, 3),
            DataShape::Scalar,
            DataSource::new("/analytics/churn/summary", ["period"]),
        )
        .with_description("Churn rate with change versus the previous period")
        .with_icon("trending-down")
        .requires("analytics.read")
        .with_default("period", json!("30d")),
        WidgetKind::new(
            "churn_trend",
            "Churn Trend",
            WidgetCategory::Churn,
            GridSize::new(8, 4),
            DataShape::TimeSeries,
            DataSource::new("/analytics/churn/trend", ["period", "granularity"]),
        )
        .with_description("Churn rate over time")
        .with_icon("line-chart")
        .requires("analytics.read")
        .with_default("period", json!("90d"))
        .with_default("granularity", json!("week")),
        WidgetKind::new(
            "customer_list",
            "Customer List",
            WidgetCategory::Customers,
            GridSize::new(12, 6),
            DataShape::Table,
            DataSource::new("/customers", ["page_size", "sort", "segment"]),
        )
        .with_description("Customers ranked by churn risk")
        .with_icon("users")
        .requires("customer.read")
        .with_default("page_size", json!(25))
        .with_default("sort", json!("risk_desc")),
        WidgetKind::new(
            "risk_distribution",
            "Risk Distribution",
            WidgetCategory::Risk,
            GridSize::new(6, 4),
            DataShape::Distribution,
            DataSource::new("/analytics/risk/distribution", ["buckets"]),
        )
        .with_description("Customers per churn-risk bucket")
        .with_icon("pie-chart")
        .requires("analytics.read")
        .requires("customer.read")
        .with_default("buckets", json!(5)),
        WidgetKind::new(
            "revenue_overview",
            "Revenue Overview",
            WidgetCategory::Revenue,
            GridSize::new(6, 4),
            DataShape::TimeSeries,
            DataSource::new("/analytics/revenue", ["period", "currency"]),
        )
        .with_description("Recurring revenue and revenue at risk")
        .with_icon("dollar-sign")
        .requires("revenue.read")
        .with_default("period", json!("12m"))
        .with_default("currency", json!("USD")),
        WidgetKind::new(
            "retention_cohorts",
            "Retention Cohorts",
            WidgetCategory::Churn,
            GridSize::new(12, 5),
            DataShape::Table,
            DataSource::new("/analytics/retention/cohorts", ["cohort_size"]),
        )
        .with_description("Retention by signup cohort")
        .with_icon("grid")
        .requires("analytics.read")
        .with_default("cohort_size", json!("month")),
        WidgetKind::new(
            "engagement_heatmap",
            "Engagement Heatmap",
            WidgetCategory::Engagement,
            GridSize::new(6, 4),
            DataShape::Distribution,
            DataSource::new("/analytics/engagement/heatmap", ["period"]),
        )
        .with_description("Activity by weekday and hour")
        .with_icon("activity")
        .requires("engagement.read")
        .with_default("period", json!("30d")),
        WidgetKind::new(
            "nps_score",
            "NPS Score",
            WidgetCategory::Overview,
            GridSize::new(3, 3),
            DataShape::Scalar,
            DataSource::new("/feedback/nps", ["period"]),
        )
        .with_description("Net promoter score")
        .with_icon("smile")
        .with_default("period", json!("90d")),
        WidgetKind::new(
            "usage_metrics",
            "Usage Metrics",
            WidgetCategory::Engagement,
            GridSize::new(6, 3),
            DataShape::TimeSeries,
            DataSource::new("/analytics/usage", ["metric", "period"]),
        )
        .with_description("Active users and feature adoption")
        .with_icon("bar-chart")
        .requires("engagement.read")
        .requires("analytics.read")
        .with_default("metric", json!("active_users"))
        .with_default("period", json!("30d")),
        WidgetKind::new(
            "alerts_feed",
            "Alerts",
            WidgetCategory::Operations,
            GridSize::new(4, 6),
            DataShape::Feed,
            DataSource::new("/alerts", ["limit", "severity"]),
        )
        .with_description("Recent churn-risk alerts")
        .with_icon("bell")
        .with_default("limit", json!(20))
        .with_default("severity", json!("warning")),
        WidgetKind::new(
            "org_activity",
            "Organization Activity",
            WidgetCategory::Operations,
            GridSize::new(6, 4),
            DataShape::Feed,
            DataSource::new("/admin/activity", ["limit"]),
        )
        .with_description("Audit trail of user actions")
        .with_icon("shield")
        .requires("admin.audit")
        .with_default("limit", json!(50)),
    ]
}
