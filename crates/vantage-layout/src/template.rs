//! Role templates
//!
//! Provides [`TemplateRegistry`]: curated starter layouts keyed by role.
//! Roles without a template resolve to the most restrictive one (`viewer`).

use crate::error::LayoutError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vantage_model::{KindId, LayoutGeometry, Role, DEFAULT_GRID_COLUMNS};

/// One slot of a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    /// Widget kind placed in this slot
    pub kind_id: KindId,
    /// Slot geometry
    pub geometry: LayoutGeometry,
}

impl TemplateEntry {
    /// Create entry
    #[inline]
    #[must_use]
    pub fn new(kind_id: impl Into<KindId>, geometry: LayoutGeometry) -> Self {
        Self {
            kind_id: kind_id.into(),
            geometry,
        }
    }
}

/// Ordered starter layout for a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutTemplate {
    /// Role this template serves
    pub role: Role,
    /// Name given to generated dashboards
    pub name: String,
    /// Description given to generated dashboards
    pub description: String,
    /// Slots in display order
    pub entries: Vec<TemplateEntry>,
}

impl LayoutTemplate {
    /// Create empty template
    #[must_use]
    pub fn new(role: impl Into<Role>, name: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            description: String::new(),
            entries: Vec::new(),
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a slot
    #[inline]
    #[must_use]
    pub fn slot(mut self, kind_id: &str, x: i32, y: i32, w: i32, h: i32) -> Self {
        self.entries
            .push(TemplateEntry::new(kind_id, LayoutGeometry::new(x, y, w, h)));
        self
    }
}

/// Templates keyed by role
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<Role, LayoutTemplate>,
    columns: u32,
}

impl TemplateRegistry {
    /// Create empty registry for a grid `columns` wide
    #[inline]
    #[must_use]
    pub fn new(columns: u32) -> Self {
        Self {
            templates: HashMap::new(),
            columns,
        }
    }

    /// Create registry with built-in templates on the 12-column grid
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new(DEFAULT_GRID_COLUMNS);
        for template in builtin_templates() {
            // Built-ins are covered by tests against the 12-column grid
            let _ = registry.register(template);
        }
        registry
    }

    /// Register a template, replacing any for the same role
    ///
    /// # Errors
    /// `LayoutError::InvalidTemplate` if a slot geometry leaves the grid.
    pub fn register(&mut self, template: LayoutTemplate) -> Result<(), LayoutError> {
        for entry in &template.entries {
            entry
                .geometry
                .validate(self.columns)
                .map_err(|violation| LayoutError::InvalidTemplate {
                    role: template.role.clone(),
                    reason: format!("slot {} {}: {violation}", entry.kind_id, entry.geometry),
                })?;
        }
        self.templates.insert(template.role.clone(), template);
        Ok(())
    }

    /// Template registered for exactly `role`
    #[inline]
    #[must_use]
    pub fn get(&self, role: &Role) -> Option<&LayoutTemplate> {
        self.templates.get(role)
    }

    /// Template for `role`, falling back to the viewer template
    #[must_use]
    pub fn resolve(&self, role: &Role) -> Option<&LayoutTemplate> {
        self.templates
            .get(role)
            .or_else(|| self.templates.get(&Role::from(Role::VIEWER)))
    }

    /// Registered roles
    #[must_use]
    pub fn roles(&self) -> Vec<&Role> {
        let mut roles: Vec<_> = self.templates.keys().collect();
        roles.sort();
        roles
    }

    /// Grid width templates are validated against
    #[inline]
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Get number of templates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn builtin_templates() -> Vec<LayoutTemplate> {
    vec![
        LayoutTemplate::new("viewer", "Overview")
            .with_description("Headline churn metrics")
            .slot("churn_summary", 0, 0, 4, 3)
            .slot("nps_score", 4, 0, 3, 3)
            .slot("alerts_feed", 7, 0, 5, 6),
        LayoutTemplate::new("analyst", "Churn Analysis")
            .with_description("Churn drivers, cohorts and engagement")
            .slot("churn_summary", 0, 0, 4, 3)
            .slot("nps_score", 4, 0, 3, 3)
            .slot("risk_distribution", 7, 0, 5, 4)
            .slot("churn_trend", 0, 3, 7, 4)
            .slot("retention_cohorts", 0, 7, 12, 5)
            .slot("usage_metrics", 0, 12, 6, 3)
            .slot("engagement_heatmap", 6, 12, 6, 4),
        LayoutTemplate::new("manager", "Account Health")
            .with_description("Revenue at risk and accounts to act on")
            .slot("churn_summary", 0, 0, 4, 3)
            .slot("revenue_overview", 4, 0, 8, 4)
            .slot("nps_score", 0, 3, 4, 3)
            .slot("risk_distribution", 4, 4, 8, 4)
            .slot("customer_list", 0, 8, 12, 6),
        LayoutTemplate::new("admin", "Organization Overview")
            .with_description("Everything, including the audit trail")
            .slot("churn_summary", 0, 0, 4, 3)
            .slot("revenue_overview", 4, 0, 8, 4)
            .slot("nps_score", 0, 3, 4, 3)
            .slot("churn_trend", 0, 6, 8, 4)
            .slot("alerts_feed", 8, 4, 4, 6)
            .slot("customer_list", 0, 10, 12, 6)
            .slot("org_activity", 0, 16, 6, 4)
            .slot("usage_metrics", 6, 16, 6, 3),
    ]
}
