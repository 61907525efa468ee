//! Dashboard aggregate entities
//!
//! A [`Dashboard`] owns an ordered set of [`WidgetInstance`]s. Geometry lives
//! on the instance itself, so widgets and layout entries correspond 1:1 by
//! construction; [`Dashboard::layout`] is a derived view.

use crate::geometry::LayoutGeometry;
use crate::ids::{DashboardId, InstanceId, KindId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Free-form per-instance configuration
pub type WidgetConfig = serde_json::Map<String, serde_json::Value>;

/// Shallow merge: every top-level key of `partial` overwrites `base`
pub fn merge_config(base: &mut WidgetConfig, partial: &WidgetConfig) {
    for (key, value) in partial {
        base.insert(key.clone(), value.clone());
    }
}

/// One placed, configured occurrence of a widget kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetInstance {
    /// Unique within the owning dashboard
    pub instance_id: InstanceId,
    /// Catalog kind
    pub kind_id: KindId,
    /// Instance configuration
    #[serde(default)]
    pub config: WidgetConfig,
    /// Grid placement
    pub geometry: LayoutGeometry,
}

impl WidgetInstance {
    /// Create instance
    #[inline]
    #[must_use]
    pub fn new(
        instance_id: InstanceId,
        kind_id: KindId,
        config: WidgetConfig,
        geometry: LayoutGeometry,
    ) -> Self {
        Self {
            instance_id,
            kind_id,
            config,
            geometry,
        }
    }
}

/// Model invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Two widgets share an instance id
    #[error("duplicate widget instance: {0}")]
    DuplicateInstance(InstanceId),
}

/// A personal dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Identifier (`"default"` until persisted)
    pub dashboard_id: DashboardId,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Widgets in display order
    widgets: Vec<WidgetInstance>,
    /// Generated from a role template and never saved
    pub is_default: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by every successful update
    #[serde(default)]
    pub version: u64,
    /// Owning tenant
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Owning actor
    #[serde(default)]
    pub owner_id: Option<String>,
}

impl Dashboard {
    /// Create an empty dashboard
    #[must_use]
    pub fn new(dashboard_id: DashboardId, name: impl Into<String>) -> Self {
        Self {
            dashboard_id,
            name: name.into(),
            description: String::new(),
            widgets: Vec::new(),
            is_default: false,
            created_at: Utc::now(),
            version: 0,
            organization_id: None,
            owner_id: None,
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Scope to a tenant and owner
    #[inline]
    #[must_use]
    pub fn owned_by(mut self, organization_id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self.owner_id = Some(owner_id.into());
        self
    }

    /// Widgets in display order
    #[inline]
    #[must_use]
    pub fn widgets(&self) -> &[WidgetInstance] {
        &self.widgets
    }

    /// Number of widgets
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Whether there are no widgets
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Look up a widget
    #[must_use]
    pub fn widget(&self, instance_id: &InstanceId) -> Option<&WidgetInstance> {
        self.widgets.iter().find(|w| &w.instance_id == instance_id)
    }

    /// Look up a widget mutably
    pub fn widget_mut(&mut self, instance_id: &InstanceId) -> Option<&mut WidgetInstance> {
        self.widgets
            .iter_mut()
            .find(|w| &w.instance_id == instance_id)
    }

    /// Whether a widget with this id exists
    #[inline]
    #[must_use]
    pub fn contains(&self, instance_id: &InstanceId) -> bool {
        self.widget(instance_id).is_some()
    }

    /// Instance ids in display order
    pub fn instance_ids(&self) -> impl Iterator<Item = &InstanceId> {
        self.widgets.iter().map(|w| &w.instance_id)
    }

    /// Geometry per instance
    #[must_use]
    pub fn layout(&self) -> BTreeMap<InstanceId, LayoutGeometry> {
        self.widgets
            .iter()
            .map(|w| (w.instance_id.clone(), w.geometry))
            .collect()
    }

    /// Lowest occupied row edge (`max(y + h)`), 0 when empty
    #[must_use]
    pub fn lowest_edge(&self) -> i64 {
        self.widgets
            .iter()
            .map(|w| w.geometry.bottom())
            .max()
            .unwrap_or(0)
    }

    /// Append a widget
    ///
    /// # Errors
    /// `ModelError::DuplicateInstance` if the id is already present.
    pub fn push_widget(&mut self, widget: WidgetInstance) -> Result<(), ModelError> {
        if self.contains(&widget.instance_id) {
            return Err(ModelError::DuplicateInstance(widget.instance_id));
        }
        self.widgets.push(widget);
        Ok(())
    }

    /// Remove a widget, returning it if it was present
    pub fn remove_widget(&mut self, instance_id: &InstanceId) -> Option<WidgetInstance> {
        let idx = self
            .widgets
            .iter()
            .position(|w| &w.instance_id == instance_id)?;
        Some(self.widgets.remove(idx))
    }

    /// Verify instance ids are unique (for dashboards read from storage)
    ///
    /// # Errors
    /// The first duplicated id.
    pub fn check_integrity(&self) -> Result<(), ModelError> {
        let mut seen = HashSet::with_capacity(self.widgets.len());
        for widget in &self.widgets {
            if !seen.insert(&widget.instance_id) {
                return Err(ModelError::DuplicateInstance(widget.instance_id.clone()));
            }
        }
        Ok(())
    }
}
