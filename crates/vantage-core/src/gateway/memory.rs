//! In-process dashboard store

use super::{owned_by, prepare_created, prepare_updated, sort_listing, PersistenceGateway};
use crate::error::GatewayError;
use async_trait::async_trait;
use dashmap::DashMap;
use vantage_model::{Actor, Dashboard, DashboardId};

/// Dashboards held in a concurrent map
#[derive(Debug, Default)]
pub struct MemoryGateway {
    dashboards: DashMap<DashboardId, Dashboard>,
}

impl MemoryGateway {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store pre-populated with dashboards, stored as given
    #[must_use]
    pub fn with_dashboards(dashboards: impl IntoIterator<Item = Dashboard>) -> Self {
        let store = Self::new();
        for dashboard in dashboards {
            store
                .dashboards
                .insert(dashboard.dashboard_id.clone(), dashboard);
        }
        store
    }

    /// Stored dashboard by id, regardless of owner
    #[must_use]
    pub fn get(&self, dashboard_id: &DashboardId) -> Option<Dashboard> {
        self.dashboards.get(dashboard_id).map(|d| d.value().clone())
    }

    /// Get number of stored dashboards
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dashboards.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dashboards.is_empty()
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn list_dashboards(&self, actor: &Actor) -> Result<Vec<Dashboard>, GatewayError> {
        let mut found: Vec<Dashboard> = self
            .dashboards
            .iter()
            .filter(|entry| owned_by(entry.value(), actor))
            .map(|entry| entry.value().clone())
            .collect();
        sort_listing(&mut found);
        Ok(found)
    }

    async fn create_dashboard(&self, dashboard: Dashboard) -> Result<Dashboard, GatewayError> {
        let created = prepare_created(dashboard);
        self.dashboards
            .insert(created.dashboard_id.clone(), created.clone());
        tracing::debug!(dashboard_id = %created.dashboard_id, "created dashboard");
        Ok(created)
    }

    async fn update_dashboard(
        &self,
        dashboard_id: &DashboardId,
        dashboard: Dashboard,
    ) -> Result<Dashboard, GatewayError> {
        let mut entry = self
            .dashboards
            .get_mut(dashboard_id)
            .ok_or_else(|| GatewayError::NotFound(dashboard_id.clone()))?;
        let updated = prepare_updated(entry.value(), dashboard)?;
        *entry.value_mut() = updated.clone();
        tracing::debug!(dashboard_id = %dashboard_id, version = updated.version, "updated dashboard");
        Ok(updated)
    }

    async fn delete_dashboard(&self, dashboard_id: &DashboardId) -> Result<(), GatewayError> {
        self.dashboards
            .remove(dashboard_id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(dashboard_id.clone()))
    }
}
