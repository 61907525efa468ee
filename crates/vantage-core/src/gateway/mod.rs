//! Persistence gateway
//!
//! The dashboard core never talks to storage directly. It calls a
//! [`PersistenceGateway`] at three points only: initial load, save, and
//! dashboard management (switch/delete).
//!
//! Implementations:
//! - [`MemoryGateway`]: process-local, for tests and demos
//! - [`JsonFileGateway`]: a single JSON document on disk

mod file;
mod memory;

pub use file::JsonFileGateway;
pub use memory::MemoryGateway;

use crate::error::GatewayError;
use async_trait::async_trait;
use std::fmt::Debug;
use vantage_model::{Actor, Dashboard, DashboardId};

/// Storage contract for dashboards
///
/// Dashboards are scoped to an organization and owner; implementations must
/// only return dashboards whose `organization_id` and `owner_id` match the
/// actor. Writes use `Dashboard::version` for optimistic concurrency.
#[async_trait]
pub trait PersistenceGateway: Send + Sync + Debug {
    /// Saved dashboards visible to `actor`, oldest first
    async fn list_dashboards(&self, actor: &Actor) -> Result<Vec<Dashboard>, GatewayError>;

    /// Persist a new dashboard
    ///
    /// The store assigns a fresh id, clears `is_default` and sets `version`
    /// to 1. Returns the stored dashboard.
    async fn create_dashboard(&self, dashboard: Dashboard) -> Result<Dashboard, GatewayError>;

    /// Replace a stored dashboard
    ///
    /// `dashboard.version` must equal the stored version, otherwise
    /// `GatewayError::Conflict`. Returns the stored dashboard with its
    /// version incremented.
    async fn update_dashboard(
        &self,
        dashboard_id: &DashboardId,
        dashboard: Dashboard,
    ) -> Result<Dashboard, GatewayError>;

    /// Remove a stored dashboard
    async fn delete_dashboard(&self, dashboard_id: &DashboardId) -> Result<(), GatewayError>;
}

/// Fresh store-assigned dashboard id
pub(crate) fn new_dashboard_id() -> DashboardId {
    DashboardId::new(uuid::Uuid::new_v4().to_string())
}

/// Whether `dashboard` belongs to `actor`'s tenant and account
pub(crate) fn owned_by(dashboard: &Dashboard, actor: &Actor) -> bool {
    dashboard.organization_id.as_deref() == Some(actor.organization_id.as_str())
        && dashboard.owner_id.as_deref() == Some(actor.actor_id.as_str())
}

/// Stamp a dashboard as newly created
pub(crate) fn prepare_created(mut dashboard: Dashboard) -> Dashboard {
    dashboard.dashboard_id = new_dashboard_id();
    dashboard.is_default = false;
    dashboard.version = 1;
    dashboard
}

/// Check the caller's version and stamp the replacement
pub(crate) fn prepare_updated(
    stored: &Dashboard,
    mut dashboard: Dashboard,
) -> Result<Dashboard, GatewayError> {
    if stored.version != dashboard.version {
        return Err(GatewayError::Conflict {
            expected: dashboard.version,
            actual: stored.version,
        });
    }
    dashboard.dashboard_id = stored.dashboard_id.clone();
    dashboard.organization_id = stored.organization_id.clone();
    dashboard.owner_id = stored.owner_id.clone();
    dashboard.created_at = stored.created_at;
    dashboard.is_default = false;
    dashboard.version = stored.version + 1;
    Ok(dashboard)
}

/// Oldest first, id as tiebreak
pub(crate) fn sort_listing(dashboards: &mut [Dashboard]) {
    dashboards.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.dashboard_id.cmp(&b.dashboard_id))
    });
}
