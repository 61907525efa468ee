//! Vantage Model
//!
//! Entity model shared by every Vantage crate:
//! - Identifiers for widget kinds, instances and dashboards
//! - Actor claims (role, permissions, admin override, tenant tier)
//! - Grid geometry and its invariants
//! - Dashboards and widget instances

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod actor;
mod dashboard;
mod geometry;
mod ids;

pub use actor::{Actor, Permission, Role, SubscriptionTier, UnknownTier};
pub use dashboard::{merge_config, Dashboard, ModelError, WidgetConfig, WidgetInstance};
pub use geometry::{
    GeometryViolation, GridPosition, GridSize, LayoutGeometry, DEFAULT_GRID_COLUMNS,
};
pub use ids::{DashboardId, InstanceId, KindId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
