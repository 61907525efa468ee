//! Vantage Core
//!
//! The dashboard aggregate and everything that acts on it at runtime:
//! - [`DashboardSession`]: current dashboard, edit buffer and mode machine
//! - [`WidgetRuntime`]: independent, cancellable data loads per widget
//! - [`PersistenceGateway`]: storage boundary with memory and JSON-file stores
//! - [`VantageConfig`]: TOML configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vantage_core::prelude::*;
//!
//! # async fn example(provider: Arc<dyn DataProvider>) -> Result<(), DashboardError> {
//! let services = DashboardServices::new(
//!     Arc::new(MemoryGateway::new()),
//!     ProviderRegistry::with_fallback(provider),
//! );
//! let actor = Actor::new("u1", "analyst", "acme").with_permission("analytics.read");
//!
//! let mut session = DashboardSession::open(services, actor).await?;
//! session.start_editing()?;
//! session.add_widget("churn_trend", None)?;
//! session.save().await?;
//!
//! let report = session.refresh_all().await;
//! println!("{} widgets refreshed", report.succeeded.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod runtime;
pub mod session;

pub use config::{GridConfig, RuntimeConfig, VantageConfig};
pub use error::{DashboardError, GatewayError};
pub use gateway::{JsonFileGateway, MemoryGateway, PersistenceGateway};
pub use runtime::{
    DataProvider, LoadOutcome, LoadStatus, ProviderError, ProviderRegistry, RefreshReport,
    RuntimeEvent, SyncSummary, WidgetData, WidgetRuntime, WidgetRuntimeState,
};
pub use session::{
    allowed_transitions, validate_transition, DashboardServices, DashboardSession, EditSession,
    SessionMode,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Vantage Core
    pub use crate::{
        DashboardError, DashboardServices, DashboardSession, DataProvider, LoadStatus,
        MemoryGateway, PersistenceGateway, ProviderError, ProviderRegistry, SessionMode,
        WidgetData, WidgetRuntime,
    };
    pub use vantage_catalog::{FetchRequest, WidgetCatalog};
    pub use vantage_model::{Actor, Dashboard, GridPosition, InstanceId, LayoutGeometry};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
