//! Vantage Catalog
//!
//! The set of widget kinds an actor can place on a dashboard.
//!
//! # Core Concepts
//!
//! - [`WidgetCatalog`]: process-wide registry of [`WidgetKind`]s
//! - [`visible_kinds`]: permission filter with any-of semantics and admin override
//! - [`EntitlementProvider`]: subscription-tier predicate composed with the filter
//! - [`FetchRequest`]: a kind's data source resolved for one instance config
//!
//! # Example
//!
//! ```rust
//! use vantage_catalog::{visible_kinds, WidgetCatalog};
//! use vantage_model::Actor;
//!
//! let catalog = WidgetCatalog::builtin();
//! let actor = Actor::new("u1", "analyst", "acme").with_permission("analytics.read");
//! let kinds = visible_kinds(&catalog, &actor);
//! assert!(kinds.iter().any(|k| k.kind_id.as_str() == "churn_summary"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod catalog;
mod entitlement;
mod filter;
mod kind;

pub use catalog::{CatalogError, WidgetCatalog};
pub use entitlement::{AllowAll, EntitlementProvider, TierEntitlements};
pub use filter::{is_visible, visible_kind_ids, visible_kinds, visible_kinds_with};
pub use kind::{DataShape, DataSource, FetchRequest, WidgetCategory, WidgetKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
