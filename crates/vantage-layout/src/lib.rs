//! Vantage Layout
//!
//! Grid geometry for dashboards:
//! - [`LayoutEngine`]: validates and applies structural edits to a draft
//! - [`TemplateRegistry`]: curated starter layouts per role
//! - [`DefaultLayoutGenerator`]: role template filtered by visibility
//!
//! # Example
//!
//! ```rust
//! use vantage_catalog::{AllowAll, WidgetCatalog};
//! use vantage_layout::{DefaultLayoutGenerator, LayoutEngine, TemplateRegistry};
//! use vantage_model::{Actor, GridPosition};
//!
//! let catalog = WidgetCatalog::builtin();
//! let templates = TemplateRegistry::with_defaults();
//! let actor = Actor::new("u1", "viewer", "acme");
//!
//! let draft = DefaultLayoutGenerator::new(&catalog, &templates, &AllowAll).generate(&actor);
//! let engine = LayoutEngine::with_default_grid(&catalog);
//! let placed = engine.add_widget(&draft, "nps_score", Some(GridPosition::new(0, 6)))?;
//! assert_eq!(placed.dashboard.len(), draft.len() + 1);
//! # Ok::<(), vantage_layout::LayoutError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod engine;
mod error;
mod generator;
mod template;

pub use engine::{LayoutEngine, Placement};
pub use error::LayoutError;
pub use generator::DefaultLayoutGenerator;
pub use template::{LayoutTemplate, TemplateEntry, TemplateRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
