//! Error types for layout operations
//!
//! Every variant is a local rejection: the draft passed in is never modified.

use vantage_model::{GeometryViolation, InstanceId, KindId, LayoutGeometry, Role};

/// Layout engine and template errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Kind not in catalog
    #[error("unknown widget kind: {0}")]
    UnknownWidgetKind(KindId),

    /// Instance not in dashboard
    #[error("unknown widget instance: {0}")]
    UnknownWidgetInstance(InstanceId),

    /// Geometry violates grid invariants
    #[error("invalid geometry {geometry}{}: {violation}", fmt_target(.instance_id.as_ref()))]
    InvalidGeometry {
        /// Offending instance (absent for a widget not yet created)
        instance_id: Option<InstanceId>,
        /// Rejected geometry
        geometry: LayoutGeometry,
        /// Violated invariant
        violation: GeometryViolation,
    },

    /// Template rejected at registration
    #[error("invalid template for role {role}: {reason}")]
    InvalidTemplate {
        /// Template role
        role: Role,
        /// What is wrong
        reason: String,
    },
}

fn fmt_target(instance_id: Option<&InstanceId>) -> String {
    instance_id.map(|id| format!(" for {id}")).unwrap_or_default()
}

impl LayoutError {
    /// Create geometry error
    #[inline]
    #[must_use]
    pub fn invalid_geometry(
        instance_id: Option<InstanceId>,
        geometry: LayoutGeometry,
        violation: GeometryViolation,
    ) -> Self {
        Self::InvalidGeometry {
            instance_id,
            geometry,
            violation,
        }
    }
}
