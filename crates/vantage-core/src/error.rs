//! Error types for Vantage Core
//!
//! Provides error handling for:
//! - Local rejections of structural edits (draft unchanged)
//! - Edit-session state violations
//! - Persistence failures on load and save
//! - Configuration problems

use vantage_layout::LayoutError;
use vantage_model::{DashboardId, GeometryViolation, InstanceId, KindId, LayoutGeometry};

use crate::session::SessionMode;

/// Main dashboard error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DashboardError {
    /// Kind not in catalog
    #[error("unknown widget kind: {0}")]
    UnknownWidgetKind(KindId),

    /// Instance not in dashboard
    #[error("unknown widget instance: {0}")]
    UnknownWidgetInstance(InstanceId),

    /// Geometry violates grid invariants
    #[error("invalid geometry {geometry}: {violation}")]
    InvalidGeometry {
        /// Offending instance (absent for a widget not yet created)
        instance_id: Option<InstanceId>,
        /// Rejected geometry
        geometry: LayoutGeometry,
        /// Violated invariant
        violation: GeometryViolation,
    },

    /// Kind exists but the actor may not see it
    #[error("widget kind not permitted for this actor: {0}")]
    WidgetNotPermitted(KindId),

    /// Mutation attempted outside an edit session
    #[error("dashboard is not being edited")]
    NotEditing,

    /// Mode change not allowed from the current mode
    #[error("illegal session transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current mode
        from: SessionMode,
        /// Requested mode
        to: SessionMode,
    },

    /// Operation needs the session to be viewing
    #[error("an edit session is in progress")]
    EditInProgress,

    /// Persisting the working copy failed; the session stays in edit mode
    #[error("save failed: {0}")]
    SaveError(#[source] GatewayError),

    /// Loading dashboards failed
    #[error("load failed: {0}")]
    LoadError(#[source] GatewayError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SaveError(err) | Self::LoadError(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Check if error rejected an edit without touching any state
    #[inline]
    #[must_use]
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            Self::UnknownWidgetKind(_)
                | Self::UnknownWidgetInstance(_)
                | Self::InvalidGeometry { .. }
                | Self::WidgetNotPermitted(_)
                | Self::NotEditing
        )
    }
}

impl From<LayoutError> for DashboardError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::UnknownWidgetKind(kind) => Self::UnknownWidgetKind(kind),
            LayoutError::UnknownWidgetInstance(id) => Self::UnknownWidgetInstance(id),
            LayoutError::InvalidGeometry {
                instance_id,
                geometry,
                violation,
            } => Self::InvalidGeometry {
                instance_id,
                geometry,
                violation,
            },
            LayoutError::InvalidTemplate { .. } => Self::Config(err.to_string()),
        }
    }
}

/// Persistence gateway errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Dashboard does not exist
    #[error("dashboard not found: {0}")]
    NotFound(DashboardId),

    /// Stored version moved on since the caller read it
    #[error("version conflict: expected {expected}, stored {actual}")]
    Conflict {
        /// Version the caller based its edit on
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Backend temporarily unreachable
    #[error("persistence unavailable: {0}")]
    Unavailable(String),

    /// Backend failed reading or writing
    #[error("storage error: {0}")]
    Storage(String),
}

impl GatewayError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(format!("malformed store: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_errors_map_to_local_rejections() {
        let err: DashboardError = LayoutError::UnknownWidgetKind(KindId::from("nope")).into();
        assert_eq!(err, DashboardError::UnknownWidgetKind(KindId::from("nope")));
        assert!(err.is_local_rejection());
        assert!(!err.is_retryable());
    }

    #[test]
    fn save_error_retryability_follows_gateway() {
        let transient = DashboardError::SaveError(GatewayError::Unavailable("down".into()));
        assert!(transient.is_retryable());
        assert!(!transient.is_local_rejection());

        let conflict = DashboardError::SaveError(GatewayError::Conflict {
            expected: 1,
            actual: 2,
        });
        assert!(!conflict.is_retryable());
        assert_eq!(
            conflict.to_string(),
            "save failed: version conflict: expected 1, stored 2"
        );
    }
}
