//! Configuration
//!
//! [`VantageConfig`] is read from TOML. Every section and key is optional:
//!
//! ```toml
//! [grid]
//! columns = 12
//!
//! [runtime]
//! load_timeout_ms = 30000
//! auto_refresh_secs = 60
//! event_capacity = 256
//!
//! [entitlements]
//! revenue_overview = "professional"
//! ```

use crate::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use vantage_catalog::TierEntitlements;
use vantage_model::DEFAULT_GRID_COLUMNS;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VantageConfig {
    /// Grid settings
    pub grid: GridConfig,
    /// Widget data runtime settings
    pub runtime: RuntimeConfig,
    /// Minimum subscription tier per widget kind
    pub entitlements: TierEntitlements,
}

impl VantageConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `DashboardError::Config` on malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self, DashboardError> {
        let config: Self =
            toml::from_str(source).map_err(|e| DashboardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `DashboardError::Config` if the file is unreadable or invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DashboardError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| DashboardError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `DashboardError::Config` naming the first invalid key.
    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.grid.columns == 0 {
            return Err(DashboardError::Config("grid.columns must be positive".into()));
        }
        if self.runtime.load_timeout_ms == 0 {
            return Err(DashboardError::Config(
                "runtime.load_timeout_ms must be positive".into(),
            ));
        }
        if self.runtime.auto_refresh_secs == Some(0) {
            return Err(DashboardError::Config(
                "runtime.auto_refresh_secs must be positive when set".into(),
            ));
        }
        if self.runtime.event_capacity == 0 {
            return Err(DashboardError::Config(
                "runtime.event_capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    /// With grid width
    #[inline]
    #[must_use]
    pub fn with_grid_columns(mut self, columns: u32) -> Self {
        self.grid.columns = columns;
        self
    }

    /// With per-load timeout
    #[inline]
    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.runtime.load_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With auto-refresh interval
    #[inline]
    #[must_use]
    pub fn with_auto_refresh(mut self, interval: Duration) -> Self {
        self.runtime.auto_refresh_secs = Some(interval.as_secs().max(1));
        self
    }

    /// With tier entitlements
    #[inline]
    #[must_use]
    pub fn with_entitlements(mut self, entitlements: TierEntitlements) -> Self {
        self.entitlements = entitlements;
        self
    }
}

/// Grid settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Number of grid columns
    pub columns: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_GRID_COLUMNS,
        }
    }
}

/// Widget data runtime settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Deadline for a single data load
    pub load_timeout_ms: u64,
    /// Auto-refresh interval; disabled when absent
    pub auto_refresh_secs: Option<u64>,
    /// Buffered runtime events per subscriber
    pub event_capacity: usize,
}

impl RuntimeConfig {
    /// Load deadline as a duration
    #[inline]
    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Auto-refresh interval as a duration
    #[inline]
    #[must_use]
    pub fn auto_refresh(&self) -> Option<Duration> {
        self.auto_refresh_secs.map(Duration::from_secs)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 30_000,
            auto_refresh_secs: None,
            event_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use vantage_model::SubscriptionTier;

    #[test]
    fn empty_document_yields_defaults() {
        let config = VantageConfig::from_toml_str("").unwrap();
        assert_eq!(config, VantageConfig::default());
        assert_eq!(config.grid.columns, 12);
        assert_eq!(config.runtime.load_timeout(), Duration::from_secs(30));
        assert!(config.runtime.auto_refresh().is_none());
    }

    #[test]
    fn parses_all_sections() {
        let config = VantageConfig::from_toml_str(
            r#"
            [grid]
            columns = 24

            [runtime]
            load_timeout_ms = 500
            auto_refresh_secs = 60

            [entitlements]
            revenue_overview = "professional"
            "#,
        )
        .unwrap();

        assert_eq!(config.grid.columns, 24);
        assert_eq!(config.runtime.load_timeout(), Duration::from_millis(500));
        assert_eq!(config.runtime.auto_refresh(), Some(Duration::from_secs(60)));
        assert_eq!(config.runtime.event_capacity, 256);
        assert_eq!(
            config.entitlements.minimum_for("revenue_overview"),
            Some(SubscriptionTier::Professional)
        );
    }

    #[test]
    fn rejects_invalid_values() {
        for source in [
            "[grid]\ncolumns = 0",
            "[runtime]\nload_timeout_ms = 0",
            "[runtime]\nauto_refresh_secs = 0",
            "[runtime]\nevent_capacity = 0",
            "[grid]\nrows = 3",
            "[entitlements]\nrevenue_overview = \"platinum\"",
        ] {
            let err = VantageConfig::from_toml_str(source).unwrap_err();
            assert!(matches!(err, DashboardError::Config(_)), "{source}: {err}");
        }
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runtime]\nload_timeout_ms = 1234").unwrap();

        let config = VantageConfig::load(file.path()).unwrap();
        assert_eq!(config.runtime.load_timeout_ms, 1234);
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = VantageConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, DashboardError::Config(msg) if msg.contains("absent.toml")));
    }

    #[test]
    fn builders() {
        let config = VantageConfig::new()
            .with_grid_columns(6)
            .with_load_timeout(Duration::from_millis(250))
            .with_auto_refresh(Duration::from_secs(5));
        assert!(config.validate().is_ok());
        assert_eq!(config.grid.columns, 6);
        assert_eq!(config.runtime.load_timeout_ms, 250);
        assert_eq!(config.runtime.auto_refresh_secs, Some(5));
    }
}
