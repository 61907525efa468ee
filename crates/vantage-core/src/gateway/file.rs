//! JSON file dashboard store
//!
//! All dashboards live in one document. Writes go to a sibling temp file
//! which is then renamed over the store, so readers never see a torn file.

use super::{owned_by, prepare_created, prepare_updated, sort_listing, PersistenceGateway};
use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use vantage_model::{Actor, Dashboard, DashboardId};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    dashboards: Vec<Dashboard>,
}

/// Dashboards persisted to a JSON file
#[derive(Debug)]
pub struct JsonFileGateway {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl JsonFileGateway {
    /// Create gateway for `path`; the file is created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreDocument, GatewayError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(StoreDocument::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, document: &StoreDocument) -> Result<(), GatewayError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for JsonFileGateway {
    async fn list_dashboards(&self, actor: &Actor) -> Result<Vec<Dashboard>, GatewayError> {
        let document = self.read().await?;
        let mut found: Vec<Dashboard> = document
            .dashboards
            .into_iter()
            .filter(|d| owned_by(d, actor))
            .collect();
        sort_listing(&mut found);
        Ok(found)
    }

    async fn create_dashboard(&self, dashboard: Dashboard) -> Result<Dashboard, GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read().await?;
        let created = prepare_created(dashboard);
        document.dashboards.push(created.clone());
        self.write(&document).await?;
        tracing::debug!(
            dashboard_id = %created.dashboard_id,
            path = %self.path.display(),
            "created dashboard"
        );
        Ok(created)
    }

    async fn update_dashboard(
        &self,
        dashboard_id: &DashboardId,
        dashboard: Dashboard,
    ) -> Result<Dashboard, GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read().await?;
        let slot = document
            .dashboards
            .iter_mut()
            .find(|d| &d.dashboard_id == dashboard_id)
            .ok_or_else(|| GatewayError::NotFound(dashboard_id.clone()))?;
        let updated = prepare_updated(slot, dashboard)?;
        *slot = updated.clone();
        self.write(&document).await?;
        tracing::debug!(dashboard_id = %dashboard_id, version = updated.version, "updated dashboard");
        Ok(updated)
    }

    async fn delete_dashboard(&self, dashboard_id: &DashboardId) -> Result<(), GatewayError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.read().await?;
        let before = document.dashboards.len();
        document.dashboards.retain(|d| &d.dashboard_id != dashboard_id);
        if document.dashboards.len() == before {
            return Err(GatewayError::NotFound(dashboard_id.clone()));
        }
        self.write(&document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_model::{LayoutGeometry, WidgetConfig, WidgetInstance};

    fn draft() -> Dashboard {
        let mut dashboard =
            Dashboard::new(DashboardId::default_id(), "Ops").owned_by("acme", "u1");
        dashboard
            .push_widget(WidgetInstance::new(
                "w1".into(),
                "nps_score".into(),
                WidgetConfig::new(),
                LayoutGeometry::new(0, 0, 3, 3),
            ))
            .unwrap();
        dashboard
    }

    #[tokio::test]
    async fn missing_file_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileGateway::new(dir.path().join("dashboards.json"));
        let listed = store
            .list_dashboards(&Actor::new("u1", "viewer", "acme"))
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dashboards.json");

        let created = JsonFileGateway::new(&path)
            .create_dashboard(draft())
            .await
            .unwrap();

        let reopened = JsonFileGateway::new(&path);
        let listed = reopened
            .list_dashboards(&Actor::new("u1", "viewer", "acme"))
            .await
            .unwrap();
        assert_eq!(listed, vec![created.clone()]);
        assert!(!path.with_extension("json.tmp").exists());

        reopened.delete_dashboard(&created.dashboard_id).await.unwrap();
        assert!(reopened
            .list_dashboards(&Actor::new("u1", "viewer", "acme"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileGateway::new(dir.path().join("dashboards.json"));
        let created = store.create_dashboard(draft()).await.unwrap();

        store
            .update_dashboard(&created.dashboard_id, created.clone())
            .await
            .unwrap();
        let err = store
            .update_dashboard(&created.dashboard_id, created.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict { expected: 1, actual: 2 }));
    }

    #[tokio::test]
    async fn corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboards.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileGateway::new(&path)
            .list_dashboards(&Actor::new("u1", "viewer", "acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Storage(_)));
    }
}
