//! Dashboard session
//!
//! [`DashboardSession`] owns one actor's current dashboard, its edit buffer
//! and the widget data runtime for whatever is on screen.
//!
//! # Modes
//!
//! ```text
//! Viewing --start_editing--> Editing --save--> Saving --ok--> Viewing
//!                              |  ^                |
//!                              |  +-----failed-----+
//!                              +------cancel------> Viewing
//! ```
//!
//! Structural edits apply to a working copy and are only accepted while
//! editing. Automatic data loads are paused for the duration of an edit and
//! resumed when it ends either way.

use crate::config::VantageConfig;
use crate::error::{DashboardError, GatewayError};
use crate::gateway::PersistenceGateway;
use crate::runtime::{
    LoadOutcome, ProviderRegistry, RefreshReport, WidgetRuntime, WidgetRuntimeState,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use vantage_catalog::{
    is_visible, visible_kinds_with, AllowAll, EntitlementProvider, WidgetCatalog, WidgetKind,
};
use vantage_layout::{DefaultLayoutGenerator, LayoutEngine, TemplateRegistry};
use vantage_model::{
    Actor, Dashboard, DashboardId, GridPosition, InstanceId, KindId, LayoutGeometry, WidgetConfig,
};

/// Session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    /// Showing the committed dashboard
    Viewing,
    /// Buffering structural edits
    Editing,
    /// Working copy is being persisted
    Saving,
}

/// Modes reachable from `from`
#[must_use]
pub fn allowed_transitions(from: SessionMode) -> &'static [SessionMode] {
    use SessionMode::{Editing, Saving, Viewing};
    match from {
        Viewing => &[Editing],
        Editing => &[Saving, Viewing],
        Saving => &[Viewing, Editing],
    }
}

/// Check a mode change
///
/// # Errors
/// `DashboardError::IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: SessionMode, to: SessionMode) -> Result<(), DashboardError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(DashboardError::IllegalTransition { from, to })
    }
}

/// Edit buffer
#[derive(Debug, Clone)]
pub struct EditSession {
    base_snapshot: Dashboard,
    working: Dashboard,
}

impl EditSession {
    fn begin(base: Dashboard) -> Self {
        Self {
            working: base.clone(),
            base_snapshot: base,
        }
    }

    /// Dashboard as it was when editing started
    #[inline]
    #[must_use]
    pub fn base_snapshot(&self) -> &Dashboard {
        &self.base_snapshot
    }

    /// Dashboard with the edits applied so far
    #[inline]
    #[must_use]
    pub fn working(&self) -> &Dashboard {
        &self.working
    }

    /// Check if the working copy differs from the snapshot
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.working != self.base_snapshot
    }
}

/// Shared collaborators for sessions
#[derive(Debug, Clone)]
pub struct DashboardServices {
    catalog: Arc<WidgetCatalog>,
    templates: Arc<TemplateRegistry>,
    entitlements: Arc<dyn EntitlementProvider>,
    gateway: Arc<dyn PersistenceGateway>,
    providers: ProviderRegistry,
    config: VantageConfig,
}

impl DashboardServices {
    /// Built-in catalog and templates, no tier gating, default config
    #[must_use]
    pub fn new(gateway: Arc<dyn PersistenceGateway>, providers: ProviderRegistry) -> Self {
        Self {
            catalog: Arc::new(WidgetCatalog::builtin()),
            templates: Arc::new(TemplateRegistry::with_defaults()),
            entitlements: Arc::new(AllowAll),
            gateway,
            providers,
            config: VantageConfig::default(),
        }
    }

    /// Services configured from `config`, including its tier entitlements
    #[must_use]
    pub fn from_config(
        config: VantageConfig,
        gateway: Arc<dyn PersistenceGateway>,
        providers: ProviderRegistry,
    ) -> Self {
        let entitlements: Arc<dyn EntitlementProvider> = if config.entitlements.is_empty() {
            Arc::new(AllowAll)
        } else {
            Arc::new(config.entitlements.clone())
        };
        Self::new(gateway, providers)
            .with_entitlements(entitlements)
            .with_config(config)
    }

    /// With catalog
    #[inline]
    #[must_use]
    pub fn with_catalog(mut self, catalog: WidgetCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// With role templates
    #[inline]
    #[must_use]
    pub fn with_templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = Arc::new(templates);
        self
    }

    /// With entitlement predicate
    #[inline]
    #[must_use]
    pub fn with_entitlements(mut self, entitlements: Arc<dyn EntitlementProvider>) -> Self {
        self.entitlements = entitlements;
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: VantageConfig) -> Self {
        self.config = config;
        self
    }

    /// Widget catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &WidgetCatalog {
        &self.catalog
    }

    /// Persistence gateway
    #[inline]
    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &VantageConfig {
        &self.config
    }

    /// Kinds `actor` may place, after permissions and entitlements
    #[must_use]
    pub fn visible_kinds(&self, actor: &Actor) -> Vec<&WidgetKind> {
        visible_kinds_with(&self.catalog, actor, self.entitlements.as_ref())
    }

    /// Ephemeral default dashboard for `actor`
    #[must_use]
    pub fn generate_default(&self, actor: &Actor) -> Dashboard {
        DefaultLayoutGenerator::new(&self.catalog, &self.templates, self.entitlements.as_ref())
            .generate(actor)
    }

    fn engine(&self) -> LayoutEngine<'_> {
        LayoutEngine::new(&self.catalog, self.config.grid.columns)
    }
}

/// One actor's dashboard, edit buffer and widget data
#[derive(Debug)]
pub struct DashboardSession {
    services: DashboardServices,
    actor: Actor,
    runtime: WidgetRuntime,
    mode: SessionMode,
    current: Dashboard,
    edit: Option<EditSession>,
}

impl DashboardSession {
    /// Load `actor`'s first saved dashboard, or generate a default
    ///
    /// Widget loads start immediately. Auto-refresh starts when configured.
    ///
    /// # Errors
    /// `DashboardError::LoadError` if the gateway cannot list dashboards or a
    /// stored dashboard repeats an instance id.
    pub async fn open(services: DashboardServices, actor: Actor) -> Result<Self, DashboardError> {
        let saved = load_dashboards(&services, &actor).await?;
        let current = match saved.into_iter().next() {
            Some(dashboard) => dashboard,
            None => services.generate_default(&actor),
        };
        if let Err(err) = services.engine().validate(&current) {
            tracing::warn!(dashboard_id = %current.dashboard_id, error = %err, "loaded dashboard violates layout rules");
        }

        let runtime = WidgetRuntime::new(
            Arc::clone(&services.catalog),
            services.providers.clone(),
            services.config.runtime,
        );
        runtime.sync(&current);
        if let Some(period) = services.config.runtime.auto_refresh() {
            runtime.spawn_auto_refresh(period);
        }

        tracing::info!(
            actor_id = %actor.actor_id,
            organization_id = %actor.organization_id,
            dashboard_id = %current.dashboard_id,
            widgets = current.len(),
            is_default = current.is_default,
            "dashboard session opened"
        );

        Ok(Self {
            services,
            actor,
            runtime,
            mode: SessionMode::Viewing,
            current,
            edit: None,
        })
    }

    /// Acting identity
    #[inline]
    #[must_use]
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Current mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Check if an edit session is active
    #[inline]
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    /// What is displayed: the working copy while editing, else the committed dashboard
    #[must_use]
    pub fn dashboard(&self) -> &Dashboard {
        self.edit.as_ref().map_or(&self.current, EditSession::working)
    }

    /// Active edit buffer
    #[inline]
    #[must_use]
    pub fn edit_session(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    /// Widget data runtime
    #[inline]
    #[must_use]
    pub fn runtime(&self) -> &WidgetRuntime {
        &self.runtime
    }

    /// Runtime state of one widget
    #[must_use]
    pub fn widget_state(&self, instance_id: &InstanceId) -> Option<WidgetRuntimeState> {
        self.runtime.state(instance_id)
    }

    /// Kinds the actor may add, for a widget picker
    #[must_use]
    pub fn visible_kinds(&self) -> Vec<&WidgetKind> {
        self.services.visible_kinds(&self.actor)
    }

    /// Enter edit mode and pause automatic loads
    ///
    /// # Errors
    /// `DashboardError::IllegalTransition` unless viewing.
    pub fn start_editing(&mut self) -> Result<(), DashboardError> {
        self.transition(SessionMode::Editing)?;
        self.edit = Some(EditSession::begin(self.current.clone()));
        self.runtime.pause();
        tracing::info!(dashboard_id = %self.current.dashboard_id, "editing started");
        Ok(())
    }

    /// Add a widget of `kind_id`, below everything when `position` is `None`
    ///
    /// # Errors
    /// - `NotEditing` outside an edit session
    /// - `UnknownWidgetKind` if the kind is not in the catalog
    /// - `WidgetNotPermitted` if the actor may not see the kind
    /// - `InvalidGeometry` if the placement leaves the grid
    pub fn add_widget(
        &mut self,
        kind_id: &str,
        position: Option<GridPosition>,
    ) -> Result<InstanceId, DashboardError> {
        let working = self.working()?;
        let kind = self
            .services
            .catalog
            .get(kind_id)
            .ok_or_else(|| DashboardError::UnknownWidgetKind(KindId::from(kind_id)))?;
        if !is_visible(kind, &self.actor) || !self.services.entitlements.allows(&self.actor, kind) {
            return Err(DashboardError::WidgetNotPermitted(kind.kind_id.clone()));
        }
        let placement = self.services.engine().add_widget(working, kind_id, position)?;
        tracing::debug!(kind_id, instance_id = %placement.instance_id, "widget added");
        self.replace_working(placement.dashboard);
        Ok(placement.instance_id)
    }

    /// Remove a widget; absent ids are a no-op
    ///
    /// Any in-flight load for the instance is cancelled.
    ///
    /// # Errors
    /// `NotEditing` outside an edit session.
    pub fn remove_widget(&mut self, instance_id: &InstanceId) -> Result<(), DashboardError> {
        let next = self.services.engine().remove_widget(self.working()?, instance_id);
        self.replace_working(next);
        Ok(())
    }

    /// Move and resize widgets; unknown ids are ignored
    ///
    /// # Errors
    /// - `NotEditing` outside an edit session
    /// - `InvalidGeometry` if any entry is invalid; nothing is applied
    pub fn apply_layout(
        &mut self,
        geometries: &BTreeMap<InstanceId, LayoutGeometry>,
    ) -> Result<(), DashboardError> {
        let next = self
            .services
            .engine()
            .apply_layout(self.working()?, geometries)?;
        self.replace_working(next);
        Ok(())
    }

    /// Shallow-merge `partial` into a widget's config
    ///
    /// # Errors
    /// - `NotEditing` outside an edit session
    /// - `UnknownWidgetInstance` if the widget is absent
    pub fn update_widget_config(
        &mut self,
        instance_id: &InstanceId,
        partial: &WidgetConfig,
    ) -> Result<(), DashboardError> {
        let next = self
            .services
            .engine()
            .update_widget_config(self.working()?, instance_id, partial)?;
        self.replace_working(next);
        Ok(())
    }

    /// Change name and, when given, description
    ///
    /// # Errors
    /// `NotEditing` outside an edit session.
    pub fn rename(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
    ) -> Result<(), DashboardError> {
        let mut next = self.working()?.clone();
        next.name = name.into();
        if let Some(description) = description {
            next.description = description;
        }
        self.replace_working(next);
        Ok(())
    }

    /// Persist the working copy and return to viewing
    ///
    /// A generated default is created; a saved dashboard is updated against
    /// its version. On failure the session stays in edit mode with the
    /// working copy intact, so calling `save` again retries.
    ///
    /// # Errors
    /// - `NotEditing` outside an edit session
    /// - `SaveError` if the gateway rejects the write
    pub async fn save(&mut self) -> Result<&Dashboard, DashboardError> {
        let working = match &self.edit {
            Some(edit) => edit.working.clone(),
            None => return Err(DashboardError::NotEditing),
        };
        if self.mode == SessionMode::Saving {
            // An earlier save future was dropped before it settled
            self.mode = SessionMode::Editing;
        }
        self.transition(SessionMode::Saving)?;

        let gateway = Arc::clone(&self.services.gateway);
        let result = if working.is_default || working.dashboard_id.is_default() {
            gateway.create_dashboard(working).await
        } else {
            let dashboard_id = working.dashboard_id.clone();
            gateway.update_dashboard(&dashboard_id, working).await
        };

        match result {
            Ok(saved) => {
                self.transition(SessionMode::Viewing)?;
                self.edit = None;
                self.current = saved;
                self.runtime.sync(&self.current);
                self.runtime.resume();
                tracing::info!(
                    dashboard_id = %self.current.dashboard_id,
                    version = self.current.version,
                    widgets = self.current.len(),
                    "dashboard saved"
                );
                Ok(&self.current)
            }
            Err(err) => {
                self.transition(SessionMode::Editing)?;
                tracing::warn!(error = %err, retryable = err.is_retryable(), "dashboard save failed");
                Err(DashboardError::SaveError(err))
            }
        }
    }

    /// Discard the working copy and return to viewing
    ///
    /// Widgets removed during the edit come back and reload. A no-op when
    /// not editing.
    pub fn cancel(&mut self) {
        let Some(edit) = self.edit.take() else {
            return;
        };
        let discarded = edit.is_dirty();
        self.mode = SessionMode::Viewing;
        self.current = edit.base_snapshot;
        self.runtime.sync(&self.current);
        self.runtime.resume();
        tracing::info!(dashboard_id = %self.current.dashboard_id, discarded, "editing cancelled");
    }

    /// The actor's saved dashboards
    ///
    /// # Errors
    /// `LoadError` if the gateway cannot list dashboards or one of them
    /// repeats an instance id.
    pub async fn dashboards(&self) -> Result<Vec<Dashboard>, DashboardError> {
        load_dashboards(&self.services, &self.actor).await
    }

    /// Make another saved dashboard current
    ///
    /// Switching to the default id regenerates the default.
    ///
    /// # Errors
    /// - `EditInProgress` while editing
    /// - `LoadError` if listing fails or the dashboard is not the actor's
    pub async fn switch_to(&mut self, dashboard_id: &DashboardId) -> Result<(), DashboardError> {
        self.ensure_viewing()?;
        let next = if dashboard_id.is_default() {
            self.services.generate_default(&self.actor)
        } else {
            self.dashboards()
                .await?
                .into_iter()
                .find(|d| &d.dashboard_id == dashboard_id)
                .ok_or_else(|| {
                    DashboardError::LoadError(GatewayError::NotFound(dashboard_id.clone()))
                })?
        };
        self.show(next);
        Ok(())
    }

    /// Delete a saved dashboard
    ///
    /// Deleting the current dashboard falls back to the next saved one, or
    /// a regenerated default. Deleting the default regenerates it.
    ///
    /// # Errors
    /// - `EditInProgress` while editing
    /// - `LoadError(NotFound)` if the dashboard is not one of the actor's
    /// - `SaveError` if the gateway rejects the delete
    /// - `LoadError` if listing fails
    pub async fn delete(&mut self, dashboard_id: &DashboardId) -> Result<(), DashboardError> {
        self.ensure_viewing()?;
        if dashboard_id.is_default() {
            if self.current.dashboard_id.is_default() {
                let regenerated = self.services.generate_default(&self.actor);
                self.show(regenerated);
            }
            return Ok(());
        }

        let owned = self.dashboards().await?;
        if !owned.iter().any(|d| &d.dashboard_id == dashboard_id) {
            tracing::warn!(
                actor_id = %self.actor.actor_id,
                dashboard_id = %dashboard_id,
                "delete refused for dashboard outside actor scope"
            );
            return Err(DashboardError::LoadError(GatewayError::NotFound(
                dashboard_id.clone(),
            )));
        }

        self.services
            .gateway
            .delete_dashboard(dashboard_id)
            .await
            .map_err(DashboardError::SaveError)?;
        tracing::info!(dashboard_id = %dashboard_id, "dashboard deleted");

        if &self.current.dashboard_id == dashboard_id {
            let fallback = match self.dashboards().await?.into_iter().next() {
                Some(dashboard) => dashboard,
                None => self.services.generate_default(&self.actor),
            };
            self.show(fallback);
        }
        Ok(())
    }

    /// Reload one widget now, even while editing
    pub async fn refresh(&self, instance_id: &InstanceId) -> Option<LoadOutcome> {
        self.runtime.refresh(instance_id).await
    }

    /// Reload every widget now, even while editing
    pub async fn refresh_all(&self) -> RefreshReport {
        self.runtime.refresh_all().await
    }

    fn transition(&mut self, to: SessionMode) -> Result<(), DashboardError> {
        validate_transition(self.mode, to)?;
        tracing::trace!(from = ?self.mode, to = ?to, "session transition");
        self.mode = to;
        Ok(())
    }

    fn working(&self) -> Result<&Dashboard, DashboardError> {
        match (&self.edit, self.mode) {
            (Some(edit), SessionMode::Editing) => Ok(&edit.working),
            _ => Err(DashboardError::NotEditing),
        }
    }

    fn replace_working(&mut self, next: Dashboard) {
        if let Some(edit) = self.edit.as_mut() {
            edit.working = next;
            self.runtime.sync(&edit.working);
        }
    }

    fn ensure_viewing(&self) -> Result<(), DashboardError> {
        if self.mode == SessionMode::Viewing {
            Ok(())
        } else {
            Err(DashboardError::EditInProgress)
        }
    }

    fn show(&mut self, dashboard: Dashboard) {
        tracing::debug!(dashboard_id = %dashboard.dashboard_id, widgets = dashboard.len(), "dashboard shown");
        self.current = dashboard;
        self.runtime.sync(&self.current);
    }
}

/// List `actor`'s dashboards, rejecting any that repeat an instance id
async fn load_dashboards(
    services: &DashboardServices,
    actor: &Actor,
) -> Result<Vec<Dashboard>, DashboardError> {
    let dashboards = services
        .gateway
        .list_dashboards(actor)
        .await
        .map_err(DashboardError::LoadError)?;
    for dashboard in &dashboards {
        dashboard.check_integrity().map_err(|err| {
            DashboardError::LoadError(GatewayError::Storage(format!(
                "dashboard {}: {err}",
                dashboard.dashboard_id
            )))
        })?;
    }
    Ok(dashboards)
}
