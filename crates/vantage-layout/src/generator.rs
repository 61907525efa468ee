//! Default layout generation
//!
//! Builds the starter dashboard for an actor without a saved one: the role's
//! template filtered to kinds the actor can see. Filtered-out slots leave
//! their gap; surviving slots keep their template geometry.

use crate::template::TemplateRegistry;
use vantage_catalog::{visible_kind_ids, EntitlementProvider, WidgetCatalog};
use vantage_model::{Actor, Dashboard, DashboardId, InstanceId, WidgetInstance};

/// Generates ephemeral default dashboards
#[derive(Debug, Clone, Copy)]
pub struct DefaultLayoutGenerator<'a> {
    catalog: &'a WidgetCatalog,
    templates: &'a TemplateRegistry,
    entitlements: &'a dyn EntitlementProvider,
}

impl<'a> DefaultLayoutGenerator<'a> {
    /// Create generator
    #[inline]
    #[must_use]
    pub fn new(
        catalog: &'a WidgetCatalog,
        templates: &'a TemplateRegistry,
        entitlements: &'a dyn EntitlementProvider,
    ) -> Self {
        Self {
            catalog,
            templates,
            entitlements,
        }
    }

    /// Build the default dashboard for `actor`
    ///
    /// The result has id `"default"`, `is_default = true` and is not persisted.
    /// Instance ids are `<kind_id>-<slot>` so regenerating is stable.
    #[must_use]
    pub fn generate(&self, actor: &Actor) -> Dashboard {
        let visible = visible_kind_ids(self.catalog, actor, self.entitlements);

        let Some(template) = self.templates.resolve(&actor.role) else {
            tracing::warn!(role = %actor.role, "no template for role and no viewer fallback");
            return stamp(Dashboard::new(DashboardId::default_id(), "Dashboard"), actor);
        };

        let mut dashboard = Dashboard::new(DashboardId::default_id(), template.name.clone())
            .with_description(template.description.clone());

        let mut hidden = 0usize;
        for (slot, entry) in template.entries.iter().enumerate() {
            let kind = match self.catalog.get(entry.kind_id.as_str()) {
                Some(kind) if visible.contains(&kind.kind_id) => kind,
                _ => {
                    hidden += 1;
                    continue;
                }
            };
            let instance_id = InstanceId::new(format!("{}-{slot}", entry.kind_id));
            // Slot numbers make ids unique within the template
            let _ = dashboard.push_widget(WidgetInstance::new(
                instance_id,
                kind.kind_id.clone(),
                kind.default_config.clone(),
                entry.geometry,
            ));
        }

        tracing::debug!(
            role = %actor.role,
            template = %template.role,
            placed = dashboard.len(),
            hidden,
            "generated default dashboard"
        );
        stamp(dashboard, actor)
    }
}

fn stamp(dashboard: Dashboard, actor: &Actor) -> Dashboard {
    let mut dashboard = dashboard.owned_by(actor.organization_id.clone(), actor.actor_id.clone());
    dashboard.is_default = true;
    dashboard
}
