//! Layout engine
//!
//! Validates and applies structural edits to a dashboard draft. Every
//! operation takes the draft by reference and returns a new dashboard, so a
//! rejected edit leaves the caller's draft untouched.
//!
//! The engine is a validator/applier, not a solver: overlapping placements
//! supplied by the caller are accepted as-is.

use crate::error::LayoutError;
use std::collections::BTreeMap;
use vantage_catalog::WidgetCatalog;
use vantage_model::{
    merge_config, Dashboard, GridPosition, InstanceId, LayoutGeometry,
    WidgetConfig, WidgetInstance, DEFAULT_GRID_COLUMNS,
};

/// Geometry validator and applier over one catalog and grid width
#[derive(Debug, Clone, Copy)]
pub struct LayoutEngine<'a> {
    catalog: &'a WidgetCatalog,
    columns: u32,
}

/// Result of [`LayoutEngine::add_widget`]
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Draft with the new widget appended
    pub dashboard: Dashboard,
    /// Id of the new widget
    pub instance_id: InstanceId,
}

impl<'a> LayoutEngine<'a> {
    /// Create engine over a grid `columns` wide
    #[inline]
    #[must_use]
    pub fn new(catalog: &'a WidgetCatalog, columns: u32) -> Self {
        Self { catalog, columns }
    }

    /// Create engine over the canonical 12-column grid
    #[inline]
    #[must_use]
    pub fn with_default_grid(catalog: &'a WidgetCatalog) -> Self {
        Self::new(catalog, DEFAULT_GRID_COLUMNS)
    }

    /// Grid width
    #[inline]
    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Apply new geometries to existing instances
    ///
    /// Entries naming an instance the draft does not contain are ignored.
    /// All remaining entries are validated before any is applied.
    ///
    /// # Errors
    /// `LayoutError::InvalidGeometry` for the first invalid entry; nothing is applied.
    pub fn apply_layout(
        &self,
        draft: &Dashboard,
        geometries: &BTreeMap<InstanceId, LayoutGeometry>,
    ) -> Result<Dashboard, LayoutError> {
        let relevant: Vec<_> = geometries
            .iter()
            .filter(|(id, _)| draft.contains(id))
            .collect();

        for &(id, geometry) in &relevant {
            self.check(Some(id), geometry)?;
        }

        let mut next = draft.clone();
        for (id, geometry) in relevant {
            if let Some(widget) = next.widget_mut(id) {
                widget.geometry = *geometry;
            }
        }
        Ok(next)
    }

    /// Place a new instance of `kind_id`
    ///
    /// Size comes from the kind's default geometry. Without a position the
    /// widget goes to column 0 below the lowest occupied row.
    ///
    /// # Errors
    /// - `LayoutError::UnknownWidgetKind` if the kind is not in the catalog
    /// - `LayoutError::InvalidGeometry` if the placement leaves the grid
    pub fn add_widget(
        &self,
        draft: &Dashboard,
        kind_id: &str,
        position: Option<GridPosition>,
    ) -> Result<Placement, LayoutError> {
        let kind = self
            .catalog
            .get(kind_id)
            .ok_or_else(|| LayoutError::UnknownWidgetKind(kind_id.into()))?;

        let position = match position {
            Some(position) => position,
            None => GridPosition::new(0, Self::next_free_row(draft)),
        };
        let geometry = LayoutGeometry::at(position, kind.default_geometry);
        self.check(None, &geometry)?;

        let instance_id = fresh_instance_id(draft);
        let widget = WidgetInstance::new(
            instance_id.clone(),
            kind.kind_id.clone(),
            kind.default_config.clone(),
            geometry,
        );

        let mut next = draft.clone();
        // Fresh id cannot collide
        let _ = next.push_widget(widget);
        Ok(Placement {
            dashboard: next,
            instance_id,
        })
    }

    /// Remove an instance; absent ids are a no-op
    #[must_use]
    pub fn remove_widget(&self, draft: &Dashboard, instance_id: &InstanceId) -> Dashboard {
        let mut next = draft.clone();
        next.remove_widget(instance_id);
        next
    }

    /// Shallow-merge `partial` into an instance's config
    ///
    /// # Errors
    /// `LayoutError::UnknownWidgetInstance` if the instance is absent.
    pub fn update_widget_config(
        &self,
        draft: &Dashboard,
        instance_id: &InstanceId,
        partial: &WidgetConfig,
    ) -> Result<Dashboard, LayoutError> {
        let mut next = draft.clone();
        let widget = next
            .widget_mut(instance_id)
            .ok_or_else(|| LayoutError::UnknownWidgetInstance(instance_id.clone()))?;
        merge_config(&mut widget.config, partial);
        Ok(next)
    }

    /// Check a whole dashboard: known kinds and valid geometry
    ///
    /// # Errors
    /// The first violation found, in widget order.
    pub fn validate(&self, dashboard: &Dashboard) -> Result<(), LayoutError> {
        for widget in dashboard.widgets() {
            if !self.catalog.contains(widget.kind_id.as_str()) {
                return Err(LayoutError::UnknownWidgetKind(widget.kind_id.clone()));
            }
            self.check(Some(&widget.instance_id), &widget.geometry)?;
        }
        Ok(())
    }

    fn check(
        &self,
        instance_id: Option<&InstanceId>,
        geometry: &LayoutGeometry,
    ) -> Result<(), LayoutError> {
        geometry
            .validate(self.columns)
            .map_err(|violation| LayoutError::invalid_geometry(instance_id.cloned(), *geometry, violation))
    }

    /// Row just below the lowest widget, clamped to the grid's last row
    fn next_free_row(draft: &Dashboard) -> i32 {
        i32::try_from(draft.lowest_edge()).unwrap_or(i32::MAX)
    }
}

fn fresh_instance_id(draft: &Dashboard) -> InstanceId {
    loop {
        let id = InstanceId::generate();
        if !draft.contains(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;
    use vantage_model::{DashboardId, GeometryViolation, KindId};

    fn draft_with(widgets: &[(&str, &str, LayoutGeometry)]) -> Dashboard {
        let mut dash = Dashboard::new(DashboardId::from("d1"), "Draft");
        for (id, kind, geometry) in widgets {
            dash.push_widget(WidgetInstance::new(
                InstanceId::from(*id),
                KindId::from(*kind),
                WidgetConfig::new(),
                *geometry,
            ))
            .unwrap();
        }
        dash
    }

    fn two_widget_draft() -> Dashboard {
        draft_with(&[
            ("a", "churn_summary", LayoutGeometry::new(0, 0, 4, 3)),
            ("b", "nps_score", LayoutGeometry::new(4, 0, 3, 3)),
        ])
    }

    #[test]
    fn add_widget_at_explicit_position() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = Dashboard::new(DashboardId::from("d1"), "Draft");

        let placed = engine
            .add_widget(&draft, "customer_list", Some(GridPosition::new(0, 10)))
            .unwrap();

        let widget = placed.dashboard.widget(&placed.instance_id).unwrap();
        assert_eq!(widget.geometry, LayoutGeometry::new(0, 10, 12, 6));
        assert_eq!(widget.config["page_size"], json!(25));
        assert_eq!(widget.kind_id.as_str(), "customer_list");
    }

    #[test]
    fn add_widget_defaults_below_lowest_row() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = draft_with(&[
            ("a", "churn_summary", LayoutGeometry::new(0, 0, 4, 3)),
            ("b", "alerts_feed", LayoutGeometry::new(4, 2, 4, 6)),
        ]);

        let placed = engine.add_widget(&draft, "nps_score", None).unwrap();
        let widget = placed.dashboard.widget(&placed.instance_id).unwrap();
        assert_eq!(widget.geometry, LayoutGeometry::new(0, 8, 3, 3));
    }

    #[test]
    fn add_widget_below_last_row_reports_row_overflow() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);

        for bottom_widget in [
            LayoutGeometry::new(0, i32::MAX - 1, 4, 1),
            LayoutGeometry::new(0, i32::MAX, 4, 5),
        ] {
            let draft = draft_with(&[("a", "churn_summary", bottom_widget)]);
            let err = engine.add_widget(&draft, "nps_score", None).unwrap_err();
            assert_eq!(
                err,
                LayoutError::invalid_geometry(
                    None,
                    LayoutGeometry::new(0, i32::MAX, 3, 3),
                    GeometryViolation::RowOverflow {
                        bottom_edge: i64::from(i32::MAX) + 3
                    },
                )
            );
        }
    }

    #[test]
    fn add_widget_on_empty_dashboard_starts_at_origin() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = Dashboard::new(DashboardId::from("d1"), "Draft");

        let placed = engine.add_widget(&draft, "nps_score", None).unwrap();
        assert_eq!(
            placed.dashboard.widgets()[0].geometry,
            LayoutGeometry::new(0, 0, 3, 3)
        );
    }

    #[test]
    fn add_unknown_kind_is_rejected() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = two_widget_draft();

        let err = engine.add_widget(&draft, "pie_of_doom", None).unwrap_err();
        assert_eq!(err, LayoutError::UnknownWidgetKind(KindId::from("pie_of_doom")));
    }

    #[test]
    fn add_outside_grid_is_rejected() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = two_widget_draft();

        let err = engine
            .add_widget(&draft, "churn_trend", Some(GridPosition::new(6, 0)))
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidGeometry { instance_id: None, .. }));
    }

    #[test]
    fn remove_absent_is_noop() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = two_widget_draft();

        let next = engine.remove_widget(&draft, &InstanceId::from("zzz"));
        assert_eq!(next, draft);
    }

    #[test]
    fn apply_layout_moves_and_ignores_unknown() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = two_widget_draft();

        let mut moves = BTreeMap::new();
        moves.insert(InstanceId::from("a"), LayoutGeometry::new(0, 5, 6, 3));
        moves.insert(InstanceId::from("ghost"), LayoutGeometry::new(0, 0, 1, 1));

        let next = engine.apply_layout(&draft, &moves).unwrap();
        assert_eq!(next.widget(&InstanceId::from("a")).unwrap().geometry, LayoutGeometry::new(0, 5, 6, 3));
        assert_eq!(next.widget(&InstanceId::from("b")).unwrap().geometry, LayoutGeometry::new(4, 0, 3, 3));
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn apply_layout_rejects_overflow_without_partial_apply() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = two_widget_draft();

        let mut moves = BTreeMap::new();
        moves.insert(InstanceId::from("a"), LayoutGeometry::new(0, 5, 6, 3));
        moves.insert(InstanceId::from("b"), LayoutGeometry::new(10, 0, 3, 3));

        let err = engine.apply_layout(&draft, &moves).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::InvalidGeometry {
                violation: GeometryViolation::ExceedsColumns { right_edge: 13, columns: 12 },
                ..
            }
        ));
        assert_eq!(draft, two_widget_draft());
    }

    #[test]
    fn update_config_merges_shallowly() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = two_widget_draft();

        let mut partial = WidgetConfig::new();
        partial.insert("period".into(), json!("7d"));
        let next = engine
            .update_widget_config(&draft, &InstanceId::from("a"), &partial)
            .unwrap();
        assert_eq!(next.widget(&InstanceId::from("a")).unwrap().config["period"], json!("7d"));

        let err = engine
            .update_widget_config(&draft, &InstanceId::from("nope"), &partial)
            .unwrap_err();
        assert_eq!(err, LayoutError::UnknownWidgetInstance(InstanceId::from("nope")));
    }

    #[test]
    fn validate_flags_unknown_kinds() {
        let catalog = WidgetCatalog::builtin();
        let engine = LayoutEngine::with_default_grid(&catalog);
        let draft = draft_with(&[("a", "retired_widget", LayoutGeometry::new(0, 0, 1, 1))]);
        assert!(matches!(engine.validate(&draft), Err(LayoutError::UnknownWidgetKind(_))));
        assert!(engine.validate(&two_widget_draft()).is_ok());
    }

    fn arb_geometry() -> impl Strategy<Value = LayoutGeometry> {
        (-2i32..14, -2i32..20, -1i32..14, -1i32..8).prop_map(|(x, y, w, h)| LayoutGeometry::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn apply_layout_is_all_or_nothing(
            ga in arb_geometry(),
            gb in arb_geometry(),
        ) {
            let catalog = WidgetCatalog::builtin();
            let engine = LayoutEngine::with_default_grid(&catalog);
            let draft = two_widget_draft();

            let mut moves = BTreeMap::new();
            moves.insert(InstanceId::from("a"), ga);
            moves.insert(InstanceId::from("b"), gb);

            let all_valid = ga.validate(12).is_ok() && gb.validate(12).is_ok();
            match engine.apply_layout(&draft, &moves) {
                Ok(next) => {
                    prop_assert!(all_valid);
                    prop_assert_eq!(next.layout(), moves);
                }
                Err(_) => prop_assert!(!all_valid),
            }
            prop_assert_eq!(draft, two_widget_draft());
        }

        #[test]
        fn add_then_remove_round_trips(
            kind_idx in 0usize..11,
            x in 0i32..4,
            y in 0i32..30,
        ) {
            let catalog = WidgetCatalog::builtin();
            let engine = LayoutEngine::with_default_grid(&catalog);
            let draft = two_widget_draft();
            let kind = catalog.list_all()[kind_idx % catalog.len()].kind_id.clone();

            if let Ok(placed) = engine.add_widget(&draft, kind.as_str(), Some(GridPosition::new(x, y))) {
                prop_assert_eq!(placed.dashboard.len(), draft.len() + 1);
                let restored = engine.remove_widget(&placed.dashboard, &placed.instance_id);
                prop_assert_eq!(restored, draft);
            }
        }
    }
}
