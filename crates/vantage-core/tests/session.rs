//! Edit-session behaviour against real gateways

use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use vantage_core::{
    DashboardError, DashboardServices, DashboardSession, GatewayError, JsonFileGateway,
    LoadStatus, MemoryGateway, PersistenceGateway, ProviderRegistry, SessionMode, VantageConfig,
};
use vantage_model::{
    Dashboard, DashboardId, GridPosition, InstanceId, LayoutGeometry, WidgetConfig, WidgetInstance,
};
use vantage_test_utils::{
    analyst, manager, memory_services, services, viewer, CountingProvider, ToggleGateway,
};

fn ids(dashboard: &Dashboard) -> Vec<String> {
    dashboard.instance_ids().map(ToString::to_string).collect()
}

#[tokio::test]
async fn opens_generated_default_without_saved_dashboards() {
    let (services, gateway, _) = memory_services();
    let session = DashboardSession::open(services, analyst("u1")).await.unwrap();

    assert_eq!(session.mode(), SessionMode::Viewing);
    assert!(session.dashboard().is_default);
    assert!(session.dashboard().dashboard_id.is_default());
    assert_eq!(session.dashboard().name, "Churn Analysis");
    assert!(gateway.is_empty(), "defaults are not persisted on open");
    assert_eq!(session.runtime().len(), session.dashboard().len());
}

#[tokio::test]
async fn mutations_outside_editing_are_rejected() {
    let (services, _, _) = memory_services();
    let mut session = DashboardSession::open(services, analyst("u1")).await.unwrap();
    let before = session.dashboard().clone();
    let some_id = before.widgets()[0].instance_id.clone();

    assert_eq!(
        session.add_widget("nps_score", None).unwrap_err(),
        DashboardError::NotEditing
    );
    assert_eq!(
        session.remove_widget(&some_id).unwrap_err(),
        DashboardError::NotEditing
    );
    assert_eq!(
        session.apply_layout(&BTreeMap::new()).unwrap_err(),
        DashboardError::NotEditing
    );
    assert_eq!(
        session
            .update_widget_config(&some_id, &serde_json::Map::new())
            .unwrap_err(),
        DashboardError::NotEditing
    );
    assert_eq!(
        session.rename("x", None).unwrap_err(),
        DashboardError::NotEditing
    );
    assert!(matches!(
        session.save().await.unwrap_err(),
        DashboardError::NotEditing
    ));
    assert_eq!(session.dashboard(), &before);
}

#[tokio::test]
async fn cancel_restores_removed_widget() {
    let (services, _, _) = memory_services();
    let mut session = DashboardSession::open(services, analyst("u1")).await.unwrap();
    let before = session.dashboard().clone();
    let target = InstanceId::from("churn_summary-0");

    session.start_editing().unwrap();
    assert!(session.runtime().is_paused());
    session.remove_widget(&target).unwrap();
    assert!(!session.dashboard().contains(&target));
    assert!(session.widget_state(&target).is_none(), "removal unmounts the widget");

    session.cancel();
    assert_eq!(session.mode(), SessionMode::Viewing);
    assert!(!session.runtime().is_paused());
    assert_eq!(session.dashboard(), &before);
    assert!(session.widget_state(&target).is_some(), "restored widget is mounted again");
}

#[tokio::test]
async fn start_editing_twice_is_illegal() {
    let (services, _, _) = memory_services();
    let mut session = DashboardSession::open(services, viewer("u1")).await.unwrap();
    session.start_editing().unwrap();
    assert_eq!(
        session.start_editing().unwrap_err(),
        DashboardError::IllegalTransition {
            from: SessionMode::Editing,
            to: SessionMode::Editing
        }
    );
}

#[tokio::test]
async fn saving_default_creates_then_updates() {
    let (services, gateway, _) = memory_services();
    let mut session = DashboardSession::open(services, analyst("u1")).await.unwrap();

    session.start_editing().unwrap();
    let added = session
        .add_widget("customer_list", Some(GridPosition::new(0, 20)))
        .err();
    // analyst lacks customer.read
    assert_eq!(
        added,
        Some(DashboardError::WidgetNotPermitted("customer_list".into()))
    );
    let added = session.add_widget("engagement_heatmap", None).unwrap();
    session
        .rename("My churn board", Some("pinned".into()))
        .unwrap();

    let saved = session.save().await.unwrap().clone();
    assert_eq!(session.mode(), SessionMode::Viewing);
    assert!(!saved.is_default);
    assert!(!saved.dashboard_id.is_default());
    assert_eq!(saved.version, 1);
    assert_eq!(saved.name, "My churn board");
    assert_eq!(saved.description, "pinned");
    assert!(saved.contains(&added));
    assert_eq!(gateway.len(), 1);

    session.start_editing().unwrap();
    session.remove_widget(&added).unwrap();
    let updated = session.save().await.unwrap().clone();
    assert_eq!(updated.dashboard_id, saved.dashboard_id);
    assert_eq!(updated.version, 2);
    assert!(!updated.contains(&added));
    assert_eq!(gateway.len(), 1);
}

#[tokio::test]
async fn save_failure_keeps_edit_session() {
    let gateway = Arc::new(ToggleGateway::new());
    let provider = Arc::new(CountingProvider::new());
    let mut session = DashboardSession::open(services(gateway.clone(), provider), analyst("u1"))
        .await
        .unwrap();

    session.start_editing().unwrap();
    let added = session.add_widget("nps_score", None).unwrap();
    let working = session.dashboard().clone();

    gateway.set_failing(true);
    let err = session.save().await.unwrap_err();
    assert!(matches!(err, DashboardError::SaveError(GatewayError::Unavailable(_))));
    assert!(err.is_retryable());
    assert_eq!(session.mode(), SessionMode::Editing);
    assert_eq!(session.dashboard(), &working);
    assert!(session.runtime().is_paused());

    gateway.set_failing(false);
    let saved = session.save().await.unwrap();
    assert!(saved.contains(&added));
    assert_eq!(gateway.writes(), 1);
}

#[tokio::test]
async fn concurrent_writer_conflicts() {
    let gateway = Arc::new(MemoryGateway::new());
    let svc = DashboardServices::new(
        gateway.clone(),
        ProviderRegistry::with_fallback(Arc::new(CountingProvider::new())),
    );

    let mut first = DashboardSession::open(svc.clone(), analyst("u1")).await.unwrap();
    first.start_editing().unwrap();
    first.save().await.unwrap();

    // Both sessions now hold version 1
    let mut second = DashboardSession::open(svc, analyst("u1")).await.unwrap();
    first.start_editing().unwrap();
    first.rename("first", None).unwrap();
    first.save().await.unwrap();

    second.start_editing().unwrap();
    second.rename("second", None).unwrap();
    let err = second.save().await.unwrap_err();
    assert_eq!(
        err,
        DashboardError::SaveError(GatewayError::Conflict {
            expected: 1,
            actual: 2
        })
    );
    assert_eq!(second.mode(), SessionMode::Editing);
}

#[tokio::test]
async fn invalid_layout_leaves_working_copy_untouched() {
    let (services, _, _) = memory_services();
    let mut session = DashboardSession::open(services, analyst("u1")).await.unwrap();
    session.start_editing().unwrap();
    let before = session.dashboard().clone();

    let mut geometries = BTreeMap::new();
    geometries.insert(InstanceId::from("nps_score-1"), LayoutGeometry::new(0, 0, 3, 3));
    geometries.insert(InstanceId::from("churn_summary-0"), LayoutGeometry::new(10, 0, 4, 3));
    let err = session.apply_layout(&geometries).unwrap_err();
    assert!(matches!(err, DashboardError::InvalidGeometry { .. }));
    assert!(err.is_local_rejection());
    assert_eq!(session.dashboard(), &before);

    geometries.remove(&InstanceId::from("churn_summary-0"));
    geometries.insert(InstanceId::from("not-there"), LayoutGeometry::new(0, 0, 1, 1));
    session.apply_layout(&geometries).unwrap();
    assert_eq!(
        session
            .dashboard()
            .widget(&"nps_score-1".into())
            .unwrap()
            .geometry,
        LayoutGeometry::new(0, 0, 3, 3)
    );
}

#[tokio::test]
async fn config_change_reloads_after_save() {
    let (services, _, provider) = memory_services();
    let mut session = DashboardSession::open(services, analyst("u1")).await.unwrap();
    let target = InstanceId::from("churn_trend-3");
    session.refresh_all().await;
    let calls_before = provider.calls();

    session.start_editing().unwrap();
    let mut partial = serde_json::Map::new();
    partial.insert("period".into(), json!("30d"));
    session.update_widget_config(&target, &partial).unwrap();
    assert!(session.runtime().is_pending(&target));
    assert_eq!(provider.calls(), calls_before, "no loads while editing");

    session.save().await.unwrap();
    assert!(!session.runtime().is_pending(&target));
    assert_eq!(
        session.widget_state(&target).unwrap().status,
        LoadStatus::Loading
    );
    assert_eq!(
        session.dashboard().widget(&target).unwrap().config["period"],
        json!("30d")
    );
}

#[tokio::test]
async fn open_prefers_saved_dashboard() {
    let saved = Dashboard::new(DashboardId::from("d1"), "Saved").owned_by("acme", "u1");
    let other = Dashboard::new(DashboardId::from("d2"), "Theirs").owned_by("acme", "u2");
    let gateway = Arc::new(MemoryGateway::with_dashboards([saved, other]));
    let session = DashboardSession::open(
        services(gateway, Arc::new(CountingProvider::new())),
        manager("u1"),
    )
    .await
    .unwrap();

    assert_eq!(session.dashboard().dashboard_id.as_str(), "d1");
    assert!(!session.dashboard().is_default);
}

#[tokio::test]
async fn open_surfaces_load_error() {
    let gateway = Arc::new(ToggleGateway::new());
    gateway.set_failing(true);
    let err = DashboardSession::open(
        services(gateway, Arc::new(CountingProvider::new())),
        viewer("u1"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DashboardError::LoadError(_)));
}

#[tokio::test]
async fn switch_and_delete() {
    let (services, gateway, _) = memory_services();
    let mut session = DashboardSession::open(services, analyst("u1")).await.unwrap();

    session.start_editing().unwrap();
    let first = session.save().await.unwrap().dashboard_id.clone();
    let second = gateway
        .create_dashboard(Dashboard::new(DashboardId::default_id(), "Second").owned_by("acme", "u1"))
        .await
        .unwrap()
        .dashboard_id;

    session.start_editing().unwrap();
    assert_eq!(
        session.switch_to(&second).await.unwrap_err(),
        DashboardError::EditInProgress
    );
    assert_eq!(
        session.delete(&second).await.unwrap_err(),
        DashboardError::EditInProgress
    );
    session.cancel();

    session.switch_to(&second).await.unwrap();
    assert_eq!(session.dashboard().name, "Second");
    assert!(session.runtime().is_empty());

    let missing = DashboardId::from("ghost");
    assert!(matches!(
        session.switch_to(&missing).await.unwrap_err(),
        DashboardError::LoadError(GatewayError::NotFound(_))
    ));

    // Deleting the current dashboard falls back to the remaining one
    session.delete(&second).await.unwrap();
    assert_eq!(session.dashboard().dashboard_id, first);
    assert_eq!(session.dashboards().await.unwrap().len(), 1);

    // Deleting the last one regenerates a default
    session.delete(&first).await.unwrap();
    assert!(session.dashboard().is_default);
    assert_eq!(ids(session.dashboard()).len(), session.runtime().len());
    assert!(gateway.is_empty());
}

#[tokio::test]
async fn config_entitlements_gate_add() {
    let config = VantageConfig::from_toml_str(
        r#"
        [entitlements]
        revenue_overview = "enterprise"
        "#,
    )
    .unwrap();
    let svc = DashboardServices::from_config(
        config,
        Arc::new(MemoryGateway::new()),
        ProviderRegistry::with_fallback(Arc::new(CountingProvider::new())),
    );
    let mut session = DashboardSession::open(svc, manager("u1")).await.unwrap();
    assert!(session
        .dashboard()
        .widgets()
        .iter()
        .all(|w| w.kind_id.as_str() != "revenue_overview"));
    assert!(session
        .visible_kinds()
        .iter()
        .all(|k| k.kind_id.as_str() != "revenue_overview"));

    session.start_editing().unwrap();
    assert_eq!(
        session.add_widget("revenue_overview", None).unwrap_err(),
        DashboardError::WidgetNotPermitted("revenue_overview".into())
    );
    assert_eq!(
        session.add_widget("no_such_kind", None).unwrap_err(),
        DashboardError::UnknownWidgetKind("no_such_kind".into())
    );
}

#[tokio::test]
async fn delete_is_scoped_to_the_actor() {
    let foreign = Dashboard::new(DashboardId::from("other-org"), "Globex").owned_by("globex", "u9");
    let colleague = Dashboard::new(DashboardId::from("colleague"), "Theirs").owned_by("acme", "u2");
    let gateway = Arc::new(MemoryGateway::with_dashboards([foreign, colleague]));
    let mut session = DashboardSession::open(
        services(gateway.clone(), Arc::new(CountingProvider::new())),
        viewer("u1"),
    )
    .await
    .unwrap();

    for id in ["other-org", "colleague"] {
        let id = DashboardId::from(id);
        assert_eq!(
            session.delete(&id).await.unwrap_err(),
            DashboardError::LoadError(GatewayError::NotFound(id.clone()))
        );
        assert!(gateway.get(&id).is_some(), "{id} must survive");
    }
    assert_eq!(gateway.len(), 2);
    assert!(session.dashboard().is_default);
}

/// A stored dashboard whose two widgets share one instance id
fn duplicated_widgets() -> serde_json::Value {
    let mut dashboard = Dashboard::new(DashboardId::from("dup"), "Broken").owned_by("acme", "u1");
    dashboard
        .push_widget(WidgetInstance::new(
            InstanceId::from("a"),
            "nps_score".into(),
            WidgetConfig::new(),
            LayoutGeometry::new(0, 0, 3, 3),
        ))
        .unwrap();
    let mut value = serde_json::to_value(&dashboard).unwrap();
    let widgets = value["widgets"].as_array_mut().unwrap();
    let mut twin = widgets[0].clone();
    twin["geometry"]["x"] = json!(3);
    widgets.push(twin);
    value
}

#[tokio::test]
async fn stored_dashboard_with_repeated_instance_ids_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dashboards.json");
    std::fs::write(
        &path,
        serde_json::to_vec(&json!({ "dashboards": [duplicated_widgets()] })).unwrap(),
    )
    .unwrap();
    let svc = services(
        Arc::new(JsonFileGateway::new(&path)),
        Arc::new(CountingProvider::new()),
    );

    let err = DashboardSession::open(svc, viewer("u1")).await.unwrap_err();
    match err {
        DashboardError::LoadError(GatewayError::Storage(message)) => {
            assert!(message.contains("dup"), "{message}");
            assert!(message.contains("duplicate widget instance: a"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn switching_to_a_corrupt_dashboard_keeps_the_current_one() {
    let broken: Dashboard = serde_json::from_value(duplicated_widgets()).unwrap();
    assert!(broken.check_integrity().is_err());

    let gateway = Arc::new(MemoryGateway::new());
    let mut session = DashboardSession::open(
        services(gateway.clone(), Arc::new(CountingProvider::new())),
        viewer("u1"),
    )
    .await
    .unwrap();
    let before = session.dashboard().clone();

    let stored = gateway.create_dashboard(broken).await.unwrap();
    assert_eq!(stored.len(), 2);

    assert!(matches!(
        session.switch_to(&stored.dashboard_id).await.unwrap_err(),
        DashboardError::LoadError(GatewayError::Storage(_))
    ));
    assert_eq!(session.dashboard(), &before);
    assert_eq!(session.runtime().len(), before.len());
}
