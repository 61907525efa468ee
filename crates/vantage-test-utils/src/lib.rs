//! Testing utilities for the Vantage workspace
//!
//! Actor fixtures, controllable data providers and a gateway whose failures
//! can be switched on and off.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use vantage_catalog::FetchRequest;
use vantage_core::{
    DashboardServices, DataProvider, GatewayError, MemoryGateway, PersistenceGateway,
    ProviderError, ProviderRegistry, WidgetData,
};
use vantage_model::{Actor, Dashboard, DashboardId};

pub const ORG: &str = "acme";

pub fn viewer(actor_id: &str) -> Actor {
    Actor::new(actor_id, "viewer", ORG)
}

pub fn analyst(actor_id: &str) -> Actor {
    Actor::new(actor_id, "analyst", ORG).with_permissions(["analytics.read", "engagement.read"])
}

pub fn manager(actor_id: &str) -> Actor {
    Actor::new(actor_id, "manager", ORG).with_permissions([
        "analytics.read",
        "customer.read",
        "revenue.read",
    ])
}

pub fn admin(actor_id: &str) -> Actor {
    Actor::new(actor_id, "admin", ORG).admin()
}

/// Always returns the same payload
#[derive(Debug, Clone)]
pub struct StaticProvider(pub WidgetData);

#[async_trait]
impl DataProvider for StaticProvider {
    async fn fetch(&self, _request: &FetchRequest) -> Result<WidgetData, ProviderError> {
        Ok(self.0.clone())
    }
}

/// Returns `{"kind": .., "call": n}` and counts calls; fails for listed kinds
#[derive(Debug, Default)]
pub struct CountingProvider {
    calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl CountingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(kinds: &[&str]) -> Self {
        let provider = Self::new();
        provider
            .failing
            .lock()
            .extend(kinds.iter().map(|k| (*k).to_string()));
        provider
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, kind: &str, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(kind.to_string());
        } else {
            set.remove(kind);
        }
    }
}

#[async_trait]
impl DataProvider for CountingProvider {
    async fn fetch(&self, request: &FetchRequest) -> Result<WidgetData, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.lock().contains(request.kind_id.as_str()) {
            return Err(format!("{} backend unavailable", request.kind_id).into());
        }
        Ok(json!({ "kind": request.kind_id.as_str(), "call": call }))
    }
}

type Reply = Result<WidgetData, ProviderError>;

enum Step {
    Ready(Reply),
    Deferred(oneshot::Receiver<Reply>),
}

/// Answers calls in order from a script
///
/// `deferred()` queues a step that blocks until its sender is used, which
/// lets a test hold one load in flight while another overtakes it.
#[derive(Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready(&self, reply: Reply) -> &Self {
        self.steps.lock().push_back(Step::Ready(reply));
        self
    }

    pub fn deferred(&self) -> oneshot::Sender<Reply> {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().push_back(Step::Deferred(rx));
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataProvider for ScriptedProvider {
    async fn fetch(&self, _request: &FetchRequest) -> Result<WidgetData, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Ready(reply)) => reply,
            Some(Step::Deferred(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(ProviderError::from("reply sender dropped"))),
            None => Err(ProviderError::from("script exhausted")),
        }
    }
}

/// Never answers
#[derive(Debug, Default)]
pub struct HangingProvider;

#[async_trait]
impl DataProvider for HangingProvider {
    async fn fetch(&self, _request: &FetchRequest) -> Result<WidgetData, ProviderError> {
        std::future::pending().await
    }
}

/// Memory store whose operations fail while switched off
#[derive(Debug, Default)]
pub struct ToggleGateway {
    inner: MemoryGateway,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl ToggleGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dashboards(dashboards: impl IntoIterator<Item = Dashboard>) -> Self {
        Self {
            inner: MemoryGateway::with_dashboards(dashboards),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful creates and updates
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn store(&self) -> &MemoryGateway {
        &self.inner
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(GatewayError::Unavailable("store offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceGateway for ToggleGateway {
    async fn list_dashboards(&self, actor: &Actor) -> Result<Vec<Dashboard>, GatewayError> {
        self.check()?;
        self.inner.list_dashboards(actor).await
    }

    async fn create_dashboard(&self, dashboard: Dashboard) -> Result<Dashboard, GatewayError> {
        self.check()?;
        let created = self.inner.create_dashboard(dashboard).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn update_dashboard(
        &self,
        dashboard_id: &DashboardId,
        dashboard: Dashboard,
    ) -> Result<Dashboard, GatewayError> {
        self.check()?;
        let updated = self.inner.update_dashboard(dashboard_id, dashboard).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(updated)
    }

    async fn delete_dashboard(&self, dashboard_id: &DashboardId) -> Result<(), GatewayError> {
        self.check()?;
        self.inner.delete_dashboard(dashboard_id).await
    }
}

/// Services over `gateway` where every kind is served by `provider`
pub fn services(
    gateway: Arc<dyn PersistenceGateway>,
    provider: Arc<dyn DataProvider>,
) -> DashboardServices {
    DashboardServices::new(gateway, ProviderRegistry::with_fallback(provider))
}

/// Services over a fresh memory store with a [`CountingProvider`]
pub fn memory_services() -> (DashboardServices, Arc<MemoryGateway>, Arc<CountingProvider>) {
    let gateway = Arc::new(MemoryGateway::new());
    let provider = Arc::new(CountingProvider::new());
    let services = services(gateway.clone(), provider.clone());
    (services, gateway, provider)
}
