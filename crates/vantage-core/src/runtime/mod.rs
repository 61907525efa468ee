//! Widget data runtime
//!
//! Loads data for every widget instance independently:
//! - One slot per instance holding its [`WidgetRuntimeState`]
//! - Each load runs as its own task under a deadline
//! - Last request wins: a new load aborts the previous one, and a result
//!   from an older generation is discarded
//! - Results for instances removed meanwhile are dropped
//! - While paused, automatic loads are deferred and run on resume
//!
//! All methods that start loads spawn Tokio tasks and must be called from
//! within a Tokio runtime.

mod provider;
mod state;

pub use provider::{DataProvider, ProviderError, ProviderRegistry, WidgetData};
pub use state::{LoadOutcome, LoadStatus, RefreshReport, RuntimeEvent, WidgetRuntimeState};

use crate::config::RuntimeConfig;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};
use vantage_catalog::{FetchRequest, WidgetCatalog};
use vantage_model::{Dashboard, InstanceId, KindId, WidgetConfig, WidgetInstance};

/// What a slot loads: reloading is needed when this changes
#[derive(Debug, Clone, PartialEq)]
struct Binding {
    kind_id: KindId,
    config: WidgetConfig,
}

impl Binding {
    fn of(widget: &WidgetInstance) -> Self {
        Self {
            kind_id: widget.kind_id.clone(),
            config: widget.config.clone(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    binding: Binding,
    state: WidgetRuntimeState,
    /// Bumped by every load start; only the latest may settle
    generation: u64,
    in_flight: Option<AbortHandle>,
    /// Automatic load deferred while paused
    pending: bool,
}

impl Slot {
    fn new(binding: Binding) -> Self {
        Self {
            binding,
            state: WidgetRuntimeState::idle(),
            generation: 0,
            in_flight: None,
            pending: false,
        }
    }
}

/// Changes applied by [`WidgetRuntime::sync`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Instances new to the runtime
    pub mounted: Vec<InstanceId>,
    /// Instances whose kind or config changed
    pub rebound: Vec<InstanceId>,
    /// Instances no longer on the dashboard
    pub unmounted: Vec<InstanceId>,
}

impl SyncSummary {
    /// Check if nothing changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty() && self.rebound.is_empty() && self.unmounted.is_empty()
    }
}

#[derive(Debug)]
struct RuntimeInner {
    catalog: Arc<WidgetCatalog>,
    providers: ProviderRegistry,
    config: RuntimeConfig,
    slots: DashMap<InstanceId, Slot>,
    paused: AtomicBool,
    events: broadcast::Sender<RuntimeEvent>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

/// Per-widget asynchronous data loader
#[derive(Debug)]
pub struct WidgetRuntime {
    inner: Arc<RuntimeInner>,
}

impl WidgetRuntime {
    /// Create runtime with no mounted widgets
    #[must_use]
    pub fn new(
        catalog: Arc<WidgetCatalog>,
        providers: ProviderRegistry,
        config: RuntimeConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(RuntimeInner {
                catalog,
                providers,
                config,
                slots: DashMap::new(),
                paused: AtomicBool::new(false),
                events,
                ticker: Mutex::new(None),
            }),
        }
    }

    /// Runtime settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Reconcile slots with `dashboard`
    ///
    /// New instances and instances whose kind or config changed are loaded
    /// (or marked pending while paused). Instances no longer present are
    /// removed and their in-flight loads cancelled. Geometry-only changes
    /// do not reload.
    pub fn sync(&self, dashboard: &Dashboard) -> SyncSummary {
        let mut summary = SyncSummary::default();

        let stale: Vec<InstanceId> = self
            .inner
            .slots
            .iter()
            .filter(|entry| !dashboard.contains(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        for instance_id in stale {
            self.inner.unmount(&instance_id);
            summary.unmounted.push(instance_id);
        }

        for widget in dashboard.widgets() {
            let binding = Binding::of(widget);
            let existing = self
                .inner
                .slots
                .get_mut(&widget.instance_id)
                .map(|mut slot| {
                    let changed = slot.binding != binding;
                    if changed {
                        slot.binding = binding.clone();
                    }
                    changed
                });
            match existing {
                Some(false) => continue,
                Some(true) => summary.rebound.push(widget.instance_id.clone()),
                None => {
                    self.inner
                        .slots
                        .insert(widget.instance_id.clone(), Slot::new(binding));
                    summary.mounted.push(widget.instance_id.clone());
                }
            }
            self.inner.trigger(&widget.instance_id);
        }

        if !summary.is_empty() {
            tracing::debug!(
                dashboard_id = %dashboard.dashboard_id,
                mounted = summary.mounted.len(),
                rebound = summary.rebound.len(),
                unmounted = summary.unmounted.len(),
                paused = self.is_paused(),
                "runtime synced"
            );
        }
        summary
    }

    /// Load one instance now and wait for it to settle
    ///
    /// Runs even while paused. Returns `None` for an unknown instance.
    pub async fn refresh(&self, instance_id: &InstanceId) -> Option<LoadOutcome> {
        let (generation, handle) = self.inner.spawn_load(instance_id)?;
        Some(self.inner.join(instance_id, generation, handle).await)
    }

    /// Load every instance concurrently and wait for all to settle
    ///
    /// One failure never prevents the others from completing.
    pub async fn refresh_all(&self) -> RefreshReport {
        self.inner.refresh_all().await
    }

    /// Unmount one instance, cancelling its in-flight load
    pub fn remove(&self, instance_id: &InstanceId) -> bool {
        self.inner.unmount(instance_id)
    }

    /// Defer automatic loads until [`resume`](Self::resume)
    pub fn pause(&self) {
        if !self.inner.paused.swap(true, Ordering::SeqCst) {
            tracing::debug!("runtime paused");
        }
    }

    /// Resume automatic loads, starting those deferred while paused
    ///
    /// Returns the number of loads started.
    pub fn resume(&self) -> usize {
        self.inner.paused.store(false, Ordering::SeqCst);
        let pending: Vec<InstanceId> = self
            .inner
            .slots
            .iter()
            .filter(|entry| entry.pending)
            .map(|entry| entry.key().clone())
            .collect();
        for instance_id in &pending {
            // Detached: the task settles the slot on its own
            let _ = self.inner.spawn_load(instance_id);
        }
        tracing::debug!(started = pending.len(), "runtime resumed");
        pending.len()
    }

    /// Check if automatic loads are deferred
    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::SeqCst)
    }

    /// Check if an instance has a deferred load
    #[must_use]
    pub fn is_pending(&self, instance_id: &InstanceId) -> bool {
        self.inner
            .slots
            .get(instance_id)
            .is_some_and(|slot| slot.pending)
    }

    /// Current state of one instance
    #[must_use]
    pub fn state(&self, instance_id: &InstanceId) -> Option<WidgetRuntimeState> {
        self.inner
            .slots
            .get(instance_id)
            .map(|slot| slot.state.clone())
    }

    /// Current state of every instance
    #[must_use]
    pub fn states(&self) -> BTreeMap<InstanceId, WidgetRuntimeState> {
        self.inner
            .slots
            .iter()
            .map(|entry| (entry.key().clone(), entry.state.clone()))
            .collect()
    }

    /// Get number of mounted instances
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    /// Check if nothing is mounted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Subscribe to status changes
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.inner.events.subscribe()
    }

    /// Refresh everything every `period`, skipping ticks while paused
    ///
    /// Replaces any previously started auto-refresh.
    pub fn spawn_auto_refresh(&self, period: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.paused.load(Ordering::SeqCst) {
                    tracing::trace!("auto refresh skipped while paused");
                    continue;
                }
                let report = inner.refresh_all().await;
                tracing::debug!(
                    succeeded = report.succeeded.len(),
                    failed = report.failed.len(),
                    "auto refresh"
                );
            }
        });
        if let Some(previous) = self.inner.ticker.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop auto-refresh and unmount everything
    pub fn shutdown(&self) {
        if let Some(ticker) = self.inner.ticker.lock().take() {
            ticker.abort();
        }
        let ids: Vec<InstanceId> = self
            .inner
            .slots
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for instance_id in &ids {
            self.inner.unmount(instance_id);
        }
    }
}

impl Drop for WidgetRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl RuntimeInner {
    /// Automatic load: deferred while paused
    fn trigger(self: &Arc<Self>, instance_id: &InstanceId) {
        if self.paused.load(Ordering::SeqCst) {
            if let Some(mut slot) = self.slots.get_mut(instance_id) {
                slot.pending = true;
            }
        } else {
            let _ = self.spawn_load(instance_id);
        }
    }

    /// Start a new generation for an instance, aborting the previous load
    fn spawn_load(
        self: &Arc<Self>,
        instance_id: &InstanceId,
    ) -> Option<(u64, JoinHandle<LoadOutcome>)> {
        let (generation, binding) = {
            let mut slot = self.slots.get_mut(instance_id)?;
            slot.generation += 1;
            if let Some(previous) = slot.in_flight.take() {
                previous.abort();
            }
            slot.pending = false;
            slot.state.begin_loading();
            (slot.generation, slot.binding.clone())
        };
        self.emit(instance_id, LoadStatus::Loading, generation);
        tracing::debug!(instance_id = %instance_id, kind_id = %binding.kind_id, generation, "load started");

        let inner = Arc::clone(self);
        let task_id = instance_id.clone();
        let handle = tokio::spawn(async move { inner.load(task_id, generation, binding).await });

        if let Some(mut slot) = self.slots.get_mut(instance_id) {
            if slot.generation == generation {
                slot.in_flight = Some(handle.abort_handle());
            }
        }
        Some((generation, handle))
    }

    async fn load(&self, instance_id: InstanceId, generation: u64, binding: Binding) -> LoadOutcome {
        let result = match self.prepare(&binding) {
            Ok((request, provider)) => {
                let deadline = self.config.load_timeout();
                match tokio::time::timeout(deadline, provider.fetch(&request)).await {
                    Ok(Ok(data)) => Ok(data),
                    Ok(Err(err)) => Err(err.to_string()),
                    Err(_) => Err(format!("timed out after {}ms", deadline.as_millis())),
                }
            }
            Err(message) => Err(message),
        };
        self.settle(&instance_id, generation, result)
    }

    fn prepare(&self, binding: &Binding) -> Result<(FetchRequest, Arc<dyn DataProvider>), String> {
        let kind = self
            .catalog
            .get(binding.kind_id.as_str())
            .ok_or_else(|| format!("unknown widget kind: {}", binding.kind_id))?;
        let provider = self
            .providers
            .resolve(binding.kind_id.as_str())
            .ok_or_else(|| format!("no data provider for {}", binding.kind_id))?;
        Ok((FetchRequest::resolve(kind, &binding.config), provider))
    }

    /// Apply a load result if it is still the latest for a mounted instance
    fn settle(
        &self,
        instance_id: &InstanceId,
        generation: u64,
        result: Result<WidgetData, String>,
    ) -> LoadOutcome {
        let Some(mut slot) = self.slots.get_mut(instance_id) else {
            tracing::debug!(instance_id = %instance_id, generation, "dropped result for removed widget");
            return LoadOutcome::Dropped;
        };
        if slot.generation != generation {
            tracing::debug!(
                instance_id = %instance_id,
                generation,
                latest = slot.generation,
                "discarded superseded result"
            );
            return LoadOutcome::Superseded;
        }
        slot.in_flight = None;
        let (status, outcome) = match result {
            Ok(data) => {
                slot.state.succeed(data);
                (LoadStatus::Success, LoadOutcome::Success)
            }
            Err(message) => {
                tracing::warn!(instance_id = %instance_id, kind_id = %slot.binding.kind_id, error = %message, "widget load failed");
                slot.state.fail(message.clone());
                (LoadStatus::Error, LoadOutcome::Failed(message))
            }
        };
        drop(slot);
        self.emit(instance_id, status, generation);
        outcome
    }

    async fn join(
        &self,
        instance_id: &InstanceId,
        generation: u64,
        handle: JoinHandle<LoadOutcome>,
    ) -> LoadOutcome {
        match handle.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => {
                if self.slots.contains_key(instance_id) {
                    LoadOutcome::Superseded
                } else {
                    LoadOutcome::Dropped
                }
            }
            Err(err) => self.settle(instance_id, generation, Err(format!("load task failed: {err}"))),
        }
    }

    async fn refresh_all(self: &Arc<Self>) -> RefreshReport {
        let ids: Vec<InstanceId> = self.slots.iter().map(|entry| entry.key().clone()).collect();
        let loads = ids.into_iter().filter_map(|instance_id| {
            let (generation, handle) = self.spawn_load(&instance_id)?;
            Some(async move {
                let outcome = self.join(&instance_id, generation, handle).await;
                (instance_id, outcome)
            })
        });
        let outcomes = futures::future::join_all(loads.collect::<Vec<_>>()).await;

        let mut report = RefreshReport::default();
        for (instance_id, outcome) in outcomes {
            report.record(instance_id, outcome);
        }
        report
    }

    fn unmount(&self, instance_id: &InstanceId) -> bool {
        match self.slots.remove(instance_id) {
            Some((_, slot)) => {
                if let Some(in_flight) = slot.in_flight {
                    in_flight.abort();
                }
                tracing::debug!(instance_id = %instance_id, "widget unmounted");
                true
            }
            None => false,
        }
    }

    fn emit(&self, instance_id: &InstanceId, status: LoadStatus, generation: u64) {
        // No subscribers is fine
        let _ = self.events.send(RuntimeEvent {
            instance_id: instance_id.clone(),
            status,
            generation,
        });
    }
}
