//! Per-widget load state

use super::provider::WidgetData;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use vantage_model::InstanceId;

/// Load lifecycle of one widget instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Never loaded
    Idle,
    /// A load is in flight
    Loading,
    /// Last load succeeded
    Success,
    /// Last load failed
    Error,
}

/// What a widget currently shows
///
/// `data` survives failed and in-flight reloads; only a success replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetRuntimeState {
    /// Lifecycle status
    pub status: LoadStatus,
    /// Last successfully loaded payload
    pub data: Option<WidgetData>,
    /// Message of the last failure
    pub error: Option<String>,
    /// When the last load settled
    pub last_updated: Option<DateTime<Utc>>,
}

impl WidgetRuntimeState {
    /// Fresh, never loaded
    #[inline]
    #[must_use]
    pub fn idle() -> Self {
        Self {
            status: LoadStatus::Idle,
            data: None,
            error: None,
            last_updated: None,
        }
    }

    pub(crate) fn begin_loading(&mut self) {
        self.status = LoadStatus::Loading;
    }

    pub(crate) fn succeed(&mut self, data: WidgetData) {
        self.status = LoadStatus::Success;
        self.data = Some(data);
        self.error = None;
        self.last_updated = Some(next_stamp(self.last_updated));
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.status = LoadStatus::Error;
        self.error = Some(message);
        self.last_updated = Some(next_stamp(self.last_updated));
    }
}

impl Default for WidgetRuntimeState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Current time, nudged past `previous` when the clock has not moved on
fn next_stamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// Broadcast whenever a widget's status changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuntimeEvent {
    /// Affected instance
    pub instance_id: InstanceId,
    /// New status
    pub status: LoadStatus,
    /// Load generation that produced the change
    pub generation: u64,
}

/// How one load ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Data applied
    Success,
    /// Error applied; previous data kept
    Failed(String),
    /// A newer load for the same instance took over
    Superseded,
    /// The instance was removed before the load settled
    Dropped,
}

/// Per-instance outcome of a bulk refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Loads that applied data
    pub succeeded: Vec<InstanceId>,
    /// Loads that applied an error, with its message
    pub failed: Vec<(InstanceId, String)>,
    /// Loads overtaken by a newer request
    pub superseded: Vec<InstanceId>,
    /// Loads whose instance disappeared
    pub dropped: Vec<InstanceId>,
}

impl RefreshReport {
    pub(crate) fn record(&mut self, instance_id: InstanceId, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Success => self.succeeded.push(instance_id),
            LoadOutcome::Failed(message) => self.failed.push((instance_id, message)),
            LoadOutcome::Superseded => self.superseded.push(instance_id),
            LoadOutcome::Dropped => self.dropped.push(instance_id),
        }
    }

    /// Number of loads attempted
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.superseded.len() + self.dropped.len()
    }

    /// Check if every load succeeded
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.total() == self.succeeded.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_keeps_previous_data() {
        let mut state = WidgetRuntimeState::idle();
        state.begin_loading();
        state.succeed(json!({"value": 1}));
        state.begin_loading();
        assert_eq!(state.data, Some(json!({"value": 1})));

        state.fail("upstream 503".into());
        assert_eq!(state.status, LoadStatus::Error);
        assert_eq!(state.data, Some(json!({"value": 1})));
        assert_eq!(state.error.as_deref(), Some("upstream 503"));

        state.succeed(json!({"value": 2}));
        assert!(state.error.is_none());
    }

    #[test]
    fn stamps_strictly_increase() {
        let mut state = WidgetRuntimeState::idle();
        let mut last = None;
        for i in 0..1000 {
            if i % 2 == 0 {
                state.succeed(json!(i));
            } else {
                state.fail("x".into());
            }
            assert!(state.last_updated > last);
            last = state.last_updated;
        }
    }

    #[test]
    fn stamp_moves_past_future_previous() {
        let future = Utc::now() + Duration::hours(1);
        assert_eq!(next_stamp(Some(future)), future + Duration::microseconds(1));
    }

    #[test]
    fn report_counts() {
        let mut report = RefreshReport::default();
        report.record("a".into(), LoadOutcome::Success);
        assert!(report.is_clean());
        report.record("b".into(), LoadOutcome::Failed("boom".into()));
        report.record("c".into(), LoadOutcome::Dropped);
        assert_eq!(report.total(), 3);
        assert!(!report.is_clean());
        assert_eq!(report.failed, vec![("b".into(), "boom".to_string())]);
    }
}
