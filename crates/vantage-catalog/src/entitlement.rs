//! Subscription-tier entitlements
//!
//! An additional visibility predicate composed with the permission filter.
//! Entitlements follow the organization's plan, so the admin override does
//! not bypass them.

use crate::kind::WidgetKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use vantage_model::{Actor, KindId, SubscriptionTier};

/// Decides whether the actor's organization is entitled to a widget kind
pub trait EntitlementProvider: Send + Sync + Debug {
    /// Whether `kind` is available to `actor`
    fn allows(&self, actor: &Actor, kind: &WidgetKind) -> bool;
}

/// No tier gating
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl EntitlementProvider for AllowAll {
    #[inline]
    fn allows(&self, _actor: &Actor, _kind: &WidgetKind) -> bool {
        true
    }
}

/// Minimum subscription tier per widget kind; unlisted kinds are ungated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierEntitlements {
    minimum: BTreeMap<KindId, SubscriptionTier>,
}

impl TierEntitlements {
    /// Create with no gates
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate `kind_id` behind `tier`
    #[inline]
    #[must_use]
    pub fn require(mut self, kind_id: impl Into<KindId>, tier: SubscriptionTier) -> Self {
        self.minimum.insert(kind_id.into(), tier);
        self
    }

    /// Minimum tier for a kind, if gated
    #[inline]
    #[must_use]
    pub fn minimum_for(&self, kind_id: &str) -> Option<SubscriptionTier> {
        self.minimum.get(kind_id).copied()
    }

    /// Check if no kind is gated
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.minimum.is_empty()
    }
}

impl From<BTreeMap<KindId, SubscriptionTier>> for TierEntitlements {
    fn from(minimum: BTreeMap<KindId, SubscriptionTier>) -> Self {
        Self { minimum }
    }
}

impl EntitlementProvider for TierEntitlements {
    fn allows(&self, actor: &Actor, kind: &WidgetKind) -> bool {
        self.minimum_for(kind.kind_id.as_str())
            .map_or(true, |min| actor.tier >= min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WidgetCatalog;

    #[test]
    fn tier_gate() {
        let catalog = WidgetCatalog::builtin();
        let kind = catalog.get("revenue_overview").unwrap();
        let gates = TierEntitlements::new().require("revenue_overview", SubscriptionTier::Professional);

        let free = Actor::new("u", "admin", "org").admin();
        let pro = free.clone().with_tier(SubscriptionTier::Enterprise);

        assert!(!gates.allows(&free, kind));
        assert!(gates.allows(&pro, kind));
    }

    #[test]
    fn ungated_kinds_pass() {
        let catalog = WidgetCatalog::builtin();
        let kind = catalog.get("nps_score").unwrap();
        let gates = TierEntitlements::new().require("revenue_overview", SubscriptionTier::Enterprise);
        assert!(gates.allows(&Actor::new("u", "viewer", "org"), kind));
    }

    #[test]
    fn deserializes_from_table() {
        let gates: TierEntitlements =
            serde_json::from_str(r#"{"revenue_overview":"professional"}"#).unwrap();
        assert_eq!(
            gates.minimum_for("revenue_overview"),
            Some(SubscriptionTier::Professional)
        );
    }
}
