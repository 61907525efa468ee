//! Actor claims
//!
//! The identity provider resolves an authenticated user into an [`Actor`]:
//! role, permission set, admin override, organization and subscription tier.
//! Nothing here authenticates; these are consumed claims.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Opaque permission string (e.g. `analytics.read`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    /// Create permission
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque role name (e.g. `analyst`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// Most restrictive built-in role
    pub const VIEWER: &'static str = "viewer";

    /// Create role
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Organization subscription tier, ordered from least to most capable
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    /// Free plan
    #[default]
    Free,
    /// Entry paid plan
    Starter,
    /// Professional plan
    Professional,
    /// Enterprise plan
    Enterprise,
}

impl SubscriptionTier {
    /// Lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown subscription tier name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown subscription tier: {0}")]
pub struct UnknownTier(pub String);

impl FromStr for SubscriptionTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "starter" => Ok(Self::Starter),
            "professional" | "pro" => Ok(Self::Professional),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

/// Resolved identity of whoever views or edits a dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identifier
    pub actor_id: String,
    /// Role used to pick the default template
    pub role: Role,
    /// Role membership plus organization entitlements
    pub permissions: BTreeSet<Permission>,
    /// Universal override for every permission check
    pub is_admin: bool,
    /// Tenant
    pub organization_id: String,
    /// Tenant subscription tier
    #[serde(default)]
    pub tier: SubscriptionTier,
}

impl Actor {
    /// Create actor with no permissions
    #[must_use]
    pub fn new(
        actor_id: impl Into<String>,
        role: impl Into<Role>,
        organization_id: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            role: role.into(),
            permissions: BTreeSet::new(),
            is_admin: false,
            organization_id: organization_id.into(),
            tier: SubscriptionTier::default(),
        }
    }

    /// With a single permission
    #[inline]
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    /// With several permissions
    #[must_use]
    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        self.permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    /// Mark as admin
    #[inline]
    #[must_use]
    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    /// With subscription tier
    #[inline]
    #[must_use]
    pub fn with_tier(mut self, tier: SubscriptionTier) -> Self {
        self.tier = tier;
        self
    }

    /// Whether the actor holds at least one of `required`.
    ///
    /// Empty `required` is always satisfied; admins satisfy everything.
    #[must_use]
    pub fn satisfies_any(&self, required: &BTreeSet<Permission>) -> bool {
        required.is_empty()
            || self.is_admin
            || required.iter().any(|p| self.permissions.contains(p))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self(value)
    }
}
