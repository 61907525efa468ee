//! Identifier newtypes
//!
//! All identifiers are string-backed so they survive persistence unchanged:
//! - [`KindId`] names a catalog entry
//! - [`InstanceId`] names a placed widget, unique per dashboard
//! - [`DashboardId`] names a dashboard (`"default"` for a generated one)

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use ulid::Ulid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier
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

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Catalog identifier of a widget kind (e.g. `churn_summary`)
    KindId
);

string_id!(
    /// Identifier of a widget instance, unique within its dashboard
    InstanceId
);

string_id!(
    /// Dashboard identifier
    DashboardId
);

impl InstanceId {
    /// Generate a fresh instance id (ULID, lowercase, `w-` prefixed)
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("w-{}", Ulid::new().to_string().to_lowercase()))
    }
}

impl DashboardId {
    /// Identifier carried by generated, not-yet-persisted dashboards
    pub const DEFAULT: &'static str = "default";

    /// Identifier for an ephemeral generated dashboard
    #[inline]
    #[must_use]
    pub fn default_id() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    /// Whether this is the ephemeral default id
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}
