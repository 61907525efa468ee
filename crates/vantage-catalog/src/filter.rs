//! Permission filter
//!
//! A kind is visible to an actor iff its `required_permissions` is empty,
//! the actor is an admin, or the actor holds ANY of the required permissions.
//! All functions are pure.

use crate::catalog::WidgetCatalog;
use crate::entitlement::EntitlementProvider;
use crate::kind::WidgetKind;
use std::collections::BTreeSet;
use vantage_model::{Actor, KindId};

/// Whether `actor` may see `kind` by permissions alone
#[inline]
#[must_use]
pub fn is_visible(kind: &WidgetKind, actor: &Actor) -> bool {
    actor.satisfies_any(&kind.required_permissions)
}

/// Kinds visible to `actor`, in catalog order
#[must_use]
pub fn visible_kinds<'a>(catalog: &'a WidgetCatalog, actor: &Actor) -> Vec<&'a WidgetKind> {
    catalog.iter().filter(|k| is_visible(k, actor)).collect()
}

/// Kinds visible to `actor` and allowed by `entitlements`, in catalog order
#[must_use]
pub fn visible_kinds_with<'a>(
    catalog: &'a WidgetCatalog,
    actor: &Actor,
    entitlements: &dyn EntitlementProvider,
) -> Vec<&'a WidgetKind> {
    catalog
        .iter()
        .filter(|k| is_visible(k, actor) && entitlements.allows(actor, k))
        .collect()
}

/// Ids of [`visible_kinds_with`]
#[must_use]
pub fn visible_kind_ids(
    catalog: &WidgetCatalog,
    actor: &Actor,
    entitlements: &dyn EntitlementProvider,
) -> BTreeSet<KindId> {
    visible_kinds_with(catalog, actor, entitlements)
        .into_iter()
        .map(|k| k.kind_id.clone())
        .collect()
}
