use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::Role;

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "prints.read").
/// The wildcard permission `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const ALL: Permission = Permission::from_static("*");
pub const PRINTS_READ: Permission = Permission::from_static("prints.read");
pub const PRINTS_CREATE: Permission = Permission::from_static("prints.create");
pub const INVENTORY_WITHDRAW: Permission = Permission::from_static("inventory.withdraw");
pub const INVENTORY_STATUS: Permission = Permission::from_static("inventory.status");
pub const INVENTORY_ADJUST: Permission = Permission::from_static("inventory.adjust");
pub const BATCHES_READ: Permission = Permission::from_static("batches.read");
pub const BATCHES_WRITE: Permission = Permission::from_static("batches.write");
pub const STATS_READ: Permission = Permission::from_static("stats.read");
pub const USERS_READ: Permission = Permission::from_static("users.read");
pub const USERS_WRITE: Permission = Permission::from_static("users.write");

/// Fixed role → permission policy.
pub fn permissions_for(role: Role) -> Vec<Permission> {
    match role {
        Role::Admin => vec![ALL],
        Role::Operator => vec![
            PRINTS_READ,
            INVENTORY_WITHDRAW,
            INVENTORY_STATUS,
            BATCHES_READ,
            STATS_READ,
        ],
        Role::Viewer => vec![PRINTS_READ, STATS_READ],
    }
}
