use std::collections::{BTreeMap, BTreeSet};

use pt_lifecycle::{LifecycleStatus, ParseStatusError};
use serde::{Deserialize, Serialize};

/// Entry in a role's status list that grants every status.
pub const ALL_SENTINEL: &str = "all";

/// Statuses a caller may see.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowedStatuses {
    All,
    Only(BTreeSet<LifecycleStatus>),
}

impl Default for AllowedStatuses {
    fn default() -> Self {
        AllowedStatuses::none()
    }
}

impl AllowedStatuses {
    pub fn none() -> Self {
        AllowedStatuses::Only(BTreeSet::new())
    }

    pub fn only(statuses: impl IntoIterator<Item = LifecycleStatus>) -> Self {
        AllowedStatuses::Only(statuses.into_iter().collect())
    }

    /// Parse a configured list of codes or labels. `"all"` anywhere in the
    /// list grants everything.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ParseStatusError> {
        let mut set = BTreeSet::new();
        for raw in entries {
            if raw.trim().eq_ignore_ascii_case(ALL_SENTINEL) {
                return Ok(AllowedStatuses::All);
            }
            set.insert(raw.parse::<LifecycleStatus>()?);
        }
        Ok(AllowedStatuses::Only(set))
    }

    pub fn allows(&self, status: LifecycleStatus) -> bool {
        match self {
            AllowedStatuses::All => true,
            AllowedStatuses::Only(set) => set.contains(&status),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, AllowedStatuses::All)
    }
}

/// Role → visible statuses, read once from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissions {
    #[serde(default)]
    pub roles: BTreeMap<String, AllowedStatuses>,
    /// Roles that see everything regardless of `roles`.
    #[serde(default)]
    pub admin_roles: BTreeSet<String>,
}

impl RolePermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(mut self, role: impl Into<String>, allowed: AllowedStatuses) -> Self {
        self.roles.insert(role.into(), allowed);
        self
    }

    pub fn with_admin(mut self, role: impl Into<String>) -> Self {
        self.admin_roles.insert(role.into());
        self
    }

    pub fn allowed_for(&self, role: &str) -> AllowedStatuses {
        if self.admin_roles.contains(role) {
            return AllowedStatuses::All;
        }
        self.roles.get(role).cloned().unwrap_or_default()
    }
}
