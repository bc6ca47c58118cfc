use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;


/// The two permission tiers every team gets.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    PowerUsers,
    Users,
}

impl Role {
    /// Reporting order: power users first.
    pub const ALL: [Role; 2] = [Role::PowerUsers, Role::Users];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::PowerUsers => "PowerUsers",
            Role::Users => "Users",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}', expected PowerUsers or Users")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PowerUsers" => Ok(Role::PowerUsers),
            "Users" => Ok(Role::Users),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}


/// Identity of a team's role group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub team: String,
    pub role: Role,
}

impl GroupKey {
    pub fn new(team: impl Into<String>, role: Role) -> Self {
        Self { team: team.into(), role }
    }

    pub fn group_name(&self) -> String {
        group_name(&self.team, self.role)
    }
}

pub fn group_name(team: &str, role: Role) -> String {
    format!("Dynatrace_{}_{}", team, role)
}


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupDescriptor {
    pub uuid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GroupList {
    #[serde(default)]
    pub items: Vec<GroupDescriptor>,
}


/// A permission assigned to a group on one scope.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub permission_name: String,
    pub scope: String,
    pub scope_type: String,
}

impl Grant {
    pub const TENANT_SCOPE: &'static str = "tenant";

    pub fn tenant(permission_name: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            permission_name: permission_name.into(),
            scope: tenant.into(),
            scope_type: Self::TENANT_SCOPE.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupPermissions {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Grant>,
}


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PermissionDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TenantList {
    #[serde(default)]
    pub data: Vec<Tenant>,
}
