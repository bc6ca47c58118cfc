//! In-memory [`IamBackend`] for exercising the permission core without a
//! live IAM API.
//!
//! Grants are stored per group with set semantics, so re-creating an
//! existing grant is a no-op just like the real service. Every call is
//! recorded and individual group/tenant pairs can be made to fail.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;

use common::{Grant, GroupDescriptor, GroupPermissions, PermissionDescriptor, Tenant};
use crate::backend::IamBackend;
use crate::error::{IamError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListGroups,
    GroupPermissions(String),
    CreateGrants { group_id: String, grants: Vec<Grant> },
    DeleteGrant { group_id: String, grant: Grant },
    PermissionCatalog,
    Tenants,
}

#[derive(Default)]
pub struct FakeBackend {
    groups: Mutex<Vec<GroupDescriptor>>,
    grants: Mutex<HashMap<String, BTreeSet<Grant>>>,
    failing: Mutex<HashSet<(String, String)>>,
    catalog: Mutex<Vec<PermissionDescriptor>>,
    tenants: Mutex<Vec<Tenant>>,
    calls: Mutex<Vec<Call>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().expect("fake backend lock poisoned")
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(names: &[&str]) -> Self {
        let backend = Self::new();
        for name in names {
            backend.add_group(name);
        }
        backend
    }

    /// Deterministic id used for a group name.
    pub fn group_id(name: &str) -> String {
        format!("uuid-{}", name)
    }

    pub fn add_group(&self, name: &str) {
        guard(&self.groups).push(GroupDescriptor {
            uuid: Self::group_id(name),
            name: name.to_string(),
            description: None,
        });
    }

    /// Seeds a grant without recording a call.
    pub fn seed_grant(&self, group_name: &str, grant: Grant) {
        guard(&self.grants)
            .entry(Self::group_id(group_name))
            .or_default()
            .insert(grant);
    }

    pub fn grants_of(&self, group_name: &str) -> BTreeSet<Grant> {
        guard(&self.grants)
            .get(&Self::group_id(group_name))
            .cloned()
            .unwrap_or_default()
    }

    /// Makes creates and deletes for this group and tenant fail with HTTP 400.
    pub fn fail_on(&self, group_name: &str, tenant: &str) {
        guard(&self.failing).insert((Self::group_id(group_name), tenant.to_string()));
    }

    pub fn set_catalog(&self, names: &[&str]) {
        *guard(&self.catalog) = names
            .iter()
            .map(|name| PermissionDescriptor { name: name.to_string(), description: None })
            .collect();
    }

    pub fn set_tenants(&self, ids: &[&str]) {
        *guard(&self.tenants) = ids
            .iter()
            .map(|id| Tenant { id: id.to_string(), name: id.to_string() })
            .collect();
    }

    pub fn calls(&self) -> Vec<Call> {
        guard(&self.calls).clone()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Call) -> bool,
    {
        guard(&self.calls).iter().filter(|call| predicate(call)).count()
    }

    pub fn write_calls(&self) -> usize {
        self.count(|call| matches!(call, Call::CreateGrants { .. } | Call::DeleteGrant { .. }))
    }

    fn record(&self, call: Call) {
        guard(&self.calls).push(call);
    }

    fn check_failure(&self, group_id: &str, tenant: &str) -> Result<()> {
        if guard(&self.failing).contains(&(group_id.to_string(), tenant.to_string())) {
            return Err(IamError::Backend {
                status: 400,
                message: format!("rejected for tenant {}", tenant),
            });
        }
        Ok(())
    }

    fn known_group(&self, group_id: &str) -> Result<GroupDescriptor> {
        guard(&self.groups)
            .iter()
            .find(|group| group.uuid == group_id)
            .cloned()
            .ok_or_else(|| IamError::Backend {
                status: 404,
                message: format!("group {} not found", group_id),
            })
    }
}

#[async_trait]
impl IamBackend for FakeBackend {
    async fn list_groups(&self) -> Result<Vec<GroupDescriptor>> {
        self.record(Call::ListGroups);
        Ok(guard(&self.groups).clone())
    }

    async fn group_permissions(&self, group_id: &str) -> Result<GroupPermissions> {
        self.record(Call::GroupPermissions(group_id.to_string()));
        let group = self.known_group(group_id)?;
        let permissions = guard(&self.grants)
            .get(group_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        Ok(GroupPermissions {
            uuid: group.uuid,
            name: group.name,
            permissions,
        })
    }

    async fn create_grants(&self, group_id: &str, grants: &[Grant]) -> Result<()> {
        self.record(Call::CreateGrants {
            group_id: group_id.to_string(),
            grants: grants.to_vec(),
        });
        self.known_group(group_id)?;
        for grant in grants {
            self.check_failure(group_id, &grant.scope)?;
        }
        guard(&self.grants)
            .entry(group_id.to_string())
            .or_default()
            .extend(grants.iter().cloned());
        Ok(())
    }

    async fn delete_grant(&self, group_id: &str, grant: &Grant) -> Result<()> {
        self.record(Call::DeleteGrant {
            group_id: group_id.to_string(),
            grant: grant.clone(),
        });
        self.known_group(group_id)?;
        self.check_failure(group_id, &grant.scope)?;
        if let Some(set) = guard(&self.grants).get_mut(group_id) {
            set.remove(grant);
        }
        Ok(())
    }

    async fn permission_catalog(&self) -> Result<Vec<PermissionDescriptor>> {
        self.record(Call::PermissionCatalog);
        Ok(guard(&self.catalog).clone())
    }

    async fn tenants(&self) -> Result<Vec<Tenant>> {
        self.record(Call::Tenants);
        Ok(guard(&self.tenants).clone())
    }
}
