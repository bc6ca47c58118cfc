use std::fmt;
use std::sync::Arc;
use log::info;

use common::{group_name, Config, PermissionDescriptor, Role, Tenant};
use crate::backend::{HttpIamBackend, IamBackend};
use crate::defaults::DefaultsStore;
use crate::directory::GroupDirectory;
use crate::error::Result;

/// One IAM account with its group and defaults caches.
///
/// Team-level operations live in `query` (reads) and `reconcile` (writes).
pub struct Account {
    id: String,
    pub(crate) backend: Arc<dyn IamBackend>,
    pub(crate) directory: GroupDirectory,
    pub(crate) defaults: DefaultsStore,
}

impl Account {
    pub fn new(id: impl Into<String>, backend: Arc<dyn IamBackend>, defaults: DefaultsStore) -> Self {
        Self {
            id: id.into(),
            directory: GroupDirectory::new(backend.clone()),
            backend,
            defaults,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = HttpIamBackend::from_config(config)?;
        Ok(Self::new(
            config.account.uuid.clone(),
            Arc::new(backend),
            DefaultsStore::from_path(&config.defaults.path),
        ))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when at least one role group exists for the team.
    pub async fn team_exists(&self, team: &str) -> Result<bool> {
        for role in Role::ALL {
            if self.directory.exists(&group_name(team, role)).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn valid_permissions(&self) -> Result<Vec<PermissionDescriptor>> {
        self.backend.permission_catalog().await
    }

    pub async fn tenants(&self) -> Result<Vec<Tenant>> {
        self.backend.tenants().await
    }

    /// Drops the cached group list so the next lookup refetches it.
    pub async fn invalidate(&self) {
        info!("Invalidating group cache for {}", self);
        self.directory.invalidate().await;
    }

    /// Invalidates the group cache and re-reads the defaults document.
    pub async fn reload(&self) -> Result<()> {
        self.invalidate().await;
        let defaults = self.defaults.reload().await?;
        info!("Reloaded defaults: {} tenants", defaults.tenants.len());
        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DT Account: {}", self.id)
    }
}
