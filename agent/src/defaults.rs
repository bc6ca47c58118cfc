use std::path::{Path, PathBuf};
use std::sync::Arc;
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use common::{Grant, Role};
use crate::error::{IamError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefaults {
    pub permissions: Vec<String>,
}

/// Desired permissions per role, applied to every listed tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsDocument {
    pub tenants: Vec<String>,
    #[serde(rename = "PowerUsers")]
    pub power_users: RoleDefaults,
    #[serde(rename = "Users")]
    pub users: RoleDefaults,
}

impl DefaultsDocument {
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| IamError::Config(format!("malformed defaults document: {}", e)))
    }

    pub fn permissions(&self, role: Role) -> &[String] {
        match role {
            Role::PowerUsers => &self.power_users.permissions,
            Role::Users => &self.users.permissions,
        }
    }

    pub fn grants_for(&self, role: Role, tenant: &str) -> Vec<Grant> {
        self.permissions(role)
            .iter()
            .map(|permission| Grant::tenant(permission.as_str(), tenant))
            .collect()
    }
}

/// Lazily loaded defaults document. Stays cached until `reload`.
pub struct DefaultsStore {
    path: Option<PathBuf>,
    document: Mutex<Option<Arc<DefaultsDocument>>>,
}

impl DefaultsStore {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            document: Mutex::new(None),
        }
    }

    pub fn from_document(document: DefaultsDocument) -> Self {
        Self {
            path: None,
            document: Mutex::new(Some(Arc::new(document))),
        }
    }

    pub async fn get(&self) -> Result<Arc<DefaultsDocument>> {
        let mut slot = self.document.lock().await;
        if let Some(document) = slot.as_ref() {
            return Ok(document.clone());
        }
        let document = Arc::new(self.read()?);
        *slot = Some(document.clone());
        Ok(document)
    }

    /// Re-reads the file. An in-memory document is kept as is.
    pub async fn reload(&self) -> Result<Arc<DefaultsDocument>> {
        if self.path.is_some() {
            self.document.lock().await.take();
        }
        self.get().await
    }

    fn read(&self) -> Result<DefaultsDocument> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| IamError::Config("no defaults document configured".to_string()))?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            IamError::Config(format!("cannot read defaults {}: {}", path.display(), e))
        })?;
        let document = DefaultsDocument::parse(&content)?;
        info!(
            "Loaded defaults from {} ({} tenants)",
            path.display(),
            document.tenants.len()
        );
        Ok(document)
    }
}
