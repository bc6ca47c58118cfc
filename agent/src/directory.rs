use std::collections::HashMap;
use std::sync::Arc;
use log::{info, warn};
use tokio::sync::Mutex;

use common::GroupDescriptor;
use crate::backend::IamBackend;
use crate::error::{IamError, Result};

/// Group name to descriptor cache, filled from the first lookup.
///
/// The map is never refreshed on its own: groups created or renamed
/// after the first fetch stay invisible until `invalidate`.
pub struct GroupDirectory {
    backend: Arc<dyn IamBackend>,
    groups: Mutex<Option<HashMap<String, GroupDescriptor>>>,
}

impl GroupDirectory {
    pub fn new(backend: Arc<dyn IamBackend>) -> Self {
        Self {
            backend,
            groups: Mutex::new(None),
        }
    }

    pub async fn lookup(&self, name: &str) -> Result<Option<GroupDescriptor>> {
        let mut slot = self.groups.lock().await;
        if slot.is_none() {
            let groups = self.backend.list_groups().await?;
            info!("Cached {} groups locally", groups.len());
            *slot = Some(
                groups
                    .into_iter()
                    .map(|group| (group.name.clone(), group))
                    .collect(),
            );
        }
        Ok(slot.as_ref().and_then(|groups| groups.get(name).cloned()))
    }

    pub async fn resolve(&self, name: &str) -> Result<GroupDescriptor> {
        match self.lookup(name).await? {
            Some(group) => Ok(group),
            None => {
                warn!("Unknown group: {}", name);
                Err(IamError::GroupNotFound(name.to_string()))
            }
        }
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.lookup(name).await?.is_some())
    }

    pub async fn is_loaded(&self) -> bool {
        self.groups.lock().await.is_some()
    }

    pub async fn invalidate(&self) {
        self.groups.lock().await.take();
    }
}
