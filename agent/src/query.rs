use log::{info, warn};

use common::{GroupKey, GroupPermissions, Role};
use crate::account::Account;
use crate::error::Result;

impl Account {
    /// Current grants of the team's role groups, power users first.
    ///
    /// Roles without a group are skipped; `None` means the team has no
    /// group at all. Grants are always fetched fresh.
    pub async fn get_permissions(&self, team: &str) -> Result<Option<Vec<GroupPermissions>>> {
        let mut found = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            let name = GroupKey::new(team, role).group_name();
            match self.directory.lookup(&name).await? {
                Some(group) => found.push(self.backend.group_permissions(&group.uuid).await?),
                None => warn!("Tried fetching non existent group {}", name),
            }
        }

        if found.is_empty() {
            return Ok(None);
        }
        info!("Obtained permissions for {} group(s) of team {}", found.len(), team);
        Ok(Some(found))
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use common::Grant;

    use crate::defaults::{DefaultsDocument, DefaultsStore};
    use crate::testing::{Call, FakeBackend};
    use super::*;

    fn account(backend: Arc<FakeBackend>) -> Account {
        let doc = DefaultsDocument::parse(
            r#"{"tenants": ["t1"], "PowerUsers": {"permissions": ["viewer"]}, "Users": {"permissions": ["viewer"]}}"#,
        )
        .unwrap();
        Account::new("acc", backend, DefaultsStore::from_document(doc))
    }

    #[tokio::test]
    async fn both_groups_are_returned_in_role_order() {
        let backend = Arc::new(FakeBackend::with_groups(&[
            "Dynatrace_acme_Users",
            "Dynatrace_acme_PowerUsers",
        ]));
        backend.seed_grant("Dynatrace_acme_PowerUsers", Grant::tenant("tenant-manage", "t1"));
        let account = account(backend);

        let groups = account.get_permissions("acme").await.unwrap().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Dynatrace_acme_PowerUsers");
        assert_eq!(groups[0].permissions, vec![Grant::tenant("tenant-manage", "t1")]);
        assert_eq!(groups[1].name, "Dynatrace_acme_Users");
        assert!(groups[1].permissions.is_empty());
    }

    #[tokio::test]
    async fn unknown_team_yields_none() {
        let backend = Arc::new(FakeBackend::with_groups(&["Dynatrace_other_Users"]));
        let account = account(backend.clone());

        assert!(account.get_permissions("acme").await.unwrap().is_none());
        assert_eq!(backend.count(|c| matches!(c, Call::GroupPermissions(_))), 0);
    }

    #[tokio::test]
    async fn single_existing_group_is_returned_alone() {
        let backend = Arc::new(FakeBackend::with_groups(&["Dynatrace_acme_Users"]));
        let account = account(backend);

        let groups = account.get_permissions("acme").await.unwrap().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Dynatrace_acme_Users");
    }

    #[tokio::test]
    async fn grants_are_visible_immediately_after_set() {
        let backend = Arc::new(FakeBackend::with_groups(&[
            "Dynatrace_acme_PowerUsers",
            "Dynatrace_acme_Users",
        ]));
        let account = account(backend);

        let before = account.get_permissions("acme").await.unwrap().unwrap();
        assert!(before[0].permissions.is_empty());

        assert!(account.set_defaults("acme").await.unwrap().is_success());

        let after = account.get_permissions("acme").await.unwrap().unwrap();
        assert_eq!(after[0].permissions, vec![Grant::tenant("viewer", "t1")]);
        assert_eq!(after[1].permissions, vec![Grant::tenant("viewer", "t1")]);
    }
}
