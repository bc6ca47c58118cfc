use std::fmt;
use log::{debug, error, info};
use serde::Serialize;

use common::{Grant, GroupKey, Role};
use crate::account::Account;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantAction {
    Create,
    Delete,
}

impl fmt::Display for GrantAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantAction::Create => f.write_str("create"),
            GrantAction::Delete => f.write_str("delete"),
        }
    }
}

/// Result of one backend write issued during reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct GrantOutcome {
    pub action: GrantAction,
    pub group: String,
    pub tenant: String,
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GrantOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub team: String,
    pub outcomes: Vec<GrantOutcome>,
}

impl ReconcileReport {
    fn new(team: &str) -> Self {
        Self {
            team: team.to_string(),
            outcomes: Vec::new(),
        }
    }

    /// True only if every write succeeded. An empty report is a success.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(GrantOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &GrantOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    fn record(&mut self, action: GrantAction, group: &str, grants: &[Grant], result: Result<()>) {
        let tenant = grants.first().map(|g| g.scope.clone()).unwrap_or_default();
        let permissions: Vec<String> = grants.iter().map(|g| g.permission_name.clone()).collect();
        let error = match result {
            Ok(()) => {
                info!("\t{} {:?} for tenant {} on {}: ok", action, permissions, tenant, group);
                None
            }
            Err(e) => {
                error!("\tFailed to {} {:?} for tenant {} on {}: {}", action, permissions, tenant, group, e);
                Some(e.to_string())
            }
        };
        self.outcomes.push(GrantOutcome {
            action,
            group: group.to_string(),
            tenant,
            permissions,
            error,
        });
    }
}

impl Account {
    /// Grants every tenant in the defaults document the default
    /// permissions of both role groups.
    ///
    /// Both groups are resolved before any write; a missing group aborts
    /// with `GroupNotFound`. Individual write failures are recorded and
    /// processing continues.
    pub async fn set_defaults(&self, team: &str) -> Result<ReconcileReport> {
        let defaults = self.defaults.get().await?;

        let mut groups = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            let group = self.directory.resolve(&GroupKey::new(team, role).group_name()).await?;
            groups.push((role, group));
        }

        let mut report = ReconcileReport::new(team);
        for tenant in &defaults.tenants {
            for (role, group) in &groups {
                let grants = defaults.grants_for(*role, tenant);
                if grants.is_empty() {
                    debug!("No default permissions for {}, skipping tenant {}", role, tenant);
                    continue;
                }
                info!("Setting permissions for {}:", group.name);
                let result = self.backend.create_grants(&group.uuid, &grants).await;
                report.record(GrantAction::Create, &group.name, &grants, result);
            }
        }

        if report.is_success() {
            info!("Default permissions applied for team {}", team);
        } else {
            error!(
                "Default permissions for team {} incomplete: {} of {} writes failed",
                team,
                report.failures().count(),
                report.outcomes.len()
            );
        }
        Ok(report)
    }

    /// Deletes every grant currently held by the team's `role` group.
    ///
    /// A group without grants is left untouched. A missing group is
    /// `GroupNotFound`.
    pub async fn clear(&self, team: &str, role: Role) -> Result<ReconcileReport> {
        let group = self.directory.resolve(&GroupKey::new(team, role).group_name()).await?;
        let current = self.backend.group_permissions(&group.uuid).await?;

        let mut report = ReconcileReport::new(team);
        if current.permissions.is_empty() {
            info!("Group {} has no permissions, nothing to remove", group.name);
            return Ok(report);
        }

        info!("Removing permissions for {}:", group.name);
        for grant in current.permissions {
            let result = self.backend.delete_grant(&group.uuid, &grant).await;
            report.record(GrantAction::Delete, &group.name, std::slice::from_ref(&grant), result);
        }
        Ok(report)
    }
}


#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use crate::defaults::{DefaultsDocument, DefaultsStore};
    use crate::error::IamError;
    use crate::testing::{Call, FakeBackend};
    use super::*;

    const POWER: &str = "Dynatrace_acme_PowerUsers";
    const USERS: &str = "Dynatrace_acme_Users";

    fn account_with(backend: Arc<FakeBackend>, defaults: &str) -> Account {
        let doc = DefaultsDocument::parse(defaults).unwrap();
        Account::new("acc", backend, DefaultsStore::from_document(doc))
    }

    fn acme() -> Arc<FakeBackend> {
        Arc::new(FakeBackend::with_groups(&[POWER, USERS]))
    }

    const SINGLE_TENANT: &str = r#"{
        "tenants": ["t1"],
        "PowerUsers": {"permissions": ["viewer"]},
        "Users": {"permissions": ["viewer"]}
    }"#;

    #[tokio::test]
    async fn single_tenant_issues_one_create_per_role() {
        let backend = acme();
        let account = account_with(backend.clone(), SINGLE_TENANT);

        let report = account.set_defaults("acme").await.unwrap();

        assert!(report.is_success());
        let creates: Vec<Call> = backend
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::CreateGrants { .. }))
            .collect();
        assert_eq!(
            creates,
            vec![
                Call::CreateGrants {
                    group_id: FakeBackend::group_id(POWER),
                    grants: vec![Grant::tenant("viewer", "t1")],
                },
                Call::CreateGrants {
                    group_id: FakeBackend::group_id(USERS),
                    grants: vec![Grant::tenant("viewer", "t1")],
                },
            ]
        );
    }

    #[tokio::test]
    async fn applying_defaults_twice_is_idempotent() {
        let backend = acme();
        let account = account_with(
            backend.clone(),
            r#"{
                "tenants": ["t1", "t2"],
                "PowerUsers": {"permissions": ["viewer", "manage-settings"]},
                "Users": {"permissions": ["viewer"]}
            }"#,
        );

        assert!(account.set_defaults("acme").await.unwrap().is_success());
        let once: (BTreeSet<Grant>, BTreeSet<Grant>) = (backend.grants_of(POWER), backend.grants_of(USERS));
        assert!(account.set_defaults("acme").await.unwrap().is_success());

        assert_eq!(once, (backend.grants_of(POWER), backend.grants_of(USERS)));
        assert_eq!(once.0.len(), 4);
        assert_eq!(once.1.len(), 2);
    }

    #[tokio::test]
    async fn missing_group_aborts_before_any_write() {
        let backend = Arc::new(FakeBackend::with_groups(&[USERS]));
        let account = account_with(backend.clone(), SINGLE_TENANT);

        let err = account.set_defaults("acme").await.unwrap_err();

        assert!(matches!(err, IamError::GroupNotFound(name) if name == POWER));
        assert_eq!(backend.write_calls(), 0);
    }

    #[tokio::test]
    async fn partial_failure_continues_and_reports() {
        let backend = acme();
        backend.fail_on(USERS, "t1");
        let account = account_with(
            backend.clone(),
            r#"{
                "tenants": ["t1", "t2"],
                "PowerUsers": {"permissions": ["viewer"]},
                "Users": {"permissions": ["viewer"]}
            }"#,
        );

        let report = account.set_defaults("acme").await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.outcomes.len(), 4);
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].group, USERS);
        assert_eq!(failed[0].tenant, "t1");
        assert!(backend.grants_of(USERS).contains(&Grant::tenant("viewer", "t2")));
    }

    #[tokio::test]
    async fn empty_role_list_issues_no_call() {
        let backend = acme();
        let account = account_with(
            backend.clone(),
            r#"{"tenants": ["t1"], "PowerUsers": {"permissions": ["viewer"]}, "Users": {"permissions": []}}"#,
        );

        let report = account.set_defaults("acme").await.unwrap();

        assert!(report.is_success());
        assert_eq!(backend.write_calls(), 1);
    }

    #[tokio::test]
    async fn clear_deletes_every_grant() {
        let backend = acme();
        backend.seed_grant(USERS, Grant::tenant("viewer", "t1"));
        backend.seed_grant(USERS, Grant::tenant("viewer", "t2"));
        backend.seed_grant(POWER, Grant::tenant("viewer", "t1"));
        let account = account_with(backend.clone(), SINGLE_TENANT);

        let report = account.clear("acme", Role::Users).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes.iter().all(|o| o.action == GrantAction::Delete));
        assert!(backend.grants_of(USERS).is_empty());
        assert_eq!(backend.grants_of(POWER).len(), 1);
    }

    #[tokio::test]
    async fn clear_without_grants_is_a_no_op() {
        let backend = acme();
        let account = account_with(backend.clone(), SINGLE_TENANT);

        let report = account.clear("acme", Role::PowerUsers).await.unwrap();

        assert!(report.is_success());
        assert!(report.outcomes.is_empty());
        assert_eq!(backend.write_calls(), 0);
    }

    #[tokio::test]
    async fn clear_on_missing_group_is_not_found() {
        let backend = Arc::new(FakeBackend::with_groups(&[USERS]));
        let account = account_with(backend.clone(), SINGLE_TENANT);

        let err = account.clear("acme", Role::PowerUsers).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(backend.count(|c| matches!(c, Call::DeleteGrant { .. })), 0);
    }

    #[tokio::test]
    async fn clear_records_failed_deletes() {
        let backend = acme();
        backend.seed_grant(USERS, Grant::tenant("viewer", "t1"));
        backend.seed_grant(USERS, Grant::tenant("viewer", "t2"));
        backend.fail_on(USERS, "t2");
        let account = account_with(backend.clone(), SINGLE_TENANT);

        let report = account.clear("acme", Role::Users).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failures().count(), 1);
        assert_eq!(
            backend.grants_of(USERS).into_iter().collect::<Vec<_>>(),
            vec![Grant::tenant("viewer", "t2")]
        );
    }
}
