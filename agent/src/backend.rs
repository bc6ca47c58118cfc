use std::time::Duration;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use common::{
    Config, Grant, GroupDescriptor, GroupList, GroupPermissions, PermissionDescriptor, Tenant,
    TenantList,
};
use crate::error::{IamError, Result};
use crate::retry::RetryPolicy;
use crate::token::{TokenProvider, TokenScope};

/// The IAM operations the permission core relies on.
#[async_trait]
pub trait IamBackend: Send + Sync {
    async fn list_groups(&self) -> Result<Vec<GroupDescriptor>>;

    async fn group_permissions(&self, group_id: &str) -> Result<GroupPermissions>;

    /// Bulk create. Re-granting an existing permission is not an error.
    async fn create_grants(&self, group_id: &str, grants: &[Grant]) -> Result<()>;

    async fn delete_grant(&self, group_id: &str, grant: &Grant) -> Result<()>;

    async fn permission_catalog(&self) -> Result<Vec<PermissionDescriptor>>;

    async fn tenants(&self) -> Result<Vec<Tenant>>;
}

pub struct HttpIamBackend {
    client: Client,
    base_url: String,
    account: String,
    tokens: TokenProvider,
    retry: RetryPolicy,
}

impl HttpIamBackend {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()?;
        let retry = RetryPolicy::from_config(&config.http);
        let tokens = TokenProvider::new(
            client.clone(),
            config.endpoints.sso_url.clone(),
            config.account.uuid.clone(),
            config.account.client_id.clone(),
            config.account.client_secret.clone(),
            retry.clone(),
        );
        Ok(Self::new(client, config.endpoints.api_url.clone(), config.account.uuid.clone(), tokens, retry))
    }

    pub fn new(
        client: Client,
        base_url: String,
        account: String,
        tokens: TokenProvider,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            account,
            tokens,
            retry,
        }
    }

    fn groups_url(&self) -> String {
        format!("{}/iam/v1/accounts/{}/groups", self.base_url, self.account)
    }

    fn permissions_url(&self, group_id: &str) -> String {
        format!("{}/{}/permissions", self.groups_url(), group_id)
    }

    /// Sends with a bearer token for `scope`. A 401 evicts the cached token
    /// and the request is replayed once with a fresh one.
    async fn send<B>(&self, scope: TokenScope, build: B) -> Result<Response>
    where
        B: Fn() -> RequestBuilder + Send + Sync,
    {
        let token = self.tokens.acquire(scope).await?;
        let response = build().bearer_auth(token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check(response).await;
        }

        warn!("IAM rejected the cached {} token, requesting a new one", scope);
        self.tokens.evict(scope).await;
        let token = self.tokens.acquire(scope).await?;
        let response = build().bearer_auth(token).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(IamError::Auth(format!("{} token rejected by IAM: {}", scope, body)));
        }
        check(response).await
    }

    async fn get_json<T: DeserializeOwned + Send>(&self, operation: &str, url: String) -> Result<T> {
        let url = url.as_str();
        self.retry
            .run(operation, move || async move {
                let response = self
                    .send(TokenScope::Read, || {
                        self.client.get(url).header("accept", "application/json")
                    })
                    .await?;
                Ok(response.json::<T>().await?)
            })
            .await
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(IamError::Backend { status: status.as_u16(), message })
}

#[async_trait]
impl IamBackend for HttpIamBackend {
    async fn list_groups(&self) -> Result<Vec<GroupDescriptor>> {
        let list: GroupList = self.get_json("list groups", self.groups_url()).await?;
        info!("Fetched {} groups for account {}", list.items.len(), self.account);
        Ok(list.items)
    }

    async fn group_permissions(&self, group_id: &str) -> Result<GroupPermissions> {
        self.get_json("group permissions", self.permissions_url(group_id)).await
    }

    async fn create_grants(&self, group_id: &str, grants: &[Grant]) -> Result<()> {
        let url = self.permissions_url(group_id);
        let url = url.as_str();
        self.retry
            .run("create grants", move || async move {
                self.send(TokenScope::Write, || {
                    self.client.post(url).header("accept", "*/*").json(grants)
                })
                .await
            })
            .await?;
        debug!("Created {} grants on group {}", grants.len(), group_id);
        Ok(())
    }

    async fn delete_grant(&self, group_id: &str, grant: &Grant) -> Result<()> {
        let url = self.permissions_url(group_id);
        let query = [
            ("scope", grant.scope.as_str()),
            ("permission-name", grant.permission_name.as_str()),
            ("scope-type", grant.scope_type.as_str()),
        ];
        let url = url.as_str();
        let query = &query;
        self.retry
            .run("delete grant", move || async move {
                self.send(TokenScope::Write, || {
                    self.client.delete(url).header("accept", "*/*").query(query)
                })
                .await
            })
            .await?;
        debug!(
            "Deleted {} on {} from group {}",
            grant.permission_name, grant.scope, group_id
        );
        Ok(())
    }

    async fn permission_catalog(&self) -> Result<Vec<PermissionDescriptor>> {
        let url = format!("{}/ref/v1/account/permissions", self.base_url);
        self.get_json("permission catalog", url).await
    }

    async fn tenants(&self) -> Result<Vec<Tenant>> {
        let url = format!("{}/env/v1/accounts/{}/environments", self.base_url, self.account);
        let list: TenantList = self.get_json("list tenants", url).await?;
        Ok(list.data)
    }
}
