use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{IamError, Result};
use crate::retry::RetryPolicy;

/// Refresh tokens this long before the IAM-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);
const DEFAULT_LIFETIME_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenScope {
    #[default]
    Read,
    Write,
}

impl TokenScope {
    pub fn oauth_scope(&self) -> &'static str {
        match self {
            TokenScope::Read => "account-idm-read",
            TokenScope::Write => "account-idm-write",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.oauth_scope())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Client-credentials token source for one account.
pub struct TokenProvider {
    client: Client,
    token_url: String,
    account: String,
    client_id: String,
    client_secret: String,
    retry: RetryPolicy,
    cache: Mutex<HashMap<TokenScope, CachedToken>>,
}

impl TokenProvider {
    pub fn new(
        client: Client,
        token_url: String,
        account: String,
        client_id: String,
        client_secret: String,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            token_url,
            account,
            client_id,
            client_secret,
            retry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn resource(&self) -> String {
        format!("urn:dtaccount:{}", self.account)
    }

    pub async fn acquire(&self, scope: TokenScope) -> Result<String> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.get(&scope) {
            if token.expires_at > Instant::now() + EXPIRY_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .retry
            .run("token request", move || self.request(scope))
            .await
            .map_err(|e| match e {
                IamError::Auth(_) => e,
                other => IamError::Auth(format!("token endpoint unreachable: {}", other)),
            })?;

        let lifetime = response.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS);
        info!("Acquired {} token for account {}", scope, self.account);
        cache.insert(
            scope,
            CachedToken {
                value: response.access_token.clone(),
                expires_at: Instant::now() + Duration::from_secs(lifetime),
            },
        );
        Ok(response.access_token)
    }

    /// Forgets the cached token for `scope` so the next `acquire` fetches a new one.
    pub async fn evict(&self, scope: TokenScope) {
        if self.cache.lock().await.remove(&scope).is_some() {
            debug!("Evicted cached {} token", scope);
        }
    }

    async fn request(&self, scope: TokenScope) -> Result<TokenResponse> {
        debug!("Requesting {} token from {}", scope, self.token_url);
        let resource = self.resource();
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.oauth_scope()),
            ("resource", resource.as_str()),
        ];

        let response = self.client.post(&self.token_url).form(&form).send().await?;
        let status = response.status();
        if status.is_client_error() && status.as_u16() != 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(IamError::Auth(format!("token request rejected ({}): {}", status, body)));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IamError::Backend { status: status.as_u16(), message });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token)
    }
}
