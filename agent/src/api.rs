//! HTTP façade over an [`Account`].

use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use log::{error, info, warn};
use serde_json::json;

use common::{GroupPermissions, Role};
use crate::account::Account;
use crate::error::IamError;

pub type SharedAccount = Arc<Account>;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self { status, detail: detail.into() }
    }
}

impl From<IamError> for ApiError {
    fn from(err: IamError) -> Self {
        let status = match &err {
            IamError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            IamError::InvalidRole(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, format!("Failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}", self.detail);
        } else {
            warn!("{}", self.detail);
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(account: SharedAccount) -> Router {
    Router::new()
        .route("/permissions/:team", get(get_permissions).post(set_permissions))
        .route(
            "/permissions/team/:team/group_type/:group_type",
            delete(delete_permissions),
        )
        .route("/health", get(health))
        .with_state(account)
}

async fn health(State(account): State<SharedAccount>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "account": account.id() }))
}

async fn get_permissions(
    State(account): State<SharedAccount>,
    Path(team): Path<String>,
) -> ApiResult<Json<Vec<GroupPermissions>>> {
    match account.get_permissions(&team).await {
        Ok(Some(groups)) => Ok(Json(groups)),
        Ok(None) => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Failed: no permission groups for team {}", team),
        )),
        Err(e) => Err(ApiError::new(StatusCode::NOT_FOUND, format!("Failed: {}", e))),
    }
}

async fn set_permissions(
    State(account): State<SharedAccount>,
    Path(team): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let report = account.set_defaults(&team).await?;
    if !report.is_success() {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} of {} permission writes failed", report.failures().count(), report.outcomes.len()),
        ));
    }
    info!("Permissions set for {} via API", team);
    Ok(Json(json!({ "message": format!("Permissions set for {}", team) })))
}

async fn delete_permissions(
    State(account): State<SharedAccount>,
    Path((team, group_type)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let role: Role = group_type.parse().map_err(IamError::from)?;
    let report = account.clear(&team, role).await?;
    if !report.is_success() {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} of {} permission deletes failed", report.failures().count(), report.outcomes.len()),
        ));
    }
    info!("Permissions removed for {} {} via API", team, role);
    Ok(Json(json!({ "message": format!("Permissions removed for {}", team) })))
}
