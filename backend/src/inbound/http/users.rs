//! Current-user HTTP handlers.
//!
//! ```text
//! GET  /api/v1/users/me
//! POST /api/v1/users/me/record
//! GET  /api/v1/users/me/parcels
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ParcelSummary, UserIdentity, UserRecord};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Identity of the signed-in caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_landlord: bool,
    pub account_type: Option<String>,
}

impl From<&UserIdentity> for UserResponse {
    fn from(identity: &UserIdentity) -> Self {
        let metadata = identity.metadata();
        Self {
            id: identity.id().to_string(),
            email: identity.email().map(ToString::to_string),
            full_name: metadata.full_name.clone(),
            is_landlord: metadata.is_landlord,
            account_type: metadata.account_type.clone(),
        }
    }
}

/// Application-level user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRecordResponse {
    pub id: String,
    pub email: Option<String>,
}

impl From<UserRecord> for UserRecordResponse {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id().to_string(),
            email: record.email().map(ToString::to_string),
        }
    }
}

/// Parcel reference owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnedParcelResponse {
    pub id: String,
    pub title: String,
}

impl From<ParcelSummary> for OwnedParcelResponse {
    fn from(summary: ParcelSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            title: summary.title,
        }
    }
}

/// Return the identity behind the session cookie.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 503, description = "Auth provider unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "currentUser"
)]
#[get("/users/me")]
pub async fn current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<UserResponse>> {
    let handle = session.handle()?;
    let identity = state.accounts.current_user(handle.as_ref()).await?;
    Ok(web::Json(UserResponse::from(&identity)))
}

/// Make sure an application user row exists for the caller.
///
/// Idempotent: an existing row is returned unchanged.
#[utoipa::path(
    post,
    path = "/api/v1/users/me/record",
    responses(
        (status = 200, description = "User row", body = UserRecordResponse),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 503, description = "User row could not be read or created", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "ensureUserRecord"
)]
#[post("/users/me/record")]
pub async fn ensure_user_record(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let handle = session.handle()?;
    let record = state.provisioning.ensure_current_user(handle.as_ref()).await?;
    Ok(HttpResponse::Ok().json(UserRecordResponse::from(record)))
}

/// List parcels the caller has published, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/users/me/parcels",
    responses(
        (status = 200, description = "Owned parcels", body = [OwnedParcelResponse]),
        (status = 401, description = "No active session", body = ErrorSchema),
        (status = 503, description = "Parcels unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "listOwnedParcels"
)]
#[get("/users/me/parcels")]
pub async fn owned_parcels(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<OwnedParcelResponse>>> {
    let handle = session.handle()?;
    let parcels = state.parcels.list_owned(handle.as_ref()).await?;
    Ok(web::Json(
        parcels.into_iter().map(OwnedParcelResponse::from).collect(),
    ))
}
