//! Public share endpoints.
//!
//! ```text
//! POST /api/shares          Share an entry publicly
//! GET  /api/shares          List own shares
//! POST /api/shares/revoke   Revoke a share by token or id
//! ```
//!
//! Every route here requires a session; the resulting public URLs are served
//! by `download::public_download` without one.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, ShareSelector};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Body for `POST /api/shares`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreateShareRequest {
    /// Root-relative path of the entry to share.
    pub path: String,
}

/// Create a share for an existing entry.
///
/// The response includes the token; clients build the public URL as
/// `/public/{token}`.
///
/// # Errors
/// `401` without a session, `404` when the target does not exist.
#[post("/shares")]
pub async fn create(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateShareRequest>,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    let share = state.shares.create(owner, &payload.path).await?;
    Ok(HttpResponse::Created().json(share))
}

/// List the caller's shares, newest first. Revoked shares are included with
/// `active: false`.
///
/// # Errors
/// `401` without a session.
#[get("/shares")]
pub async fn list(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    let shares = state.shares.list_for(owner).await?;
    Ok(HttpResponse::Ok().json(shares))
}

/// Body for `POST /api/shares/revoke`: exactly one selector is required,
/// `token` winning when both are present.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RevokeRequest {
    /// Revoke by public token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Revoke by share id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

/// Body returned by a revocation.
#[derive(Debug, Serialize, Deserialize)]
pub struct RevokeResponse {
    /// Whether a share was actually deactivated.
    pub revoked: bool,
}

/// Revoke one of the caller's shares.
///
/// Revoking an unknown, already-revoked, or foreign share reports
/// `revoked: false` rather than failing.
///
/// # Errors
/// `400` when neither selector is supplied, `401` without a session.
#[post("/shares/revoke")]
pub async fn revoke(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RevokeRequest>,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    let request = payload.into_inner();
    let selector = match (request.token, request.id) {
        (Some(token), _) => ShareSelector::Token(token),
        (None, Some(id)) => ShareSelector::Id(id),
        (None, None) => {
            return Err(Error::invalid_request("either token or id is required"));
        }
    };
    let revoked = state.shares.revoke(&selector, owner).await?;
    Ok(HttpResponse::Ok().json(RevokeResponse { revoked }))
}
