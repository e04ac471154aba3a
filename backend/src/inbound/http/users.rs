//! Account registration and session endpoints.
//!
//! ```text
//! POST /api/register  Create an account
//! POST /api/login     Verify credentials and start a session
//! POST /api/logout    Drop the session
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};

use crate::domain::auth::{Credentials, CredentialsValidationError};
use crate::domain::{Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Credentials payload shared by registration and login.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsRequest {
    /// Account name, unique per deployment.
    pub username: String,
    /// Plain-text password; hashed before storage, never logged.
    pub password: String,
}

/// Body returned on successful registration or login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// The account's id.
    pub id: UserId,
}

fn parse_credentials(request: CredentialsRequest) -> Result<Credentials, Error> {
    Credentials::try_from_parts(&request.username, &request.password).map_err(|error| {
        match error {
            CredentialsValidationError::EmptyUsername => {
                Error::invalid_request("username must not be empty")
            }
            CredentialsValidationError::EmptyPassword => {
                Error::invalid_request("password must not be empty")
            }
        }
    })
}

/// Create an account and log the new user straight in.
///
/// # Errors
/// `400` for empty fields, `409` when the username is taken.
#[post("/register")]
pub async fn register(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CredentialsRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = parse_credentials(payload.into_inner())?;
    let id = state.identity.register(&credentials).await?;
    session.persist_user(id)?;
    Ok(HttpResponse::Created().json(AccountResponse { id }))
}

/// Verify credentials and persist the user id in the session cookie.
///
/// # Errors
/// `400` for empty fields, `401` for bad credentials.
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CredentialsRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = parse_credentials(payload.into_inner())?;
    let id = state.identity.authenticate(&credentials).await?;
    session.persist_user(id)?;
    Ok(HttpResponse::Ok().json(AccountResponse { id }))
}

/// Drop the session. Always succeeds, logged in or not.
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::Ok().finish()
}
