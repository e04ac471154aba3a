//! HTTP inbound adapter exposing the REST endpoints.
//!
//! ```text
//! POST /api/register         Create an account
//! POST /api/login            Start a session
//! POST /api/logout           End the session
//! GET  /api/list?path=       List a directory
//! POST /api/upload?path=     Upload files (multipart)
//! GET  /api/download?path=   Download a file, or a directory as a zip
//! POST /api/rename           Rename an entry in place
//! POST /api/delete           Delete a file or empty directory
//! POST /api/move             Move an entry
//! POST /api/shares           Share an entry publicly
//! GET  /api/shares           List own shares
//! POST /api/shares/revoke    Revoke a share by token or id
//! GET  /public/{token}       Fetch a shared entry without a session
//! ```

pub mod download;
pub mod error;
pub mod files;
pub mod health;
pub mod session;
pub mod shares;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use error::ApiResult;

use actix_web::web;

/// Register every route under its scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(users::register)
            .service(users::login)
            .service(users::logout)
            .service(files::list)
            .service(files::upload)
            .service(files::rename)
            .service(files::delete)
            .service(files::move_entry)
            .service(download::download)
            .service(shares::create)
            .service(shares::list)
            .service(shares::revoke),
    )
    .service(download::public_download)
    .service(health::live)
    .service(health::ready);
}
