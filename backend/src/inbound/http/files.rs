//! File management endpoints: list, upload, rename, delete, move.
//!
//! Listing is open; every mutation requires a session. Storage work is
//! blocking filesystem I/O and runs on the blocking pool, except uploads,
//! which stream multipart chunks straight to disk with tokio so the body
//! never sits in memory.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use futures_util::StreamExt as _;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::domain::{Error, StorageError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Query parameter naming a root-relative path.
#[derive(Debug, Deserialize)]
pub struct PathQuery {
    /// Root-relative path; `/` or empty for the root itself.
    #[serde(default)]
    pub path: String,
}

/// Run a blocking storage closure on the blocking pool.
async fn run_blocking<T, F>(operation: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
{
    web::block(operation)
        .await
        .map_err(|error| Error::internal(format!("blocking task failed: {error}")))?
        .map_err(Error::from)
}

/// List a directory.
///
/// # Errors
/// `400` for escaping paths, `404` for a missing directory.
#[get("/list")]
pub async fn list(
    state: web::Data<HttpState>,
    query: web::Query<PathQuery>,
) -> ApiResult<HttpResponse> {
    let storage = state.storage.clone();
    let path = query.into_inner().path;
    let entries = run_blocking(move || storage.list(&path)).await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Body returned by a successful upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Root-relative paths of the stored files, in upload order.
    pub saved: Vec<String>,
}

fn over_limit(limit: u64) -> Error {
    Error::payload_too_large(format!("upload exceeds the {limit} byte limit"))
}

/// Drain a field we are not storing, still charging its bytes against the
/// ceiling so unknown fields cannot smuggle an unbounded body past it.
async fn drain_field(
    field: &mut actix_multipart::Field,
    received: &mut u64,
    limit: u64,
) -> ApiResult<()> {
    while let Some(chunk) = field.next().await {
        let Ok(chunk) = chunk else {
            break;
        };
        *received += chunk.len() as u64;
        if *received > limit {
            return Err(over_limit(limit));
        }
    }
    Ok(())
}

/// Upload one or more files into a directory.
///
/// Multipart fields named `files` are stored under their base filename;
/// other fields are drained and ignored, with their bytes still counted
/// against the ceiling. An existing file of the same name is overwritten.
/// The declared `Content-Length` is checked up front and the streamed byte
/// count is enforced as chunks arrive, so an understated header cannot
/// bypass the ceiling. Unreadable parts are skipped rather than failing the
/// whole request; files stored before the stream broke are still reported.
/// Each file write holds the target's advisory lock so a concurrent delete
/// or move of the same path cannot interleave with the stream.
///
/// # Errors
/// `401` without a session, `400` for escaping paths or when no file was
/// stored, `413` past the upload ceiling.
#[post("/upload")]
pub async fn upload(
    state: web::Data<HttpState>,
    session: SessionContext,
    request: HttpRequest,
    query: web::Query<PathQuery>,
    mut payload: Multipart,
) -> ApiResult<HttpResponse> {
    session.require_user_id()?;
    let limit = state.max_upload_bytes;
    if let Some(declared) = declared_length(&request) {
        if declared > limit {
            return Err(over_limit(limit));
        }
    }

    let dir = query.into_inner().path;
    let mut saved = Vec::new();
    let mut received: u64 = 0;
    while let Some(field) = payload.next().await {
        let mut field = match field {
            Ok(field) => field,
            Err(error) => {
                warn!(%error, "unreadable upload part, stopping");
                break;
            }
        };
        let Some(disposition) = field.content_disposition().cloned() else {
            continue;
        };
        if disposition.get_name() != Some("files") {
            drain_field(&mut field, &mut received, limit).await?;
            continue;
        }
        let Some(filename) = disposition.get_filename().map(str::to_owned) else {
            warn!("upload field without a filename, skipping");
            drain_field(&mut field, &mut received, limit).await?;
            continue;
        };

        let storage = state.storage.clone();
        let field_dir = dir.clone();
        let target =
            run_blocking(move || storage.upload_target(&field_dir, &filename)).await?;
        let lock = state.storage.lock_for(&target);
        let _guard = lock.lock().await;
        let mut file = tokio::fs::File::create(target.as_path())
            .await
            .map_err(|error| Error::internal(format!("failed to create file: {error}")))?;
        let mut broken = false;
        while let Some(chunk) = field.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(error) => {
                    warn!(%error, path = %target.relative().display(), "unreadable upload part, skipping");
                    broken = true;
                    break;
                }
            };
            received += chunk.len() as u64;
            if received > limit {
                state.storage.discard(&target);
                return Err(over_limit(limit));
            }
            if let Err(error) = file.write_all(&chunk).await {
                state.storage.discard(&target);
                return Err(Error::internal(format!("failed to write file: {error}")));
            }
        }
        if broken {
            state.storage.discard(&target);
            continue;
        }
        if let Err(error) = file.flush().await {
            state.storage.discard(&target);
            return Err(Error::internal(format!("failed to flush file: {error}")));
        }
        saved.push(target.relative_string());
    }
    if saved.is_empty() {
        return Err(Error::invalid_request("no files in upload"));
    }
    Ok(HttpResponse::Ok().json(UploadResponse { saved }))
}

fn declared_length(request: &HttpRequest) -> Option<u64> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Body for `POST /api/rename`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RenameRequest {
    /// Root-relative path of the entry to rename.
    pub path: String,
    /// New base name; directory components are stripped.
    pub new_name: String,
}

/// Body returned by rename and move: the entry's new location.
#[derive(Debug, Serialize, Deserialize)]
pub struct PathResponse {
    /// Root-relative path after the operation.
    pub path: String,
}

/// Rename an entry within its directory.
///
/// # Errors
/// `401` without a session, `404` for a missing source, `409` when the new
/// name is taken.
#[post("/rename")]
pub async fn rename(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RenameRequest>,
) -> ApiResult<HttpResponse> {
    session.require_user_id()?;
    let storage = state.storage.clone();
    let request = payload.into_inner();
    let path = run_blocking(move || storage.rename(&request.path, &request.new_name)).await?;
    Ok(HttpResponse::Ok().json(PathResponse { path }))
}

/// Body for `POST /api/delete`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteRequest {
    /// Root-relative path of the file or empty directory to remove.
    pub path: String,
}

/// Delete a file or empty directory.
///
/// # Errors
/// `401` without a session, `404` for a missing path, `409` for a non-empty
/// directory.
#[post("/delete")]
pub async fn delete(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<DeleteRequest>,
) -> ApiResult<HttpResponse> {
    session.require_user_id()?;
    let storage = state.storage.clone();
    let request = payload.into_inner();
    run_blocking(move || storage.delete(&request.path)).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Body for `POST /api/move`.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MoveRequest {
    /// Root-relative path of the entry to move.
    pub src: String,
    /// Destination path; a trailing `/` means "into this directory".
    pub dst: String,
}

/// Move an entry to a new location.
///
/// # Errors
/// `401` without a session, `404` for a missing source, `409` for an
/// occupied destination or a directory move across filesystems.
#[post("/move")]
pub async fn move_entry(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<MoveRequest>,
) -> ApiResult<HttpResponse> {
    session.require_user_id()?;
    let storage = state.storage.clone();
    let request = payload.into_inner();
    let path = run_blocking(move || storage.move_entry(&request.src, &request.dst)).await?;
    Ok(HttpResponse::Ok().json(PathResponse { path }))
}
