//! Download endpoints for files and zipped directories.
//!
//! ```text
//! GET /api/download?path=   Fetch a stored entry
//! GET /public/{token}       Fetch a shared entry without a session
//! ```
//!
//! Files are served with range support via `NamedFile`; directories are
//! streamed as zip archives through an in-process duplex pipe, so the
//! archive is produced and transmitted concurrently and never buffered
//! whole.

use std::fs::Metadata;

use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpRequest, HttpResponse, get, web};
use tokio_util::io::ReaderStream;
use tracing::warn;

use crate::domain::archive::stream_zip;
use crate::domain::{Error, ResolvedPath};
use crate::inbound::http::ApiResult;
use crate::inbound::http::files::PathQuery;
use crate::inbound::http::state::HttpState;

/// Buffer between the archive writer and the response body.
const ZIP_PIPE_CAPACITY: usize = 64 * 1024;

fn attachment(filename: String) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename)],
    }
}

/// Serve `resolved` as a download: the file itself, or a zip of the
/// directory.
async fn serve_entry(
    req: &HttpRequest,
    resolved: ResolvedPath,
    metadata: &Metadata,
) -> ApiResult<HttpResponse> {
    let base_name = resolved
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned);
    if metadata.is_dir() {
        let archive_name = base_name.unwrap_or_else(|| "archive".to_owned());
        let (reader, writer) = tokio::io::duplex(ZIP_PIPE_CAPACITY);
        tokio::spawn(async move {
            if let Err(error) = stream_zip(&resolved, writer).await {
                // The pipe closes on drop; the client sees a truncated body.
                warn!(%error, dir = %resolved.relative().display(), "archive stream failed");
            }
        });
        Ok(HttpResponse::Ok()
            .content_type("application/zip")
            .insert_header(attachment(format!("{archive_name}.zip")))
            .streaming(ReaderStream::new(reader)))
    } else {
        let file = NamedFile::open_async(resolved.as_path())
            .await
            .map_err(|error| Error::internal(format!("failed to open file: {error}")))?;
        let file = match base_name {
            Some(name) => file.set_content_disposition(attachment(name)),
            None => file,
        };
        Ok(file.into_response(req))
    }
}

/// Download a stored entry.
///
/// # Errors
/// `400` for escaping paths, `404` when nothing exists at the path.
#[get("/download")]
pub async fn download(
    state: web::Data<HttpState>,
    req: HttpRequest,
    query: web::Query<PathQuery>,
) -> ApiResult<HttpResponse> {
    let storage = state.storage.clone();
    let path = query.into_inner().path;
    let (resolved, metadata) = web::block(move || storage.resolve_existing(&path))
        .await
        .map_err(|error| Error::internal(format!("blocking task failed: {error}")))?
        .map_err(Error::from)?;
    serve_entry(&req, resolved, &metadata).await
}

/// Download a shared entry by its public token. No session required.
///
/// # Errors
/// `404` for unknown or revoked tokens and for shares whose target is gone.
#[get("/public/{token}")]
pub async fn public_download(
    state: web::Data<HttpState>,
    req: HttpRequest,
    token: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let (resolved, metadata) = state.shares.resolve_target(&token).await?;
    serve_entry(&req, resolved, &metadata).await
}
