//! Backend entry-point: wires the file storage REST endpoints.

mod server;

use std::env;
use std::sync::Arc;

use actix_web::cookie::{Key, SameSite};
use actix_web::web;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use depot::domain::{ShareRegistry, Storage, StorageRoot};
use depot::inbound::http::health::HealthState;
use depot::inbound::http::state::HttpState;
use depot::outbound::{InMemoryIdentityProvider, InMemoryShareStore};
use server::ServerConfig;

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "depot", version, about = "Networked file storage service")]
struct Args {
    /// Directory all stored files live under; created if absent.
    #[arg(short = 's', long, env = "DEPOT_STORAGE_DIR", default_value = "./storage")]
    storage_dir: String,
    /// Address and port to bind.
    #[arg(short = 'b', long, env = "DEPOT_BIND", default_value = "0.0.0.0:8080")]
    bind: std::net::SocketAddr,
    /// Hard ceiling on a single upload request body, in bytes.
    #[arg(long, env = "DEPOT_MAX_UPLOAD_BYTES", default_value_t = 300 * 1024 * 1024)]
    max_upload_bytes: u64,
    /// File holding the session signing key material.
    #[arg(
        long,
        env = "DEPOT_SESSION_KEY_FILE",
        default_value = "/var/run/secrets/session_key"
    )]
    session_key_file: String,
    /// Set the `Secure` flag on session cookies.
    #[arg(
        long,
        env = "DEPOT_COOKIE_SECURE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    cookie_secure: bool,
}

fn load_session_key(path: &str) -> std::io::Result<Key> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) => {
            let allow_dev = env::var("DEPOT_SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %path, error = %e, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(std::io::Error::other(format!(
                    "failed to read session key at {path}: {e}"
                )))
            }
        }
    }
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args = Args::parse();
    let key = load_session_key(&args.session_key_file)?;
    let root = StorageRoot::open(&args.storage_dir)
        .map_err(|e| std::io::Error::other(format!("failed to open storage root: {e}")))?;
    info!(root = %root.as_path().display(), bind = %args.bind, "starting server");

    let state = HttpState {
        identity: Arc::new(InMemoryIdentityProvider::new()),
        storage: Arc::new(Storage::new(root.clone())),
        shares: Arc::new(ShareRegistry::new(Arc::new(InMemoryShareStore::new()), root)),
        max_upload_bytes: args.max_upload_bytes,
    };

    let health_state = web::Data::new(HealthState::new());
    let config = ServerConfig::new(key, args.cookie_secure, SameSite::Lax, args.bind, state);
    let server = server::create_server(health_state, config)?;
    server.await
}
