//! Storage primitives: list, upload, rename, delete, move.
//!
//! All methods are blocking filesystem work; HTTP handlers run them under
//! `web::block` so a slow disk never stalls unrelated requests. Every path
//! argument is a client-supplied root-relative string and is resolved through
//! [`StorageRoot::resolve`] before anything touches the disk. Mutations take
//! the per-path advisory lock so overlapping operations on the same entry
//! serialise inside the process; concurrent processes still race at the OS
//! level.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex as PathMutex;
use tracing::{debug, warn};

use super::entry::DirectoryEntry;
use super::error::StorageError;
use super::locks::PathLockMap;
use super::path::{ResolvedPath, StorageRoot};

/// Reduce a client-supplied filename to its final component.
///
/// Directory components smuggled inside an upload filename (`../evil.sh`)
/// must never influence where the file lands.
fn base_name(raw: &str) -> Result<&str, StorageError> {
    Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| *name != "..")
        .ok_or(StorageError::Escape)
}

fn io_not_found(error: io::Error) -> StorageError {
    if error.kind() == io::ErrorKind::NotFound {
        StorageError::NotFound
    } else {
        StorageError::Io(error)
    }
}

/// Filesystem operations rooted at one [`StorageRoot`].
#[derive(Debug)]
pub struct Storage {
    root: StorageRoot,
    locks: PathLockMap,
}

impl Storage {
    /// Build storage operations over a root.
    #[must_use]
    pub fn new(root: StorageRoot) -> Self {
        Self {
            root,
            locks: PathLockMap::new(),
        }
    }

    /// The storage root the operations are confined to.
    #[must_use]
    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    /// List a directory as a sorted sequence of [`DirectoryEntry`] values.
    ///
    /// One directory read per call; a fresh call re-reads.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] when the directory is absent,
    /// [`StorageError::Escape`] when the path resolves out of the root.
    pub fn list(&self, dir: &str) -> Result<Vec<DirectoryEntry>, StorageError> {
        let resolved = self.root.resolve(dir)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(resolved.as_path()).map_err(io_not_found)? {
            let entry = entry?;
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(error) => {
                    // Entry vanished between readdir and stat; skip it.
                    debug!(name = %entry.file_name().to_string_lossy(), %error, "stat failed during list");
                    continue;
                }
            };
            entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: metadata.is_dir(),
                size_bytes: metadata.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Resolve the on-disk target for an upload, creating the destination
    /// directory (and ancestors) if absent.
    ///
    /// The supplied filename is reduced to its base name so directory
    /// components inside it cannot steer the write out of `dir`. Writing to
    /// the returned path overwrites any existing file of the same name; that
    /// is the one deliberate overwrite in the API.
    ///
    /// # Errors
    /// [`StorageError::Escape`] when the directory or filename resolves out
    /// of the root.
    pub fn upload_target(
        &self,
        dir: &str,
        file_name: &str,
    ) -> Result<ResolvedPath, StorageError> {
        let resolved_dir = self.root.resolve(dir)?;
        let name = base_name(file_name)?;
        fs::create_dir_all(resolved_dir.as_path())?;
        // Re-run the gate over the joined relative path; the target must
        // satisfy the same invariant as every other resolved path.
        let relative = resolved_dir.relative().join(name);
        self.root.resolve(&relative.to_string_lossy())
    }

    /// Fetch the advisory lock for a resolved target.
    ///
    /// Callers that write outside the blocking methods, such as the streamed
    /// upload handler, hold this lock for the duration of the write so the
    /// mutation serialises with rename, delete, and move on the same path.
    #[must_use]
    pub fn lock_for(&self, target: &ResolvedPath) -> Arc<PathMutex<()>> {
        self.locks.handle(target.as_path())
    }

    /// Store `content` as `file_name` inside `dir`, returning the saved
    /// root-relative path.
    ///
    /// Convenience wrapper over [`Self::upload_target`] for bodies that are
    /// already in memory; the HTTP adapter streams large bodies itself.
    ///
    /// # Errors
    /// See [`Self::upload_target`]; write failures surface as
    /// [`StorageError::Io`].
    pub fn upload(
        &self,
        dir: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<String, StorageError> {
        let target = self.upload_target(dir, file_name)?;
        let lock = self.locks.handle(target.as_path());
        let _guard = lock.blocking_lock();
        fs::write(target.as_path(), content)?;
        debug!(path = %target.relative().display(), bytes = content.len(), "stored upload");
        Ok(target.relative_string())
    }

    /// Rename an entry in place, keeping it in the same directory.
    ///
    /// `new_name` is reduced to its base name and the resulting sibling path
    /// is re-validated through the resolver. Fails with
    /// [`StorageError::Conflict`] when the sibling already exists; silent
    /// overwrite on rename is the surprising branch, so it is refused.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] when the source is absent,
    /// [`StorageError::Escape`] when either path resolves out of the root.
    pub fn rename(&self, path: &str, new_name: &str) -> Result<String, StorageError> {
        let source = self.resolve_existing_path(path)?;
        let name = base_name(new_name)?;
        let sibling_relative: PathBuf = match source.relative().parent() {
            Some(parent) => parent.join(name),
            None => return Err(StorageError::Escape),
        };
        let sibling = self.root.resolve(&sibling_relative.to_string_lossy())?;

        if source == sibling {
            // Renaming to the current name is a no-op.
            return Ok(sibling.relative_string());
        }
        let (first, second) = self.locks.handle_pair(source.as_path(), sibling.as_path());
        let _outer = first.blocking_lock();
        let _inner = second.blocking_lock();
        if sibling.as_path().symlink_metadata().is_ok() {
            return Err(StorageError::Conflict);
        }
        fs::rename(source.as_path(), sibling.as_path()).map_err(io_not_found)?;
        debug!(from = %source.relative().display(), to = %sibling.relative().display(), "renamed entry");
        Ok(sibling.relative_string())
    }

    /// Delete a file or an *empty* directory.
    ///
    /// Non-empty directories are refused with [`StorageError::NotEmpty`];
    /// there is deliberately no recursive delete.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] when the path is absent,
    /// [`StorageError::Escape`] when it resolves out of the root.
    pub fn delete(&self, path: &str) -> Result<(), StorageError> {
        let resolved = self.root.resolve(path)?;
        if resolved.is_root() {
            return Err(StorageError::Escape);
        }
        let lock = self.locks.handle(resolved.as_path());
        let _guard = lock.blocking_lock();
        let metadata = resolved
            .as_path()
            .symlink_metadata()
            .map_err(io_not_found)?;
        if metadata.is_dir() {
            if fs::read_dir(resolved.as_path())?.next().is_some() {
                return Err(StorageError::NotEmpty);
            }
            fs::remove_dir(resolved.as_path()).map_err(|error| {
                // Lost the race against a concurrent write into the dir.
                if error.kind() == io::ErrorKind::DirectoryNotEmpty {
                    StorageError::NotEmpty
                } else {
                    io_not_found(error)
                }
            })?;
        } else {
            fs::remove_file(resolved.as_path()).map_err(io_not_found)?;
        }
        debug!(path = %resolved.relative().display(), "deleted entry");
        Ok(())
    }

    /// Move an entry to a new location inside the root.
    ///
    /// A destination ending in a separator is treated as a target directory
    /// and the source's base name is appended. An atomic rename is attempted
    /// first; when it fails, files fall back to copy-then-delete while
    /// directory moves across filesystems fail with
    /// [`StorageError::CrossDevice`] rather than risking a half-copied tree.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] when the source is absent,
    /// [`StorageError::Conflict`] when the destination already exists,
    /// [`StorageError::Escape`] when either endpoint resolves out of the
    /// root.
    pub fn move_entry(&self, src: &str, dst: &str) -> Result<String, StorageError> {
        let source = self.resolve_existing_path(src)?;
        let destination_raw = if dst.ends_with('/') {
            let name = source
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or(StorageError::Escape)?;
            format!("{dst}{name}")
        } else {
            dst.to_owned()
        };
        let destination = self.root.resolve(&destination_raw)?;
        if source == destination {
            return Err(StorageError::Conflict);
        }
        if let Some(parent) = destination.as_path().parent() {
            fs::create_dir_all(parent)?;
        }

        let (first, second) = self
            .locks
            .handle_pair(source.as_path(), destination.as_path());
        let _outer = first.blocking_lock();
        let _inner = second.blocking_lock();
        if destination.as_path().symlink_metadata().is_ok() {
            return Err(StorageError::Conflict);
        }
        if let Err(error) = fs::rename(source.as_path(), destination.as_path()) {
            let source_meta = source.as_path().symlink_metadata().map_err(io_not_found)?;
            if source_meta.is_dir() {
                if error.kind() == io::ErrorKind::CrossesDevices {
                    return Err(StorageError::CrossDevice);
                }
                return Err(io_not_found(error));
            }
            warn!(%error, src = %source.relative().display(), "rename failed, copying instead");
            copy_then_delete(source.as_path(), destination.as_path())?;
        }
        debug!(from = %source.relative().display(), to = %destination.relative().display(), "moved entry");
        Ok(destination.relative_string())
    }

    /// Resolve a path that must already exist, returning its metadata too.
    ///
    /// Used by the download handlers to dispatch on file vs directory.
    ///
    /// # Errors
    /// [`StorageError::NotFound`] when absent, [`StorageError::Escape`] when
    /// the path resolves out of the root.
    pub fn resolve_existing(
        &self,
        path: &str,
    ) -> Result<(ResolvedPath, fs::Metadata), StorageError> {
        let resolved = self.root.resolve(path)?;
        let metadata = fs::metadata(resolved.as_path()).map_err(io_not_found)?;
        Ok((resolved, metadata))
    }

    /// Remove a partially written upload after an aborted stream.
    pub fn discard(&self, target: &ResolvedPath) {
        if let Err(error) = fs::remove_file(target.as_path()) {
            if error.kind() != io::ErrorKind::NotFound {
                warn!(%error, path = %target.relative().display(), "failed to discard partial upload");
            }
        }
    }

    fn resolve_existing_path(&self, path: &str) -> Result<ResolvedPath, StorageError> {
        let resolved = self.root.resolve(path)?;
        resolved
            .as_path()
            .symlink_metadata()
            .map_err(io_not_found)?;
        Ok(resolved)
    }
}

/// Cross-device fallback for files: copy, flush to stable storage, then
/// remove the source. Never applied to directories.
fn copy_then_delete(src: &Path, dst: &Path) -> Result<(), StorageError> {
    let mut reader = fs::File::open(src).map_err(io_not_found)?;
    let mut writer = fs::File::create(dst)?;
    io::copy(&mut reader, &mut writer)?;
    writer.sync_all()?;
    fs::remove_file(src)?;
    Ok(())
}
