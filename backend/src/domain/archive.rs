//! Streaming zip archives of storage directories.
//!
//! A directory download never materialises the archive on disk or in memory:
//! entries are written straight into the caller's sink as they are read, so
//! the response body starts flowing while deep subtrees are still being
//! walked. Entry names use forward slashes regardless of host platform and
//! directories appear as explicit entries with a trailing slash, so empty
//! directories survive the round trip.

use std::io;
use std::path::PathBuf;

use async_zip::error::ZipError;
use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use tokio::io::AsyncWrite;
use tokio_util::compat::FuturesAsyncWriteCompatExt;
use tracing::debug;

use super::path::ResolvedPath;

/// One entry queued for the archive.
struct ArchiveEntry {
    absolute: PathBuf,
    /// Archive-internal name: forward slashes, trailing `/` for directories.
    name: String,
    is_dir: bool,
}

/// Walk `dir` depth-first, collecting entries in sorted order.
///
/// Blocking; callers run it on the blocking pool. The root directory itself
/// is not emitted. Entries that vanish mid-walk are skipped rather than
/// failing the whole archive.
fn collect_entries(root: &std::path::Path) -> io::Result<Vec<ArchiveEntry>> {
    let mut out = Vec::new();
    let mut pending = vec![(root.to_path_buf(), String::new())];
    while let Some((dir, prefix)) = pending.pop() {
        let mut children: Vec<_> = match std::fs::read_dir(&dir) {
            Ok(iter) => iter.filter_map(Result::ok).collect(),
            Err(error) if error.kind() == io::ErrorKind::NotFound => continue,
            Err(error) => return Err(error),
        };
        children.sort_by_key(std::fs::DirEntry::file_name);
        // Reverse so that popping from `pending` preserves sorted order.
        for child in children.iter().rev() {
            let file_type = match child.file_type() {
                Ok(file_type) => file_type,
                Err(_) => continue,
            };
            let name = child.file_name().to_string_lossy().into_owned();
            let entry_name = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            if file_type.is_dir() {
                pending.push((child.path(), entry_name.clone()));
                out.push(ArchiveEntry {
                    absolute: child.path(),
                    name: format!("{entry_name}/"),
                    is_dir: true,
                });
            } else if file_type.is_file() {
                out.push(ArchiveEntry {
                    absolute: child.path(),
                    name: entry_name,
                    is_dir: false,
                });
            }
            // Symlinks and other special files are skipped.
        }
    }
    // The traversal emits parents before children but interleaves siblings
    // of different subtrees; sort by name for a stable archive layout.
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

fn zip_to_io(error: ZipError) -> io::Error {
    io::Error::other(error)
}

/// Stream `dir` into `sink` as a zip archive.
///
/// # Errors
/// Propagates filesystem errors from the walk and reads, and archive
/// serialisation failures as [`io::Error`].
pub async fn stream_zip<W>(dir: &ResolvedPath, sink: W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let root = dir.as_path().to_path_buf();
    let entries = tokio::task::spawn_blocking(move || collect_entries(&root))
        .await
        .map_err(io::Error::other)??;
    debug!(dir = %dir.relative().display(), entries = entries.len(), "streaming archive");

    let mut writer = ZipFileWriter::with_tokio(sink);
    for entry in entries {
        if entry.is_dir {
            let builder = ZipEntryBuilder::new(entry.name.into(), Compression::Stored);
            writer
                .write_entry_whole(builder, &[])
                .await
                .map_err(zip_to_io)?;
        } else {
            let builder = ZipEntryBuilder::new(entry.name.into(), Compression::Deflate);
            let entry_writer = writer
                .write_entry_stream(builder)
                .await
                .map_err(zip_to_io)?;
            let mut compat = entry_writer.compat_write();
            let mut file = tokio::fs::File::open(&entry.absolute).await?;
            tokio::io::copy(&mut file, &mut compat).await?;
            compat.into_inner().close().await.map_err(zip_to_io)?;
        }
    }
    writer.close().await.map_err(zip_to_io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::path::StorageRoot;
    use async_zip::base::read::mem::ZipFileReader;
    use std::fs;
    use tempfile::TempDir;

    async fn archive_of(dir: &ResolvedPath) -> Vec<u8> {
        let mut buffer = Vec::new();
        stream_zip(dir, &mut buffer).await.expect("stream archive");
        buffer
    }

    fn entry_names(reader: &ZipFileReader) -> Vec<String> {
        reader
            .file()
            .entries()
            .iter()
            .map(|entry| entry.filename().as_str().expect("utf-8 name").to_owned())
            .collect()
    }

    #[tokio::test]
    async fn archives_nested_tree_with_relative_names() {
        let tmp = TempDir::new().expect("temp dir");
        let root = StorageRoot::open(tmp.path()).expect("open root");
        fs::create_dir_all(tmp.path().join("project/src")).expect("mkdir");
        fs::write(tmp.path().join("project/readme.md"), b"hello").expect("write");
        fs::write(tmp.path().join("project/src/main.rs"), b"fn main() {}").expect("write");

        let dir = root.resolve("/project").expect("resolve");
        let bytes = archive_of(&dir).await;
        let reader = ZipFileReader::new(bytes).await.expect("read archive");

        assert_eq!(
            entry_names(&reader),
            vec!["readme.md", "src/", "src/main.rs"]
        );
    }

    #[tokio::test]
    async fn empty_directories_survive_as_entries() {
        let tmp = TempDir::new().expect("temp dir");
        let root = StorageRoot::open(tmp.path()).expect("open root");
        fs::create_dir_all(tmp.path().join("d/empty")).expect("mkdir");
        fs::write(tmp.path().join("d/file.txt"), b"x").expect("write");

        let dir = root.resolve("/d").expect("resolve");
        let bytes = archive_of(&dir).await;
        let reader = ZipFileReader::new(bytes).await.expect("read archive");

        assert_eq!(entry_names(&reader), vec!["empty/", "file.txt"]);
    }

    #[tokio::test]
    async fn file_contents_round_trip() {
        let tmp = TempDir::new().expect("temp dir");
        let root = StorageRoot::open(tmp.path()).expect("open root");
        fs::create_dir_all(tmp.path().join("d")).expect("mkdir");
        fs::write(tmp.path().join("d/data.bin"), b"payload bytes").expect("write");

        let dir = root.resolve("/d").expect("resolve");
        let bytes = archive_of(&dir).await;
        let mut reader = ZipFileReader::new(bytes).await.expect("read archive");

        let mut entry = reader.reader_with_entry(0).await.expect("open entry");
        let mut contents = Vec::new();
        entry
            .read_to_end_checked(&mut contents)
            .await
            .expect("read entry");
        assert_eq!(contents, b"payload bytes");
    }

    #[tokio::test]
    async fn archiving_an_empty_directory_yields_an_empty_archive() {
        let tmp = TempDir::new().expect("temp dir");
        let root = StorageRoot::open(tmp.path()).expect("open root");
        fs::create_dir_all(tmp.path().join("empty")).expect("mkdir");

        let dir = root.resolve("/empty").expect("resolve");
        let bytes = archive_of(&dir).await;
        let reader = ZipFileReader::new(bytes).await.expect("read archive");
        assert!(reader.file().entries().is_empty());
    }
}
