//! Path resolution: the sole gate between user-supplied paths and the disk.
//!
//! Every filesystem touch in this crate goes through [`StorageRoot::resolve`];
//! no other component is allowed to construct a filesystem path from client
//! input. The resolver normalises the user path lexically *before* joining it
//! to the root, so `..` segments are collapsed against an assumed root and can
//! never rewind past it, then verifies the joined path component-wise against
//! the canonical root.
//!
//! Symbolic links are not validated beyond the operating system's own
//! resolution: a link inside the root that points outside it will be followed
//! by the OS. Hardening that is an open item, documented rather than guessed
//! at.

use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::error::StorageError;

/// The single absolute directory beyond which no resolved path may escape.
///
/// Created once at process start (the directory is created if absent and then
/// canonicalised) and immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct StorageRoot(PathBuf);

impl StorageRoot {
    /// Open (creating if necessary) and canonicalise the storage root.
    ///
    /// # Errors
    /// Propagates [`io::Error`] when the directory cannot be created or
    /// canonicalised.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self(std::fs::canonicalize(path)?))
    }

    /// The canonical absolute root directory.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }

    /// Resolve a client-supplied relative path to a confined absolute path.
    ///
    /// The user path is interpreted as rooted at the storage root regardless
    /// of any leading separator. `.` segments and redundant separators are
    /// collapsed. A `..` segment that would rewind the traversal all the way
    /// back to the root (or beyond it) fails with [`StorageError::Escape`]:
    /// such an input is an escape attempt, not a spelling of a confined path.
    ///
    /// # Errors
    /// [`StorageError::Escape`] when the input cannot be proven to stay
    /// inside the root.
    pub fn resolve(&self, user_path: &str) -> Result<ResolvedPath, StorageError> {
        let mut parts: Vec<&OsStr> = Vec::new();
        for component in Path::new(user_path).components() {
            match component {
                Component::Normal(part) => parts.push(part),
                Component::ParentDir => {
                    parts.pop();
                    if parts.is_empty() {
                        return Err(StorageError::Escape);
                    }
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }

        let relative: PathBuf = parts.iter().collect();
        let full = self.0.join(&relative);
        // Component-wise prefix check; a byte-prefix comparison would let
        // `/store` match `/storage-evil`.
        if !(full == self.0 || full.starts_with(&self.0)) {
            return Err(StorageError::Escape);
        }
        Ok(ResolvedPath { full, relative })
    }
}

/// An absolute path proven, by construction, to lie within the storage root.
///
/// Ephemeral: lives for the duration of one operation. Only
/// [`StorageRoot::resolve`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    full: PathBuf,
    relative: PathBuf,
}

impl ResolvedPath {
    /// The confined absolute path, suitable for filesystem calls.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        self.full.as_path()
    }

    /// The root-relative path, suitable for client-facing responses.
    #[must_use]
    pub fn relative(&self) -> &Path {
        self.relative.as_path()
    }

    /// Root-relative path as a string (always UTF-8: it derives from JSON
    /// input).
    #[must_use]
    pub fn relative_string(&self) -> String {
        self.relative.to_string_lossy().into_owned()
    }

    /// Final path segment, if any (the root itself has none).
    #[must_use]
    pub fn file_name(&self) -> Option<&OsStr> {
        self.relative.file_name()
    }

    /// Whether this resolved path is the storage root itself.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn root() -> (TempDir, StorageRoot) {
        let dir = TempDir::new().expect("create temp dir");
        let root = StorageRoot::open(dir.path()).expect("open root");
        (dir, root)
    }

    #[rstest]
    #[case("/docs/report.txt", "docs/report.txt")]
    #[case("docs/report.txt", "docs/report.txt")]
    #[case("//docs///report.txt", "docs/report.txt")]
    #[case("./docs/./report.txt", "docs/report.txt")]
    #[case("/docs/drafts/../report.txt", "docs/report.txt")]
    #[case("/", "")]
    #[case("", "")]
    fn confined_paths_resolve(
        root: (TempDir, StorageRoot),
        #[case] input: &str,
        #[case] expected_relative: &str,
    ) {
        let resolved = root.1.resolve(input).expect("path should resolve");
        assert_eq!(resolved.relative(), Path::new(expected_relative));
        assert!(resolved.as_path().starts_with(root.1.as_path()));
    }

    #[rstest]
    #[case("../outside.txt")]
    #[case("/../outside.txt")]
    #[case("/a/b/../../etc/passwd")]
    #[case("a/../b")]
    #[case("/docs/../../../../etc/shadow")]
    #[case("..")]
    fn escape_attempts_are_rejected(root: (TempDir, StorageRoot), #[case] input: &str) {
        let err = root.1.resolve(input).expect_err("escape must fail");
        assert!(matches!(err, StorageError::Escape));
    }

    /// Arbitrary `..` sequences either resolve inside the root or fail; they
    /// never resolve outside it.
    #[rstest]
    #[case("a/../../b")]
    #[case("a/b/c/../../../..")]
    #[case("x/./../y/../z")]
    #[case("deep/nest/../../deep/nest/file")]
    fn dotdot_never_leaves_the_root(root: (TempDir, StorageRoot), #[case] input: &str) {
        if let Ok(resolved) = root.1.resolve(input) {
            assert!(
                resolved.as_path() == root.1.as_path()
                    || resolved.as_path().starts_with(root.1.as_path())
            );
        }
    }

    /// `/store` must not be confused with a sibling `/storage-evil`: the
    /// prefix check is component-wise, not byte-wise.
    #[test]
    fn sibling_directory_with_common_prefix_is_outside() {
        let parent = TempDir::new().expect("create temp dir");
        let store = parent.path().join("store");
        std::fs::create_dir_all(parent.path().join("storage-evil")).expect("create sibling");
        let root = StorageRoot::open(&store).expect("open root");

        // The only lexical route to the sibling goes through `..`, which the
        // resolver refuses at the root boundary.
        let err = root
            .resolve("../storage-evil/payload")
            .expect_err("sibling escape must fail");
        assert!(matches!(err, StorageError::Escape));
    }

    #[test]
    fn resolved_root_reports_itself() {
        let dir = TempDir::new().expect("create temp dir");
        let root = StorageRoot::open(dir.path()).expect("open root");
        let resolved = root.resolve("/").expect("root resolves");
        assert!(resolved.is_root());
        assert_eq!(resolved.file_name(), None);
    }
}
