//! Directory listing projection.

use serde::Serialize;

/// Read-only projection of one directory entry.
///
/// Derived on demand from the filesystem; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Entry name within its parent directory.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Size in bytes as reported by the filesystem.
    pub size_bytes: u64,
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[test]
    fn serialises_camel_case() {
        let entry = DirectoryEntry {
            name: "report.txt".to_owned(),
            is_dir: false,
            size_bytes: 12,
        };
        let value = serde_json::to_value(&entry).expect("serialise");
        assert_eq!(value["name"], "report.txt");
        assert_eq!(value["isDir"], false);
        assert_eq!(value["sizeBytes"], 12);
    }
}
