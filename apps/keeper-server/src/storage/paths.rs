// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path layout under the data directory.

use std::path::{Path, PathBuf};

use super::Namespace;

/// Default data directory, relative to the working directory.
pub const DATA_ROOT: &str = "./data";

/// File name of the embedded database.
pub const DATABASE_FILE: &str = "keeper.redb";

/// Storage path utilities for the data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the redb database file.
    pub fn database(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    // ========== Upload Paths ==========

    /// Directory containing every user's uploads.
    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    /// Upload directory of one namespace. Namespaces are filesystem-safe.
    pub fn user_uploads_dir(&self, ns: &Namespace) -> PathBuf {
        self.uploads_dir().join(ns.as_str())
    }

    /// Destination of an upload with server-chosen `file_id`.
    pub fn upload_file(&self, ns: &Namespace, file_id: &str) -> PathBuf {
        self.user_uploads_dir(ns).join(file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = StoragePaths::default();
        assert_eq!(paths.root(), Path::new("./data"));
        assert_eq!(paths.database(), PathBuf::from("./data/keeper.redb"));
        assert_eq!(paths.uploads_dir(), PathBuf::from("./data/uploads"));
    }

    #[test]
    fn test_upload_paths_are_namespaced() {
        let paths = StoragePaths::new("/srv/keeper");
        let ns = Namespace::for_user("../evil");

        let dir = paths.user_uploads_dir(&ns);
        assert_eq!(dir, PathBuf::from("/srv/keeper/uploads/id_2E_2E_2Fevil"));
        assert_eq!(paths.upload_file(&ns, "abc"), dir.join("abc"));
        assert!(dir.starts_with(paths.uploads_dir()));
    }
}
