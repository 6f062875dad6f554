//! Filesystem collaborators of the registry builder: the directory lister and
//! the manifest reader.

use crate::error::{PluginError, PluginResult};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
}

#[async_trait]
pub trait PluginSource: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    /// Immediate children of `dir`, in whatever order the platform yields them.
    async fn list_dir(&self, dir: &Path) -> PluginResult<Vec<DirEntryInfo>>;

    async fn read_manifest(&self, path: &Path) -> PluginResult<serde_json::Value>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsPluginSource;

#[async_trait]
impl PluginSource for FsPluginSource {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn list_dir(&self, dir: &Path) -> PluginResult<Vec<DirEntryInfo>> {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                PluginError::DirectoryNotFound(dir.to_path_buf())
            } else {
                PluginError::ListDir {
                    path: dir.to_path_buf(),
                    source,
                }
            }
        })?;
        let mut items = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(
                        dir = %dir.display(),
                        error = %err,
                        "stopped listing plugins directory"
                    );
                    break;
                }
            };
            // Follow symlinks so linked plugin checkouts count as directories.
            let kind = match tokio::fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_dir() => EntryKind::Directory,
                _ => EntryKind::File,
            };
            items.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        Ok(items)
    }

    async fn read_manifest(&self, path: &Path) -> PluginResult<serde_json::Value> {
        let data = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| PluginError::ManifestRead {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&data).map_err(|source| PluginError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::write(dir.path().join("README.md"), "hi").unwrap();

        let mut items = FsPluginSource.list_dir(dir.path()).await.unwrap();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            items,
            vec![
                DirEntryInfo { name: "README.md".to_string(), kind: EntryKind::File },
                DirEntryInfo { name: "alpha".to_string(), kind: EntryKind::Directory },
            ]
        );
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsPluginSource
            .list_dir(&dir.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::DirectoryNotFound(_)));
    }

    #[tokio::test]
    async fn listing_a_file_keeps_the_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plugins");
        std::fs::write(&file, "not a directory").unwrap();

        let err = FsPluginSource.list_dir(&file).await.unwrap_err();
        match err {
            PluginError::ListDir { path, source } => {
                assert_eq!(path, file);
                assert_ne!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected ListDir, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn manifest_errors_are_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");

        let err = FsPluginSource.read_manifest(&path).await.unwrap_err();
        assert!(matches!(err, PluginError::ManifestRead { .. }));

        std::fs::write(&path, "{ broken").unwrap();
        let err = FsPluginSource.read_manifest(&path).await.unwrap_err();
        assert!(matches!(err, PluginError::ManifestParse { .. }));

        std::fs::write(&path, r#"{"name": "demo"}"#).unwrap();
        let value = FsPluginSource.read_manifest(&path).await.unwrap();
        assert_eq!(value["name"], "demo");
    }
}
