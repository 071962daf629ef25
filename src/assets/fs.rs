// Filesystem-backed asset store

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use super::{Asset, AssetError, AssetStore};

/// Searches root directories in order; the first root holding the asset wins,
/// so an application directory listed first overrides a shared one.
#[derive(Debug, Clone, Default)]
pub struct FsAssetStore {
    roots: Vec<PathBuf>,
}

impl FsAssetStore {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn push_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }
}

// Only plain relative names may reach the filesystem.
fn is_relative_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn find_asset(&self, name: &str) -> Result<Asset, AssetError> {
        if !is_relative_name(name) {
            return Err(AssetError::NotFound(name.to_string()));
        }

        for root in &self.roots {
            let path = root.join(name);
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(AssetError::Io {
                        name: name.to_string(),
                        source,
                    })
                }
            }

            let content = tokio::fs::read(&path).await.map_err(|source| AssetError::Io {
                name: name.to_string(),
                source,
            })?;
            return Ok(Asset {
                path: path.display().to_string(),
                content,
            });
        }

        Err(AssetError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_root_wins() {
        let app = tempfile::tempdir().unwrap();
        let shared = tempfile::tempdir().unwrap();
        std::fs::write(app.path().join("home.tmpl"), "app").unwrap();
        std::fs::write(shared.path().join("home.tmpl"), "shared").unwrap();
        std::fs::write(shared.path().join("about.tmpl"), "about").unwrap();

        let store = FsAssetStore::new([app.path(), shared.path()]);

        let home = store.find_asset("home.tmpl").await.unwrap();
        assert_eq!(home.content, b"app");
        assert!(home.path.starts_with(&app.path().display().to_string()));

        let about = store.find_asset("about.tmpl").await.unwrap();
        assert_eq!(about.content, b"about");
    }

    #[tokio::test]
    async fn test_nested_names() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("layouts")).unwrap();
        std::fs::write(root.path().join("layouts/application.tmpl"), "L").unwrap();

        let store = FsAssetStore::new([root.path()]);
        let asset = store.find_asset("layouts/application.tmpl").await.unwrap();
        assert_eq!(asset.content, b"L");
    }

    #[tokio::test]
    async fn test_missing_and_directories_are_not_found() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("layouts")).unwrap();
        let store = FsAssetStore::new([root.path()]);

        assert!(matches!(
            store.find_asset("nope.tmpl").await,
            Err(AssetError::NotFound(_))
        ));
        assert!(matches!(
            store.find_asset("layouts").await,
            Err(AssetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let root = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new([root.path().join("views")]);
        std::fs::write(root.path().join("secret.tmpl"), "x").unwrap();

        assert!(matches!(
            store.find_asset("../secret.tmpl").await,
            Err(AssetError::NotFound(_))
        ));
        assert!(matches!(
            store.find_asset("/etc/passwd").await,
            Err(AssetError::NotFound(_))
        ));
    }
}
