use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;

use crate::domains::export::types::ExportError;

/// The ephemeral directory tree one export call materializes and owns.
///
/// Destruction is guaranteed on every exit path: the explicit [`cleanup`]
/// call covers normal completion and archive errors, and the `Drop` impl
/// covers cancellation (a disconnecting client drops the export future) and
/// panics. The two paths share an `Option` so removal happens exactly once.
///
/// [`cleanup`]: Workspace::cleanup
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
}

impl Workspace {
    /// Create a uniquely named workspace with the static-site skeleton.
    pub async fn create(with_models: bool, with_data: bool) -> Result<Self, ExportError> {
        let dir = tempfile::Builder::new().prefix("export-").tempdir()?;
        let root = dir.path().to_path_buf();

        tokio::fs::create_dir_all(root.join("assets").join("js")).await?;
        tokio::fs::create_dir_all(root.join("assets").join("css")).await?;
        tokio::fs::create_dir_all(root.join("images")).await?;
        if with_models {
            tokio::fs::create_dir_all(root.join("assets").join("models")).await?;
        }
        if with_data {
            tokio::fs::create_dir_all(root.join("data")).await?;
        }

        debug!("Created export workspace at {}", root.display());
        Ok(Self {
            dir: Some(dir),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a workspace-relative bundle path.
    pub fn join(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Remove the workspace. Idempotent; safe to call on any exit path.
    pub fn cleanup(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => debug!("Removed export workspace {}", self.root.display()),
                Err(e) => warn!(
                    "Failed to remove export workspace {}: {}",
                    self.root.display(),
                    e
                ),
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // TempDir's own Drop removes the tree when cleanup was never reached.
        if self.dir.is_some() {
            debug!(
                "Workspace {} dropped before explicit cleanup; removing",
                self.root.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_skeleton_and_cleanup() {
        let mut ws = Workspace::create(true, true).await.unwrap();
        let root = ws.path().to_path_buf();
        assert!(root.join("assets/js").is_dir());
        assert!(root.join("assets/css").is_dir());
        assert!(root.join("images").is_dir());
        assert!(root.join("assets/models").is_dir());
        assert!(root.join("data").is_dir());

        ws.cleanup();
        assert!(!root.exists());
        // Idempotent.
        ws.cleanup();
    }

    #[tokio::test]
    async fn test_drop_removes_workspace() {
        let root;
        {
            let ws = Workspace::create(false, false).await.unwrap();
            root = ws.path().to_path_buf();
            assert!(!root.join("assets/models").exists());
            assert!(!root.join("data").exists());
        }
        assert!(!root.exists());
    }
}
