//! State shared by every request of one editor session.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::document::DocumentStore;

/// Open documents plus the active configuration and workspace root.
///
/// The configuration is swapped as a whole on reload; runs hold on to the
/// `Arc` they started with.
#[derive(Debug, Default)]
pub struct Session {
    pub documents: DocumentStore,
    config: RwLock<Arc<Config>>,
    root_path: RwLock<Option<PathBuf>>,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            documents: DocumentStore::new(),
            config: RwLock::new(Arc::new(config)),
            root_path: RwLock::new(None),
        }
    }

    pub async fn config(&self) -> Arc<Config> {
        Arc::clone(&*self.config.read().await)
    }

    pub async fn set_config(&self, config: Config) {
        *self.config.write().await = Arc::new(config);
    }

    /// Merge a reloaded configuration into the active one.
    pub async fn update_config(&self, update: Config) -> Arc<Config> {
        let mut guard = self.config.write().await;
        let mut merged = Config::clone(&guard);
        merged.merge_update(update);
        *guard = Arc::new(merged);
        Arc::clone(&guard)
    }

    /// Workspace root reported by the editor, or the current directory.
    pub async fn root_path(&self) -> PathBuf {
        if let Some(root) = self.root_path.read().await.as_ref() {
            return root.clone();
        }
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    pub async fn set_root_path(&self, root: PathBuf) {
        *self.root_path.write().await = Some(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_update_config_merges() {
        let session = Session::new(Config {
            log_level: 2,
            lint_debounce: Duration::from_millis(100),
            ..Default::default()
        });
        let before = session.config().await;

        let merged = session
            .update_config(Config {
                lint_debounce: Duration::from_millis(400),
                ..Default::default()
            })
            .await;

        assert_eq!(merged.log_level, 2);
        assert_eq!(merged.lint_debounce, Duration::from_millis(400));
        // runs holding the previous configuration keep seeing it
        assert_eq!(before.lint_debounce, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_root_path_defaults_to_current_dir() {
        let session = Session::default();
        assert_eq!(session.root_path().await, std::env::current_dir().unwrap());

        session.set_root_path(PathBuf::from("/work")).await;
        assert_eq!(session.root_path().await, PathBuf::from("/work"));
    }
}
