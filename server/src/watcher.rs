//! Index directory watcher.
//!
//! Any change to a JSON document under the index directory schedules a full
//! snapshot rebuild once the directory has been quiet for the debounce
//! interval. Rebuilds run on the blocking pool; queries keep answering from
//! the previous snapshot until the new one is published.

use crate::backend::FlexdexBackend;
use crate::error::ServerResult;
use flexdex_core::RefreshOutcome;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Default debounce interval in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Watches the index directory and republishes the snapshot on change.
pub struct IndexWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl IndexWatcher {
    /// Start watching the backend's index directory. Must be called from
    /// inside a tokio runtime.
    pub fn start(backend: Arc<FlexdexBackend>, debounce: Duration) -> ServerResult<Self> {
        let root = backend
            .index_dir()
            .ok_or(crate::error::ServerError::NoIndexDir)?
            .to_path_buf();
        let (tx, mut rx) = mpsc::channel::<Event>(100);

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    // Called from notify's own thread
                    let _ = tx.blocking_send(event);
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        tracing::info!("Watching {:?} for index changes", root);

        let filter_root = root.clone();
        tokio::spawn(async move {
            let mut last_change: Option<Instant> = None;

            loop {
                tokio::select! {
                    event = rx.recv() => {
                        match event {
                            Some(event) => {
                                if is_relevant(&filter_root, &event) {
                                    last_change = Some(Instant::now());
                                }
                            }
                            None => break, // Channel closed
                        }
                    }
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {
                        let quiet = last_change.map_or(false, |t| t.elapsed() >= debounce);
                        if quiet {
                            last_change = None;
                            Self::rebuild(Arc::clone(&backend)).await;
                        }
                    }
                }
            }
            tracing::debug!("Index watcher stopped");
        });

        Ok(Self {
            _watcher: watcher,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn rebuild(backend: Arc<FlexdexBackend>) {
        let worker = Arc::clone(&backend);
        match tokio::task::spawn_blocking(move || worker.reload()).await {
            Ok(Ok(RefreshOutcome::Published { generation })) => {
                backend.cache.evict_before(generation);
            }
            Ok(Ok(RefreshOutcome::Superseded { .. })) => {}
            Ok(Err(e)) => tracing::warn!("Index rebuild failed, keeping current snapshot: {}", e),
            Err(e) => tracing::error!("Index rebuild task panicked: {}", e),
        }
    }
}

fn is_relevant(root: &Path, event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| is_index_document(root, p))
}

/// A `.json` file under `root` outside hidden directories (the embedding
/// cache lives in one).
fn is_index_document(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    let hidden = relative.components().any(|c| match c {
        Component::Normal(name) => name.to_str().map_or(true, |n| n.starts_with('.')),
        _ => false,
    });
    !hidden && relative.extension().and_then(|e| e.to_str()) == Some("json")
}
