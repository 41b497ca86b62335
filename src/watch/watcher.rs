//! Event source: a notify watcher feeding two channels (events and transport errors).

use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::event::RawEvent;
use crate::error::Result;

/// Owns the OS watcher. Dropping it stops the watcher, which closes both
/// channels returned by [`EventSource::new`].
pub struct EventSource {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl EventSource {
    /// Create the watcher and add each root non-recursively.
    ///
    /// Failing to create the watcher is an error; a root that can't be watched
    /// is logged and skipped.
    pub fn new(
        roots: &[PathBuf],
    ) -> Result<(Self, UnboundedReceiver<RawEvent>, UnboundedReceiver<notify::Error>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
            Ok(ev) => {
                for raw in RawEvent::from_notify(ev) {
                    let _ = event_tx.send(raw);
                }
            }
            Err(e) => {
                let _ = error_tx.send(e);
            }
        })?;

        let mut watched = Vec::with_capacity(roots.len());
        for root in roots {
            match watcher.watch(root, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    log::info!("Watching {}", root.display());
                    watched.push(root.clone());
                }
                Err(e) => log::warn!("failed to watch {}: {}", root.display(), e),
            }
        }

        Ok((
            Self {
                _watcher: watcher,
                roots: watched,
            },
            event_rx,
            error_rx,
        ))
    }

    /// Roots that were successfully added.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}
