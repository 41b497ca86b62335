//! Folder watcher: debounce raw events per path and convert settled WebP files.
//!
//! Uses the notify crate to watch the roots, debounces events in
//! [`Dispatcher`], and for each settled path runs [`ConversionHandler`]:
//! filter, convert, log, notify.

mod dispatcher;
mod event;
mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::convert::convert;
use crate::error::{ConvertError, Result};
use crate::filter::is_convertible;
use crate::notifier::{converted_message, Notifier};

pub use dispatcher::{DebounceSettings, Dispatcher, SettledHandler};
pub use event::{EventKind, RawEvent};
pub use watcher::EventSource;

/// Settled-path callback: filter, convert, log the outcome, notify on success.
pub struct ConversionHandler {
    notifier: Arc<dyn Notifier>,
    title: String,
}

impl ConversionHandler {
    pub fn new(notifier: Arc<dyn Notifier>, title: impl Into<String>) -> Self {
        Self {
            notifier,
            title: title.into(),
        }
    }

    /// Handle one settled path. Returns `None` when the path isn't a WebP file.
    pub fn process(&self, path: &Path) -> Option<std::result::Result<PathBuf, ConvertError>> {
        if !is_convertible(path) {
            log::trace!("skip {} (not webp)", path.display());
            return None;
        }

        let start = Instant::now();
        let outcome = convert(path);
        match &outcome {
            Ok(output) => {
                log::info!(
                    "Successfully converted {} to {} in {:?}",
                    path.display(),
                    output.display(),
                    start.elapsed()
                );
                if let Err(e) = self.notifier.notify(&self.title, &converted_message(path)) {
                    log::warn!("notification for {} failed: {}", path.display(), e);
                }
            }
            Err(e) => log::error!("Conversion error: {}", e),
        }
        Some(outcome)
    }
}

impl SettledHandler for ConversionHandler {
    fn on_settled(&self, path: PathBuf) {
        self.process(&path);
    }
}

/// Pump raw events into the dispatcher until either channel closes.
///
/// Transport errors are logged and the loop keeps going. Timers still armed
/// when the loop exits are abandoned.
pub async fn run_loop(
    mut events: UnboundedReceiver<RawEvent>,
    mut errors: UnboundedReceiver<notify::Error>,
    dispatcher: &Dispatcher,
) {
    loop {
        tokio::select! {
            err = errors.recv() => match err {
                Some(e) => log::warn!("watcher error: {}", e),
                None => break,
            },
            ev = events.recv() => match ev {
                Some(ev) => dispatcher.observe(ev),
                None => break,
            },
        }
    }
    log::info!(
        "event source closed ({} pending timer(s) abandoned)",
        dispatcher.pending_count()
    );
}

/// Watch `roots` and dispatch settled paths to `handler`. Returns when the
/// event source closes; callers usually race this against Ctrl+C.
pub async fn run_watcher(
    roots: &[PathBuf],
    settings: DebounceSettings,
    handler: Arc<dyn SettledHandler>,
) -> Result<()> {
    let (source, events, errors) = EventSource::new(roots)?;
    if source.roots().is_empty() {
        log::warn!("none of the {} configured root(s) could be watched", roots.len());
    }

    let dispatcher = Dispatcher::new(settings, handler);
    run_loop(events, errors, &dispatcher).await;
    drop(source);
    Ok(())
}
