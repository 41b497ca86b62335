//! Per-path debounce of raw filesystem events.
//!
//! Every qualifying event for a path pushes that path's deadline to
//! `now + settle`. One timer task per pending path sleeps until the deadline;
//! when it wakes and the deadline hasn't moved, the path is removed from the
//! registry and handed to the [`SettledHandler`] on the blocking pool.
//!
//! All registry access happens under one lock, which is never held while the
//! handler runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::event::RawEvent;

/// Receives each settled path exactly once per burst.
///
/// Runs on tokio's blocking pool, so it may do synchronous file I/O.
pub trait SettledHandler: Send + Sync + 'static {
    fn on_settled(&self, path: PathBuf);
}

/// Timing knobs for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceSettings {
    /// Quiet period required after the last event before a path fires.
    pub settle: Duration,
    /// Upper bound on how long a burst may keep postponing its dispatch,
    /// measured from the first event. `None` means no bound: a path that never
    /// goes quiet never fires.
    pub max_wait: Option<Duration>,
}

impl DebounceSettings {
    pub fn new(settle: Duration) -> Self {
        Self {
            settle,
            max_wait: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    fn deadline(&self, first_seen: Instant, now: Instant) -> Instant {
        let quiet = now + self.settle;
        match self.max_wait {
            Some(max) => quiet.min(first_seen + max),
            None => quiet,
        }
    }
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

#[derive(Debug)]
struct PendingTimer {
    deadline: Instant,
    first_seen: Instant,
    events: u32,
}

enum TimerCheck {
    Fire(PendingTimer),
    Wait(Instant),
    Gone,
}

struct Inner {
    settings: DebounceSettings,
    registry: Mutex<HashMap<PathBuf, PendingTimer>>,
    handler: Arc<dyn SettledHandler>,
}

impl Inner {
    /// Called by a timer task once its deadline has passed.
    fn check(&self, path: &Path) -> TimerCheck {
        let mut registry = self.registry.lock();
        let deadline = match registry.get(path) {
            Some(pending) => pending.deadline,
            None => return TimerCheck::Gone,
        };
        if deadline > Instant::now() {
            return TimerCheck::Wait(deadline);
        }
        match registry.remove(path) {
            Some(pending) => TimerCheck::Fire(pending),
            None => TimerCheck::Gone,
        }
    }
}

/// Collapses bursts of events per path into single settled dispatches.
///
/// Cheap to clone; clones share one registry.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(settings: DebounceSettings, handler: Arc<dyn SettledHandler>) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                registry: Mutex::new(HashMap::new()),
                handler,
            }),
        }
    }

    pub fn settings(&self) -> DebounceSettings {
        self.inner.settings
    }

    /// Feed one raw event. Must be called from within a tokio runtime.
    ///
    /// Non-qualifying kinds are dropped. The first qualifying event for a path
    /// arms its timer; later ones push the same timer's deadline back.
    pub fn observe(&self, event: RawEvent) {
        if !event.kind.qualifies() {
            log::trace!("ignoring {:?} for {}", event.kind, event.path.display());
            return;
        }

        let now = Instant::now();
        let armed = {
            let mut registry = self.inner.registry.lock();
            match registry.get_mut(&event.path) {
                Some(pending) => {
                    pending.deadline = self.inner.settings.deadline(pending.first_seen, now);
                    pending.events += 1;
                    log::trace!("reset timer for {} ({} events)", event.path.display(), pending.events);
                    None
                }
                None => {
                    let deadline = self.inner.settings.deadline(now, now);
                    registry.insert(
                        event.path.clone(),
                        PendingTimer {
                            deadline,
                            first_seen: now,
                            events: 1,
                        },
                    );
                    Some(deadline)
                }
            }
        };

        if let Some(deadline) = armed {
            log::debug!("armed timer for {}", event.path.display());
            tokio::spawn(run_timer(self.inner.clone(), event.path, deadline));
        }
    }

    /// Number of paths with an armed timer.
    pub fn pending_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.inner.registry.lock().contains_key(path)
    }
}

async fn run_timer(inner: Arc<Inner>, path: PathBuf, mut deadline: Instant) {
    let pending = loop {
        tokio::time::sleep_until(deadline).await;
        match inner.check(&path) {
            TimerCheck::Fire(pending) => break pending,
            TimerCheck::Wait(next) => deadline = next,
            TimerCheck::Gone => return,
        }
    };

    log::debug!(
        "{} settled after {} event(s) over {:?}",
        path.display(),
        pending.events,
        pending.deadline.saturating_duration_since(pending.first_seen)
    );

    let handler = inner.handler.clone();
    let shown = path.display().to_string();
    if let Err(e) = tokio::task::spawn_blocking(move || handler.on_settled(path)).await {
        log::error!("settled handler for {} failed: {}", shown, e);
    }
}
