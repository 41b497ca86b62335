//! Raw filesystem events as the dispatcher sees them.

use std::path::PathBuf;

use notify::event::ModifyKind;

/// Operation kind, reduced to what the debouncer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Written,
    Other,
}

impl EventKind {
    /// Created and Written arm or reset a timer; everything else is ignored.
    pub fn qualifies(self) -> bool {
        matches!(self, EventKind::Created | EventKind::Written)
    }
}

impl From<&notify::EventKind> for EventKind {
    fn from(kind: &notify::EventKind) -> Self {
        match kind {
            notify::EventKind::Create(_) => EventKind::Created,
            // Some backends only report Modify(Any) for content writes.
            notify::EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => EventKind::Written,
            _ => EventKind::Other,
        }
    }
}

/// One path + operation pair from the event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Split a notify event into one RawEvent per affected path.
    pub fn from_notify(event: notify::Event) -> Vec<RawEvent> {
        let kind = EventKind::from(&event.kind);
        event
            .paths
            .into_iter()
            .map(|path| RawEvent { path, kind })
            .collect()
    }
}
