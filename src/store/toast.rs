//! Transient notifications.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;
use web_time::Instant;

use crate::reactive::{Emitter, Runtime, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastKind {
    Success,
    Info,
    Error,
}

impl ToastKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Info => "info",
            ToastKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(u64);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ToastId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(ToastId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub kind: ToastKind,
    pub message: String,
    pub shown_at: Instant,
    pub duration: Duration,
}

impl Toast {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= self.duration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastEvent {
    Shown(ToastId),
    Dismissed(ToastId),
    Expired(ToastId),
}

/// Newest last. At most `max` toasts are visible; showing one more drops the
/// oldest.
#[derive(Clone)]
pub struct ToastQueue {
    toasts: Signal<Vec<Toast>>,
    events: Emitter<ToastEvent>,
    next_id: Rc<Cell<u64>>,
    duration: Duration,
    max: usize,
}

impl ToastQueue {
    pub fn new(runtime: &Runtime, duration: Duration, max: usize) -> Self {
        Self {
            toasts: runtime.signal(Vec::new()),
            events: Emitter::new(),
            next_id: Rc::new(Cell::new(1)),
            duration,
            max: max.max(1),
        }
    }

    pub fn show(&self, kind: ToastKind, message: impl Into<String>) -> ToastId {
        self.show_at(kind, message.into(), Instant::now())
    }

    pub fn success(&self, message: impl Into<String>) -> ToastId {
        self.show(ToastKind::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> ToastId {
        self.show(ToastKind::Info, message)
    }

    pub fn error(&self, message: impl Into<String>) -> ToastId {
        self.show(ToastKind::Error, message)
    }

    fn show_at(&self, kind: ToastKind, message: String, now: Instant) -> ToastId {
        let id = ToastId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let mut toasts = self.toasts.get_untracked();
        toasts.push(Toast {
            id,
            kind,
            message,
            shown_at: now,
            duration: self.duration,
        });
        let overflow = toasts.len().saturating_sub(self.max);
        let dropped: Vec<ToastId> = toasts.drain(..overflow).map(|t| t.id).collect();
        self.toasts.set(toasts);

        debug!(%id, kind = kind.as_str(), "toast shown");
        for old in dropped {
            self.events.emit(&ToastEvent::Dismissed(old));
        }
        self.events.emit(&ToastEvent::Shown(id));
        id
    }

    pub fn dismiss(&self, id: ToastId) -> bool {
        let mut removed = false;
        self.toasts.update(|toasts| {
            let before = toasts.len();
            toasts.retain(|t| t.id != id);
            removed = toasts.len() != before;
        });
        if removed {
            self.events.emit(&ToastEvent::Dismissed(id));
        }
        removed
    }

    /// Drop every toast whose duration has elapsed at `now`. Returns how many
    /// were dropped.
    pub fn expire(&self, now: Instant) -> usize {
        let mut expired = Vec::new();
        self.toasts.update(|toasts| {
            toasts.retain(|t| {
                let keep = !t.is_expired(now);
                if !keep {
                    expired.push(t.id);
                }
                keep
            });
        });
        for id in &expired {
            self.events.emit(&ToastEvent::Expired(*id));
        }
        expired.len()
    }

    pub fn clear(&self) {
        let ids: Vec<ToastId> = self.toasts.get_untracked().iter().map(|t| t.id).collect();
        self.toasts.set(Vec::new());
        for id in ids {
            self.events.emit(&ToastEvent::Dismissed(id));
        }
    }

    /// Tracked read of the visible toasts.
    pub fn visible(&self) -> Vec<Toast> {
        self.toasts.get()
    }

    pub fn len(&self) -> usize {
        self.toasts.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn events(&self) -> &Emitter<ToastEvent> {
        &self.events
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
