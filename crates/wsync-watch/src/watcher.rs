//! Recursive workspace watcher.
//!
//! Uses the notify crate and forwards every reported path into a bounded
//! channel. The OS callback never blocks: when the channel is full the event
//! is dropped and the next `git add --all` still picks the change up.

use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};
use wsync_fs::NormalizedPath;

use crate::{RawEvent, RawEventKind, Result};

/// Capacity of the channel between the OS callback and the aggregator.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Create the bounded channel a [`ChangeWatcher`] feeds.
pub fn event_channel() -> (SyncSender<RawEvent>, Receiver<RawEvent>) {
    sync_channel(EVENT_CHANNEL_CAPACITY)
}

/// Watches a workspace directory recursively.
///
/// Dropping or closing the watcher releases the OS resources and drops the
/// sending half of the channel, which lets the consuming loop observe the
/// disconnect and exit.
pub struct ChangeWatcher {
    root: NormalizedPath,
    watcher: Option<RecommendedWatcher>,
}

impl ChangeWatcher {
    /// Begin recursive observation of `root`, delivering events to `sink`.
    pub fn watch(root: &NormalizedPath, sink: SyncSender<RawEvent>) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for raw in translate(event) {
                    debug!(path = %raw.path.display(), kind = ?raw.kind, "Raw event");
                    match sink.try_send(raw) {
                        Ok(()) => {}
                        Err(TrySendError::Full(dropped)) => {
                            warn!(path = %dropped.path.display(), "Event channel full, dropping event");
                        }
                        Err(TrySendError::Disconnected(_)) => {}
                    }
                }
            }
            Err(e) => warn!(error = %e, "Watch error"),
        })?;

        watcher.watch(&root.to_native(), RecursiveMode::Recursive)?;

        info!(root = %root, "Watching workspace for changes");

        Ok(Self {
            root: root.clone(),
            watcher: Some(watcher),
        })
    }

    /// Release the OS watch. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.root.to_native()) {
                debug!(root = %self.root, error = %e, "Unwatch failed");
            }
            info!(root = %self.root, "Stopped watching workspace");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.watcher.is_none()
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Map one notify event onto raw events, one per reported path.
fn translate(event: Event) -> Vec<RawEvent> {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let mut paths = event.paths.into_iter();
            let mut out = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                out.push(RawEvent::new(from, RawEventKind::Removed));
            }
            if let Some(to) = paths.next() {
                out.push(RawEvent::new(to, RawEventKind::Created));
            }
            out
        }
        kind => {
            let raw_kind = classify(kind);
            event
                .paths
                .into_iter()
                .map(|path| RawEvent::new(path, raw_kind))
                .collect()
        }
    }
}

fn classify(kind: EventKind) -> RawEventKind {
    match kind {
        EventKind::Create(_) => RawEventKind::Created,
        EventKind::Remove(_) => RawEventKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => RawEventKind::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => RawEventKind::Created,
        EventKind::Modify(_) | EventKind::Any => RawEventKind::Modified,
        EventKind::Access(_) | EventKind::Other => RawEventKind::Other,
    }
}
