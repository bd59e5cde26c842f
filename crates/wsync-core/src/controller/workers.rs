//! Background threads of one workspace.
//!
//! ```text
//! ChangeWatcher --events--> event loop --Trigger::Commit--> sync worker --> git
//!                                                  timer tick --^
//! ```
//!
//! The event loop only touches the aggregator, so a slow push never backs up
//! the OS callback. The sync worker doubles as the periodic timer and runs
//! every background git operation.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;
use wsync_watch::{ChangeWatcher, RawEvent, event_channel};

use super::shared::Shared;
use crate::{Error, Result};

/// Upper bound on how long the event loop sleeps without re-checking state.
const IDLE_POLL: Duration = Duration::from_millis(500);

const TRIGGER_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Commit,
    Shutdown,
}

/// Handles to the threads and OS watch of one controller.
#[derive(Default)]
pub(crate) struct Workers {
    watcher: Option<ChangeWatcher>,
    trigger: Option<SyncSender<Trigger>>,
    threads: Vec<JoinHandle<()>>,
}

impl Workers {
    /// Start the watcher and threads the policy asks for.
    pub(crate) fn spawn(shared: &Arc<Shared>) -> Result<Self> {
        let mut workers = Self::default();
        if !shared.policy.needs_timer() {
            return Ok(workers);
        }

        let (trigger_tx, trigger_rx) = sync_channel(TRIGGER_CAPACITY);
        workers.trigger = Some(trigger_tx.clone());

        if shared.policy.auto_commit {
            let (events_tx, events_rx) = event_channel();
            workers.watcher = Some(ChangeWatcher::watch(&shared.root, events_tx)?);

            let loop_shared = Arc::clone(shared);
            workers.threads.push(spawn_named(
                "event loop",
                format!("wsync-events-{}", shared.handle),
                move || run_event_loop(loop_shared, events_rx, trigger_tx),
            )?);
        }

        let worker_shared = Arc::clone(shared);
        workers.threads.push(spawn_named(
            "sync worker",
            format!("wsync-sync-{}", shared.handle),
            move || run_sync_worker(worker_shared, trigger_rx),
        )?);

        Ok(workers)
    }

    /// Close the watch and ask the threads to exit. Does not wait for them.
    pub(crate) fn cancel(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.close();
        }
        if let Some(trigger) = self.trigger.take() {
            // A full queue still drains into an inactive check
            let _ = trigger.try_send(Trigger::Shutdown);
        }
    }

    /// Wait for the threads to exit. Call after [`cancel`](Self::cancel).
    pub(crate) fn join(&mut self) {
        for thread in self.threads.drain(..) {
            let name = thread.thread().name().unwrap_or("worker").to_string();
            if thread.join().is_err() {
                debug!(thread = %name, "Background thread panicked");
            }
        }
    }

    pub(crate) fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(|w| !w.is_closed())
    }

    pub(crate) fn has_timer(&self) -> bool {
        self.trigger.is_some()
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn spawn_named(
    worker: &'static str,
    name: String,
    body: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name)
        .spawn(body)
        .map_err(|source| Error::Spawn { worker, source })
}

fn run_event_loop(shared: Arc<Shared>, events: Receiver<RawEvent>, trigger: SyncSender<Trigger>) {
    loop {
        let wait = shared.time_until_settled().unwrap_or(IDLE_POLL);
        match events.recv_timeout(wait) {
            Ok(first) => {
                let rest: Vec<RawEvent> = events.try_iter().collect();
                shared.ingest(std::iter::once(first).chain(rest));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if !shared.is_active() {
            break;
        }

        if shared.take_commit_signal() {
            match trigger.try_send(Trigger::Commit) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }
    debug!(handle = %shared.handle, "Event loop exited");
}

fn run_sync_worker(shared: Arc<Shared>, triggers: Receiver<Trigger>) {
    let interval = shared.policy.pull_interval();
    let mut next_tick = next_tick_after(interval);

    loop {
        let received = match next_tick {
            Some(at) => triggers.recv_timeout(at.saturating_duration_since(Instant::now())),
            // Interval beyond the clock's range: only triggers wake the worker
            None => triggers.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Trigger::Commit) => shared.auto_commit(),
            Ok(Trigger::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                shared.tick();
                next_tick = next_tick_after(interval);
            }
        }

        if !shared.is_active() {
            break;
        }
    }
    debug!(handle = %shared.handle, "Sync worker exited");
}

fn next_tick_after(interval: Duration) -> Option<Instant> {
    Instant::now().checked_add(interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_tick_is_none_past_the_clock_range() {
        assert!(next_tick_after(Duration::from_secs(u64::MAX)).is_none());
        assert!(next_tick_after(Duration::from_secs(30)).is_some());
    }
}
