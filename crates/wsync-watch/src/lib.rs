//! Filesystem observation and change aggregation
//!
//! The observation path is one-directional:
//!
//! ```text
//! OS notify callback -> ChangeWatcher -> bounded channel -> ChangeAggregator
//! ```
//!
//! [`ChangeWatcher`] forwards raw events without interpreting them and never
//! blocks. [`ChangeAggregator`] filters, coalesces and debounces them into a
//! pending batch and decides when the batch is large enough to commit.

mod aggregator;
mod error;
mod event;
mod watcher;

pub use aggregator::{AUTO_COMMIT_THRESHOLD, ChangeAggregator, DEFAULT_QUIET_PERIOD};
pub use error::{Error, Result};
pub use event::{ChangeKind, PendingChange, RawEvent, RawEventKind};
pub use watcher::{ChangeWatcher, EVENT_CHANNEL_CAPACITY, event_channel};
