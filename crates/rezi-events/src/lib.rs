//! Event batch wire format and async polling plumbing (§6, §10.5): a
//! backend hands the core pre-decoded, timestamp-normalized [`Event`]s via
//! an [`EventBatch`]; this crate owns the `ZREV` encode/decode and the
//! background-task abstraction a concrete backend (e.g. `rezi-terminal`)
//! uses to fill one.

mod error;
mod source;
mod wire;

pub use error::EventsError;
pub use source::{
    AsyncEventSource, CHANNEL_SEND_FAILURES, EVENT_CHANNEL_CAP, EventSourceRegistry, PROTOCOL_ERRORS, TickEventSource,
    channel, drain_batches,
};
pub use wire::{Event, EventBatch, KeyAction, KeyCode, Mods, MouseButtons, MouseEvent, MouseEventKind, TimestampTracker, decode, encode};
