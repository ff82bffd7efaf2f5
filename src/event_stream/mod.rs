//! Event Stream Module
//!
//! The single outbound path of the bridge. Every canonical event is stamped
//! and offered to one bounded channel; a full channel drops the event instead
//! of blocking the source stream that produced it.

mod emitter;

pub use emitter::{Delivery, EventEmitter, EventReceiver, channel};
