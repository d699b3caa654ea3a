//! # gamebridge live
//!
//! Process-wide invalidation bus for live UI updates.
//!
//! The bus delivers "something changed" signals to all currently-connected
//! observers without coupling publishers to observer lifecycle or count.
//! It is a lossy, at-most-once signal channel, not a data channel: a full
//! subscriber mailbox silently drops the event for that subscriber only,
//! and nothing survives a process restart.
//!
//! # Usage
//!
//! ```rust
//! use gamebridge_live::LiveBus;
//! use std::time::Duration;
//!
//! let bus = LiveBus::new();
//! let sub = bus.subscribe();
//!
//! bus.publish_invalidate(&["players", "bans"]);
//!
//! let event = sub.poll(Duration::from_millis(100)).unwrap();
//! assert_eq!(event.name, "invalidate");
//! bus.unsubscribe(sub.id());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bus;

pub use bus::{BusEvent, LiveBus, Subscriber, MAILBOX_CAPACITY};
