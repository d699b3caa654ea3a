//! # gamebridge testkit
//!
//! Test fixtures for the gamebridge crates.
//!
//! ```rust
//! use gamebridge_testkit::with_bridge;
//!
//! with_bridge(|bridge| {
//!     bridge.bans().ban_player("X1", "spam", None).unwrap();
//!     assert!(bridge.bans().has_active_ban("X1").unwrap());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;

pub use fixtures::*;
