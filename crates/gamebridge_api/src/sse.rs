//! Server-sent-event frame encoding for the live stream.
//!
//! Each pushed message is `event: <name>\n` + `data: <one-line JSON>\n\n`.
//! When a subscriber's poll times out, the stream yields a comment frame
//! instead, which browsers ignore but which keeps the connection alive
//! through proxies.

use gamebridge_live::{BusEvent, LiveBus, Subscriber};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// The keep-alive comment frame sent on poll timeout.
pub const KEEP_ALIVE_FRAME: &str = ": keep-alive\n\n";

/// Encodes one event as an SSE frame.
///
/// `serde_json` never emits raw newlines, so the data line cannot break
/// the framing.
pub fn event_frame(event: &BusEvent) -> String {
    format!("event: {}\ndata: {}\n\n", event.name, event.data)
}

/// The greeting frame sent once per connection.
pub fn hello_frame() -> String {
    event_frame(&BusEvent {
        name: "hello".to_string(),
        data: json!({"ok": true}),
    })
}

/// One live streaming connection.
///
/// Subscribes on creation and unsubscribes on drop, mirroring the
/// connection lifetime of the transport that owns it.
pub struct LiveStream {
    bus: Arc<LiveBus>,
    subscriber: Subscriber,
    keep_alive: Duration,
}

impl LiveStream {
    /// Default poll timeout before a keep-alive frame is emitted.
    pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);

    /// Subscribes a new stream on the bus.
    pub fn subscribe(bus: Arc<LiveBus>) -> Self {
        let subscriber = bus.subscribe();
        Self {
            bus,
            subscriber,
            keep_alive: Self::DEFAULT_KEEP_ALIVE,
        }
    }

    /// Overrides the keep-alive timeout.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// The underlying subscriber id.
    pub fn id(&self) -> u64 {
        self.subscriber.id()
    }

    /// Blocks for the next frame: an event frame, or the keep-alive
    /// comment when the poll times out.
    pub fn next_frame(&self) -> String {
        match self.subscriber.poll(self.keep_alive) {
            Some(event) => event_frame(&event),
            None => KEEP_ALIVE_FRAME.to_string(),
        }
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.subscriber.id());
    }
}
