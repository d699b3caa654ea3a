//! # gamebridge api
//!
//! Agent- and UI-facing surface of the gamebridge backend: the stable JSON
//! wire messages, a synchronous [`RequestHandler`] dispatching to the
//! domain services, and SSE frame encoding for the live stream.
//!
//! HTTP routing, request authentication and response writing are external
//! collaborators: they deserialize a request body into one of the message
//! types here, call the matching handler method on their worker thread,
//! and serialize the returned message (or map [`ApiError::status`] to a
//! status code).

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod handler;
mod messages;
pub mod sse;

pub use error::{ApiError, ApiResult};
pub use handler::RequestHandler;
pub use messages::{
    AckRequest, BanChangeDto, BanChangesResponse, BanReportEnvelope, BanReportRequest, CommandDto,
    CommandsPollResponse, HealthResponse, MetricPointDto, MetricsHistoryResponse,
    MetricsIngestRequest, MetricsSnapshotDto, PresenceEntryDto, PresenceRequest, StatsBatchRequest,
    StatsEntryDto,
};
