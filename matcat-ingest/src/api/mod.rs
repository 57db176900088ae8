//! HTTP API handlers for matcat-ingest
//!
//! REST + SSE surface for the ingestion pipeline.

pub mod health;
pub mod parameters;
pub mod queue;
pub mod sessions;
pub mod sse;
pub mod submissions;

pub use health::health_routes;
pub use parameters::parameter_routes;
pub use queue::queue_routes;
pub use sessions::session_routes;
pub use sse::event_stream;
pub use submissions::submission_routes;
