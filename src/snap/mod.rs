//! Road-snapping API client.
//!
//! - **`SnapTransport`** abstracts one snap request so the pipeline can run
//!   against an in-memory fake in tests
//! - **`OrsSnapClient`** talks to the OpenRouteService `/v2/snap` endpoint
//! - **Safe logging**: the API key is sent as a sensitive header and request
//!   logs carry only the URL path

pub mod client;
pub mod transport;

pub use client::{sanitize_url_for_logs, OrsSnapClient};
pub use transport::{SnapFuture, SnapTransport};
