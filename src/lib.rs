//! Snap CSV coordinate samples onto the road network.
//!
//! The crate reads a CSV of longitude/latitude samples and sends them in small
//! batches to the OpenRouteService snap endpoint. It writes the table back
//! with two snapped columns. See [`pipeline::run`] for the entry point.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod snap;
pub mod table;

pub use config::SnapConfig;
pub use error::AppError;
pub use pipeline::{run, Pipeline, RunReport, RunState};
