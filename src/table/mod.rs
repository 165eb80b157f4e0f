//! Tabular input and output for the snapping pipeline.
//!
//! This module loads the coordinate CSV into memory, partitions its rows into
//! bounded batches, and writes the augmented table back out atomically so a
//! failed run never leaves a half-written output file behind.

mod atomic_writer;
mod batcher;
mod loader;
mod model;
mod writer;

pub use atomic_writer::AtomicCsvWriter;
pub use batcher::{split_batches, Batch, BatchSize};
pub use loader::load_table;
pub use model::{Coordinate, SnappedPoint, Table};
pub use writer::write_snapped_table;
