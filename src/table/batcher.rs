//! Order-preserving batch partitioning.
//!
//! Splits the table's coordinates into contiguous, non-overlapping batches of
//! at most `batch_size` points. Every batch but the last is full.

use crate::error::AppError;
use crate::table::model::Coordinate;

/// Batch size presets for snap API requests.
///
/// The public ORS snap endpoint rejects large location lists, so the default
/// stays small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchSize {
    /// 10 points per request
    #[default]
    ExtraSmall,
    /// 50 points per request
    Small,
    /// 100 points per request
    Medium,
    /// Custom point count
    Custom(u32),
}

impl BatchSize {
    /// Returns the batch size as a usize.
    pub fn as_usize(self) -> usize {
        match self {
            BatchSize::ExtraSmall => 10,
            BatchSize::Small => 50,
            BatchSize::Medium => 100,
            BatchSize::Custom(n) => n as usize,
        }
    }

    /// Maps a raw count onto a preset when one matches.
    pub fn from_count(n: u32) -> Self {
        match n {
            10 => BatchSize::ExtraSmall,
            50 => BatchSize::Small,
            100 => BatchSize::Medium,
            n => BatchSize::Custom(n),
        }
    }
}

impl From<BatchSize> for usize {
    fn from(batch_size: BatchSize) -> Self {
        batch_size.as_usize()
    }
}

/// One contiguous slice of the table, sent in a single request.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// 0-based position of this batch.
    pub index: usize,
    /// Table row index of the first point.
    pub start_row: usize,
    pub points: &'a [Coordinate],
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Table row index of the last point (inclusive).
    pub fn end_row(&self) -> usize {
        self.start_row + self.points.len().saturating_sub(1)
    }
}

/// Splits `points` into `ceil(len / batch_size)` batches in row order.
///
/// An empty slice yields no batches.
///
/// # Errors
///
/// Returns `AppError::Configuration` if `batch_size` is zero.
pub fn split_batches(points: &[Coordinate], batch_size: BatchSize) -> Result<Vec<Batch<'_>>, AppError> {
    let size = batch_size.as_usize();
    if size == 0 {
        return Err(AppError::Configuration(
            "batch_size must be at least 1".to_string(),
        ));
    }

    let batches: Vec<Batch<'_>> = points
        .chunks(size)
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            start_row: index * size,
            points: chunk,
        })
        .collect();

    tracing::debug!(
        total_points = points.len(),
        batch_count = batches.len(),
        batch_size = size,
        "[TABLE] Split rows into batches"
    );

    Ok(batches)
}
