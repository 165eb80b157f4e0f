use std::future::Future;
use std::pin::Pin;

use crate::error::AppError;
use crate::table::{Coordinate, SnappedPoint};

/// Boxed future returned by [`SnapTransport::snap`].
pub type SnapFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<SnappedPoint>, AppError>> + Send + 'a>>;

/// One round trip to a snapping service.
///
/// Implementations return one snapped point per submitted coordinate, in
/// submission order. The pipeline checks the count; a transport only reports
/// what the service returned.
pub trait SnapTransport: Send + Sync {
    fn snap<'a>(&'a self, points: &'a [Coordinate]) -> SnapFuture<'a>;
}
