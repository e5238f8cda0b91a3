//! The sink that exported points are handed to.

use lp_otlp_core::Point;

use crate::Error;

/// Receives line-protocol points produced by the export direction.
///
/// Encoding, batching and flushing belong to the implementation. An error returned
/// here ends the export walk and is handed back to the caller as [`Error::Writer`].
pub trait PointWriter {
    fn write_point(&mut self, point: Point) -> Result<(), Error>;
}

impl PointWriter for Vec<Point> {
    fn write_point(&mut self, point: Point) -> Result<(), Error> {
        self.push(point);
        Ok(())
    }
}

impl<W: PointWriter + ?Sized> PointWriter for &mut W {
    fn write_point(&mut self, point: Point) -> Result<(), Error> {
        (**self).write_point(point)
    }
}
