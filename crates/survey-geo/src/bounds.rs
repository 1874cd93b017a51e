//! Axis-aligned bounding boxes and the bounds resolver
//!
//! Boxes are frame-agnostic; the caller tracks which frame a box is in.
//! Padding is always applied in the metric frame so buffers are real distances.

use crate::error::GeoError;
use crate::point::Point;
use crate::projection::{Frame, Projector};
use serde::{Deserialize, Serialize};

/// Axis-aligned box given by its left, bottom, right and top edges
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum x (longitude or easting)
    pub left: f64,
    /// Minimum y (latitude or northing)
    pub bottom: f64,
    /// Maximum x
    pub right: f64,
    /// Maximum y
    pub top: f64,
}

impl Bounds {
    /// Create a box from its edges
    #[inline]
    #[must_use]
    pub const fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Create a box from its lower-left and upper-right corners
    #[inline]
    #[must_use]
    pub fn from_corners(lower_left: Point, upper_right: Point) -> Self {
        Self::new(lower_left.x, lower_left.y, upper_right.x, upper_right.y)
    }

    /// Zero-area box at a single point
    #[inline]
    #[must_use]
    pub fn at(point: Point) -> Self {
        Self::from_corners(point, point)
    }

    /// Smallest box containing every point, `None` for an empty iterator
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        points.into_iter().fold(None, |acc: Option<Bounds>, p| {
            Some(match acc {
                None => Bounds::at(p),
                Some(b) => Bounds::new(
                    b.left.min(p.x),
                    b.bottom.min(p.y),
                    b.right.max(p.x),
                    b.top.max(p.y),
                ),
            })
        })
    }

    /// Lower-left corner
    #[inline]
    #[must_use]
    pub fn lower_left(&self) -> Point {
        Point::new(self.left, self.bottom)
    }

    /// Upper-right corner
    #[inline]
    #[must_use]
    pub fn upper_right(&self) -> Point {
        Point::new(self.right, self.top)
    }

    /// Center of the box
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2.0, (self.bottom + self.top) / 2.0)
    }

    /// Extent along x
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Extent along y
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Whether the box has zero area
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    /// Whether right >= left and top >= bottom
    #[inline]
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.right >= self.left && self.top >= self.bottom
    }

    /// Inclusive containment test
    #[inline]
    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.bottom && point.y <= self.top
    }

    /// Move every edge inward by `buffer`; a negative buffer grows the box
    #[inline]
    #[must_use]
    pub fn pad(&self, buffer: f64) -> Self {
        Self::new(
            self.left + buffer,
            self.bottom + buffer,
            self.right - buffer,
            self.top - buffer,
        )
    }

    /// Closed polygon ring, counter-clockwise from the lower-left corner
    #[must_use]
    pub fn ring(&self) -> [[f64; 2]; 5] {
        [
            [self.left, self.bottom],
            [self.right, self.bottom],
            [self.right, self.top],
            [self.left, self.top],
            [self.left, self.bottom],
        ]
    }
}

/// Derive the display boundary for a set of geographic points
///
/// The points' enclosing box is taken in the metric frame and every edge is
/// pushed outward by `buffer_m` meters, so a plot of radius `buffer_m` centered
/// on any point stays inside the result. The result is geographic.
///
/// Zero points yield the zero-area box at the origin and a single point with a
/// zero buffer yields a zero-area box at that point; neither is an error.
///
/// # Errors
/// - `GeoError::InvalidCoordinate` if any point cannot be reprojected
/// - `GeoError::DegenerateGeometry` if `buffer_m` is negative or not finite
pub fn calculate_bounds(points: &[Point], buffer_m: f64) -> Result<Bounds, GeoError> {
    if !buffer_m.is_finite() || buffer_m < 0.0 {
        return Err(GeoError::DegenerateGeometry(format!(
            "buffer must be a non-negative distance, got {buffer_m}"
        )));
    }

    let projector = Projector::new();
    let metric = points
        .iter()
        .map(|p| projector.to_metric(*p))
        .collect::<Result<Vec<_>, _>>()?;

    let Some(enclosing) = Bounds::enclosing(metric) else {
        return Ok(Bounds::default());
    };

    projector.reproject_bounds(enclosing.pad(-buffer_m), Frame::WebMercator, Frame::Geographic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric_of(bounds: Bounds) -> Bounds {
        Projector::new()
            .reproject_bounds(bounds, Frame::Geographic, Frame::WebMercator)
            .unwrap()
    }

    #[test]
    fn enclosing_box() {
        let b = Bounds::enclosing(vec![
            Point::new(1.0, 5.0),
            Point::new(-2.0, 3.0),
            Point::new(0.5, 7.0),
        ])
        .unwrap();
        assert_eq!(b, Bounds::new(-2.0, 3.0, 1.0, 7.0));
        assert!(Bounds::enclosing(Vec::new()).is_none());
    }

    #[test]
    fn pad_shrinks_and_negative_pad_grows() {
        let b = Bounds::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(b.pad(10.0), Bounds::new(10.0, 10.0, 90.0, 40.0));
        assert_eq!(b.pad(-10.0), Bounds::new(-10.0, -10.0, 110.0, 60.0));
        assert!(!b.pad(30.0).is_ordered());
    }

    #[test]
    fn ring_is_closed() {
        let ring = Bounds::new(0.0, 1.0, 2.0, 3.0).ring();
        assert_eq!(ring[0], ring[4]);
        assert_eq!(ring[2], [2.0, 3.0]);
    }

    #[test]
    fn calculate_bounds_buffers_in_meters() {
        let points = [Point::new(0.0, 0.0), Point::new(0.01, 0.01)];
        let raw = metric_of(Bounds::enclosing(points).unwrap());
        let buffered = metric_of(calculate_bounds(&points, 15.0).unwrap());

        assert!((raw.left - buffered.left - 15.0).abs() < 1e-6);
        assert!((raw.bottom - buffered.bottom - 15.0).abs() < 1e-6);
        assert!((buffered.right - raw.right - 15.0).abs() < 1e-6);
        assert!((buffered.top - raw.top - 15.0).abs() < 1e-6);
    }

    #[test]
    fn calculate_bounds_contains_every_point() {
        let points = [
            Point::new(-60.1, -3.2),
            Point::new(-60.05, -3.25),
            Point::new(-60.07, -3.21),
        ];
        let bounds = calculate_bounds(&points, 50.0).unwrap();
        assert!(points.iter().all(|p| bounds.contains(p)));
    }

    #[test]
    fn single_point_is_degenerate_not_error() {
        let p = Point::new(10.0, 20.0);
        let bounds = calculate_bounds(&[p], 0.0).unwrap();
        assert!(bounds.is_degenerate());
        assert!((bounds.left - 10.0).abs() < 1e-9);
        assert!((bounds.top - 20.0).abs() < 1e-9);

        let empty = calculate_bounds(&[], 25.0).unwrap();
        assert!(empty.is_degenerate());
    }

    #[test]
    fn negative_buffer_is_rejected() {
        assert!(matches!(
            calculate_bounds(&[Point::new(0.0, 0.0)], -1.0),
            Err(GeoError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn invalid_point_is_rejected() {
        assert!(calculate_bounds(&[Point::new(0.0, 95.0)], 1.0).is_err());
    }
}
