//! Reprojection between the geographic and metric frames
//!
//! The metric frame is spherical Web Mercator (EPSG:3857), the projection used
//! by the map tiles plots are reviewed on. Transforms are closed-form, so a
//! round trip reproduces the input to within floating-point error.

use crate::bounds::Bounds;
use crate::error::GeoError;
use crate::point::Point;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// WGS84 semi-major axis used by spherical Web Mercator
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Half the equatorial circumference; the metric frame spans `±` this on x
pub const HALF_CIRCUMFERENCE_M: f64 = PI * EARTH_RADIUS_M;

const MAX_LONGITUDE: f64 = 180.0;
const MAX_LATITUDE: f64 = 90.0;
const EASTING_SLACK: f64 = 1e-6;

/// Supported coordinate reference frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    /// Longitude/latitude in degrees (EPSG:4326)
    Geographic,
    /// Planar meters (EPSG:3857)
    WebMercator,
}

impl Frame {
    /// EPSG code of this frame
    #[inline]
    #[must_use]
    pub fn epsg(&self) -> u32 {
        match self {
            Frame::Geographic => 4326,
            Frame::WebMercator => 3857,
        }
    }

    /// Resolve a frame from its EPSG code
    ///
    /// # Errors
    /// - `GeoError::UnknownFrame` for any code other than 4326 or 3857
    pub fn from_epsg(code: u32) -> Result<Self, GeoError> {
        match code {
            4326 => Ok(Frame::Geographic),
            3857 | 900_913 => Ok(Frame::WebMercator),
            other => Err(GeoError::UnknownFrame(other)),
        }
    }

    fn validate(self, point: Point) -> Result<(), GeoError> {
        let valid = point.is_finite()
            && match self {
                Frame::Geographic => point.x.abs() <= MAX_LONGITUDE && point.y.abs() < MAX_LATITUDE,
                Frame::WebMercator => point.x.abs() <= HALF_CIRCUMFERENCE_M + EASTING_SLACK,
            };
        if valid {
            Ok(())
        } else {
            Err(GeoError::InvalidCoordinate {
                x: point.x,
                y: point.y,
                frame: self,
            })
        }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Converts points and boxes between frames
#[derive(Debug, Clone, Copy, Default)]
pub struct Projector;

impl Projector {
    /// Create a projector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Reproject a point from `from` to `to`
    ///
    /// # Errors
    /// - `GeoError::InvalidCoordinate` if the point is outside the source
    ///   frame's domain or the transform does not produce a finite result
    pub fn reproject_point(&self, point: Point, from: Frame, to: Frame) -> Result<Point, GeoError> {
        from.validate(point)?;
        let projected = match (from, to) {
            (Frame::Geographic, Frame::WebMercator) => forward(point),
            (Frame::WebMercator, Frame::Geographic) => inverse(point),
            _ => point,
        };
        if projected.is_finite() {
            Ok(projected)
        } else {
            Err(GeoError::InvalidCoordinate {
                x: point.x,
                y: point.y,
                frame: from,
            })
        }
    }

    /// Reproject a point between frames named by EPSG code
    ///
    /// # Errors
    /// - `GeoError::UnsupportedFrame` if either code is not a supported frame
    /// - Any error from [`Projector::reproject_point`]
    pub fn reproject_point_epsg(&self, point: Point, from: u32, to: u32) -> Result<Point, GeoError> {
        let unsupported = |_| GeoError::UnsupportedFrame { from, to };
        let source = Frame::from_epsg(from).map_err(unsupported)?;
        let target = Frame::from_epsg(to).map_err(unsupported)?;
        self.reproject_point(point, source, target)
    }

    /// Reproject an axis-aligned box by transforming its two corners
    ///
    /// Both supported transforms are monotonic per axis, so the corners stay
    /// lower-left and upper-right.
    ///
    /// # Errors
    /// - Any error from [`Projector::reproject_point`] for either corner
    pub fn reproject_bounds(&self, bounds: Bounds, from: Frame, to: Frame) -> Result<Bounds, GeoError> {
        let lower_left = self.reproject_point(bounds.lower_left(), from, to)?;
        let upper_right = self.reproject_point(bounds.upper_right(), from, to)?;
        Ok(Bounds::from_corners(lower_left, upper_right))
    }

    /// Geographic to Web Mercator
    ///
    /// # Errors
    /// - `GeoError::InvalidCoordinate` for a point outside lon/lat range
    #[inline]
    pub fn to_metric(&self, point: Point) -> Result<Point, GeoError> {
        self.reproject_point(point, Frame::Geographic, Frame::WebMercator)
    }

    /// Web Mercator to geographic
    ///
    /// # Errors
    /// - `GeoError::InvalidCoordinate` for an easting beyond the projected world
    #[inline]
    pub fn to_geographic(&self, point: Point) -> Result<Point, GeoError> {
        self.reproject_point(point, Frame::WebMercator, Frame::Geographic)
    }
}

fn forward(point: Point) -> Point {
    let lon = point.x.to_radians();
    let lat = point.y.to_radians();
    Point::new(
        EARTH_RADIUS_M * lon,
        EARTH_RADIUS_M * (FRAC_PI_4 + lat / 2.0).tan().ln(),
    )
}

fn inverse(point: Point) -> Point {
    let lon = point.x / EARTH_RADIUS_M;
    let lat = 2.0 * (point.y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2;
    Point::new(lon.to_degrees(), lat.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_origin() {
        let p = Projector::new();
        let m = p.to_metric(Point::new(0.0, 0.0)).unwrap();
        assert!(m.x.abs() < 1e-9 && m.y.abs() < 1e-9);
    }

    #[test]
    fn antimeridian_maps_to_half_circumference() {
        let p = Projector::new();
        let m = p.to_metric(Point::new(180.0, 0.0)).unwrap();
        assert!((m.x - HALF_CIRCUMFERENCE_M).abs() < 1e-6);
    }

    #[test]
    fn known_point_matches_reference() {
        // 1 degree of longitude at the equator
        let p = Projector::new();
        let m = p.to_metric(Point::new(1.0, 0.0)).unwrap();
        assert!((m.x - 111_319.490_793).abs() < 1e-2);

        let m = p.to_metric(Point::new(0.0, 45.0)).unwrap();
        assert!((m.y - 5_621_521.486_192).abs() < 1e-2);
    }

    #[test]
    fn identity_pair_is_noop() {
        let p = Projector::new();
        let pt = Point::new(12.5, -33.25);
        assert_eq!(p.reproject_point(pt, Frame::Geographic, Frame::Geographic).unwrap(), pt);
    }

    #[test]
    fn pole_is_rejected() {
        let p = Projector::new();
        let err = p.to_metric(Point::new(0.0, 90.0)).unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinate { .. }));
        assert!(p.to_metric(Point::new(f64::NAN, 0.0)).is_err());
        assert!(p.to_metric(Point::new(181.0, 0.0)).is_err());
    }

    #[test]
    fn metric_outside_world_is_rejected() {
        let p = Projector::new();
        assert!(p.to_geographic(Point::new(HALF_CIRCUMFERENCE_M * 1.01, 0.0)).is_err());
    }

    #[test]
    fn epsg_lookup() {
        assert_eq!(Frame::from_epsg(4326).unwrap(), Frame::Geographic);
        assert_eq!(Frame::from_epsg(3857).unwrap(), Frame::WebMercator);
        assert_eq!(Frame::from_epsg(2154), Err(GeoError::UnknownFrame(2154)));
        assert_eq!(Frame::WebMercator.to_string(), "EPSG:3857");
    }

    #[test]
    fn unsupported_epsg_pair_is_configuration_error() {
        let p = Projector::new();
        let err = p
            .reproject_point_epsg(Point::new(0.0, 0.0), 4326, 32633)
            .unwrap_err();
        assert_eq!(err, GeoError::UnsupportedFrame { from: 4326, to: 32633 });
        assert!(err.is_configuration());
    }

    #[test]
    fn bounds_reprojection_keeps_corner_order() {
        let p = Projector::new();
        let geo = Bounds::new(-1.0, -1.0, 1.0, 1.0);
        let metric = p.reproject_bounds(geo, Frame::Geographic, Frame::WebMercator).unwrap();
        assert!(metric.left < metric.right);
        assert!(metric.bottom < metric.top);
        assert!((metric.left + metric.right).abs() < 1e-6);
    }
}
