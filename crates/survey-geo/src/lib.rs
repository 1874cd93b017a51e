//! Survey Geo - reprojection and bounding-box geometry
//!
//! Every distance-sensitive computation in the sampling workspace runs in a
//! planar metric frame and is reported in the geographic frame. This crate
//! provides:
//! - [`Frame`] and [`Projector`] for converting between the two
//! - [`Point`] and [`Bounds`] primitives
//! - [`calculate_bounds`] for deriving a display boundary from imported points
//!
//! # Example
//!
//! ```rust
//! use survey_geo::{Frame, Point, Projector};
//!
//! let projector = Projector::new();
//! let metric = projector
//!     .reproject_point(Point::new(10.0, 45.0), Frame::Geographic, Frame::WebMercator)
//!     .unwrap();
//! let back = projector
//!     .reproject_point(metric, Frame::WebMercator, Frame::Geographic)
//!     .unwrap();
//! assert!((back.x - 10.0).abs() < 1e-9);
//! ```

#![warn(unreachable_pub)]

pub mod bounds;
pub mod error;
pub mod point;
pub mod projection;

pub use bounds::{calculate_bounds, Bounds};
pub use error::GeoError;
pub use point::Point;
pub use projection::{Frame, Projector, EARTH_RADIUS_M, HALF_CIRCUMFERENCE_M};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
