//! Sample placement inside a plot
//!
//! Plot centers arrive geographic. Every offset is computed in the metric frame
//! so radii and resolutions are distances, then reprojected back.

use crate::config::{PlotShape, SamplePlacement};
use crate::error::DesignError;
use crate::plots::{metric_lattice, random_points_in_bounds};
use rand::Rng;
use std::f64::consts::TAU;
use survey_geo::{Bounds, Point, Projector};

/// `count` random samples inside a plot
///
/// Circle plots draw an angle uniform in `[0, 2π)` and a distance from the
/// center uniform in `[0, radius)`. The distance is uniform in magnitude, not
/// in area, so samples concentrate toward the center. Square plots draw
/// uniformly over the plot's bounding box.
///
/// # Errors
/// - `DesignError::Geometry` if the center or a sample cannot be reprojected
pub fn random_sample_set<R>(
    center: Point,
    shape: PlotShape,
    plot_size_m: f64,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Point>, DesignError>
where
    R: Rng + ?Sized,
{
    let projector = Projector::new();
    let center_m = projector.to_metric(center)?;
    let radius = plot_size_m / 2.0;

    match shape {
        PlotShape::Circle => (0..count)
            .map(|_| {
                let angle = TAU * rng.random::<f64>();
                let magnitude = radius * rng.random::<f64>();
                let sample = center_m.offset(magnitude * angle.cos(), magnitude * angle.sin());
                projector.to_geographic(sample).map_err(DesignError::from)
            })
            .collect(),
        PlotShape::Square => random_points_in_bounds(&plot_box(center_m, radius), count, rng),
    }
}

/// Lattice samples inside a plot
///
/// The lattice has step `resolution_m` and is centered in the plot's bounding
/// box. Circle plots keep only lattice points strictly inside the radius.
///
/// # Errors
/// - `DesignError::Geometry` if the center or a sample cannot be reprojected
pub fn gridded_sample_set(
    center: Point,
    shape: PlotShape,
    plot_size_m: f64,
    resolution_m: f64,
) -> Result<Vec<Point>, DesignError> {
    let projector = Projector::new();
    let center_m = projector.to_metric(center)?;
    let radius = plot_size_m / 2.0;
    let radius_squared = radius * radius;

    // Lattice is laid out around the origin so the step count depends on the
    // plot size alone, not on the magnitude of the center coordinates.
    let origin = Point::default();
    metric_lattice(&plot_box(origin, radius), resolution_m)
        .into_iter()
        .filter(|p| shape == PlotShape::Square || p.distance_squared(&origin) < radius_squared)
        .map(|p| {
            projector
                .to_geographic(p.offset(center_m.x, center_m.y))
                .map_err(DesignError::from)
        })
        .collect()
}

/// Samples for one plot under the given placement
///
/// # Errors
/// - `DesignError::Geometry` if the center or a sample cannot be reprojected
pub fn sample_set<R>(
    center: Point,
    shape: PlotShape,
    plot_size_m: f64,
    placement: SamplePlacement,
    rng: &mut R,
) -> Result<Vec<Point>, DesignError>
where
    R: Rng + ?Sized,
{
    match placement {
        SamplePlacement::Random { samples_per_plot } => {
            random_sample_set(center, shape, plot_size_m, samples_per_plot, rng)
        }
        SamplePlacement::Gridded { resolution_m } => {
            gridded_sample_set(center, shape, plot_size_m, resolution_m)
        }
    }
}

fn plot_box(center_m: Point, radius: f64) -> Bounds {
    Bounds::new(
        center_m.x - radius,
        center_m.y - radius,
        center_m.x + radius,
        center_m.y + radius,
    )
}
