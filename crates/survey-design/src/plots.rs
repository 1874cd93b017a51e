//! Plot placement
//!
//! Inputs are metric boxes; outputs are geographic points. Callers pad the
//! boundary by half a plot before calling so no plot crosses the boundary.

use crate::config::PlotPlacement;
use crate::error::DesignError;
use rand::Rng;
use survey_geo::{Bounds, Frame, Point, Projector};

/// Centered lattice with step `step` inside a metric box
///
/// The lattice has `floor(width / step) + 1` columns and
/// `floor(height / step) + 1` rows. Space left over after fitting whole steps
/// is split evenly between both ends of each axis. Points are ordered
/// column-major: all rows of the first column, then the next column.
///
/// An inverted box yields no points.
#[must_use]
pub fn metric_lattice(bounds: &Bounds, step: f64) -> Vec<Point> {
    let Some((x_steps, x_padding)) = axis_steps(bounds.width(), step) else {
        return Vec::new();
    };
    let Some((y_steps, y_padding)) = axis_steps(bounds.height(), step) else {
        return Vec::new();
    };

    let origin = Point::new(bounds.left + x_padding, bounds.bottom + y_padding);
    (0..=x_steps)
        .flat_map(|i| {
            (0..=y_steps).map(move |j| origin.offset(i as f64 * step, j as f64 * step))
        })
        .collect()
}

/// Number of points [`metric_lattice`] yields for a box, without building it
///
/// Saturates at `u64::MAX`.
#[must_use]
pub fn lattice_len(bounds: &Bounds, step: f64) -> u64 {
    match (axis_steps(bounds.width(), step), axis_steps(bounds.height(), step)) {
        (Some((x_steps, _)), Some((y_steps, _))) => {
            x_steps.saturating_add(1).saturating_mul(y_steps.saturating_add(1))
        }
        _ => 0,
    }
}

fn axis_steps(range: f64, step: f64) -> Option<(u64, f64)> {
    if range.is_nan() || range < 0.0 || step.is_nan() || step <= 0.0 {
        return None;
    }
    let steps = (range / step).floor();
    Some((steps as u64, (range - steps * step) / 2.0))
}

/// `count` independent uniform points inside a metric box
///
/// # Errors
/// - `DesignError::Geometry` if a drawn point cannot be reprojected
pub fn random_points_in_bounds<R>(
    bounds: &Bounds,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Point>, DesignError>
where
    R: Rng + ?Sized,
{
    let projector = Projector::new();
    let (x_range, y_range) = (bounds.width(), bounds.height());
    (0..count)
        .map(|_| {
            let x = bounds.left + rng.random::<f64>() * x_range;
            let y = bounds.bottom + rng.random::<f64>() * y_range;
            projector
                .to_geographic(Point::new(x, y))
                .map_err(DesignError::from)
        })
        .collect()
}

/// Centered lattice inside a metric box, reprojected to geographic
///
/// # Errors
/// - `DesignError::Geometry` if a lattice point cannot be reprojected
pub fn gridded_points_in_bounds(bounds: &Bounds, spacing_m: f64) -> Result<Vec<Point>, DesignError> {
    let projector = Projector::new();
    metric_lattice(bounds, spacing_m)
        .into_iter()
        .map(|p| projector.to_geographic(p).map_err(DesignError::from))
        .collect()
}

/// Plot centers for a placement, in generation order
///
/// Random and gridded placements reproject the geographic boundary to the
/// metric frame and pad it inward by half the plot size. External centers are
/// returned verbatim.
///
/// # Errors
/// - `DesignError::BoundaryTooSmall` if the padded boundary is inverted
/// - `DesignError::Geometry` on reprojection failure
pub fn plot_centers<R>(
    placement: &PlotPlacement,
    plot_size_m: f64,
    rng: &mut R,
) -> Result<Vec<Point>, DesignError>
where
    R: Rng + ?Sized,
{
    match placement {
        PlotPlacement::Random { boundary, num_plots } => {
            let padded = padded_metric_bounds(boundary, plot_size_m)?;
            random_points_in_bounds(&padded, *num_plots, rng)
        }
        PlotPlacement::Gridded { boundary, spacing_m } => {
            let padded = padded_metric_bounds(boundary, plot_size_m)?;
            gridded_points_in_bounds(&padded, *spacing_m)
        }
        PlotPlacement::External { centers } => Ok(centers.clone()),
    }
}

fn padded_metric_bounds(boundary: &Bounds, plot_size_m: f64) -> Result<Bounds, DesignError> {
    let metric = Projector::new().reproject_bounds(*boundary, Frame::Geographic, Frame::WebMercator)?;
    let padded = metric.pad(plot_size_m / 2.0);
    if padded.is_ordered() {
        Ok(padded)
    } else {
        Err(DesignError::BoundaryTooSmall {
            plot_size: plot_size_m,
        })
    }
}
