//! Sampling design generator
//!
//! Runs plot placement, then sample placement for each plot. Output is a pure
//! function of the configuration and the random source passed in; nothing is
//! persisted here.
//!
//! Sample sets are generated in parallel. Each plot gets its own seed drawn
//! sequentially from the caller's source, so the design is identical for a
//! given source state whatever the thread count.

use crate::config::{PlotPlacement, ProjectConfig};
use crate::error::DesignError;
use crate::plots::plot_centers;
use crate::samples::sample_set;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use survey_geo::{calculate_bounds, Bounds, Point};

/// One generated plot: its center and its ordered samples, all geographic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotDesign {
    /// Plot center (lon/lat)
    pub center: Point,
    /// Sample positions (lon/lat) in generation order
    pub samples: Vec<Point>,
}

/// A complete generated design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingDesign {
    /// Geographic display boundary of the project
    pub boundary: Bounds,
    /// Plots in generation order
    pub plots: Vec<PlotDesign>,
}

impl SamplingDesign {
    /// Number of plots
    #[inline]
    #[must_use]
    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    /// Total number of samples across all plots
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.plots.iter().map(|p| p.samples.len()).sum()
    }

    /// Boundary as a closed polygon ring
    #[inline]
    #[must_use]
    pub fn boundary_ring(&self) -> [[f64; 2]; 5] {
        self.boundary.ring()
    }
}

/// Generates sampling designs from project configurations
#[derive(Debug, Clone, Copy, Default)]
pub struct DesignGenerator;

impl DesignGenerator {
    /// Create a generator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Generate the plots and samples for a project
    ///
    /// # Arguments
    /// * `config` - Validated project configuration
    /// * `rng` - Random source for every draw in this design
    ///
    /// # Errors
    /// - `DesignError::BoundaryTooSmall` if the padded boundary is inverted
    /// - `DesignError::Geometry` if any point cannot be reprojected
    pub fn generate<R>(&self, config: &ProjectConfig, rng: &mut R) -> Result<SamplingDesign, DesignError>
    where
        R: Rng + ?Sized,
    {
        let placement = config.plot_placement();
        let boundary = match placement {
            PlotPlacement::Random { boundary, .. } | PlotPlacement::Gridded { boundary, .. } => *boundary,
            PlotPlacement::External { centers } => calculate_bounds(centers, config.plot_radius_m())?,
        };

        let centers = plot_centers(placement, config.plot_size_m(), rng)?;
        tracing::debug!(
            "Placed {} plot centers ({} distribution)",
            centers.len(),
            placement.name()
        );

        let seeds: Vec<u64> = centers.iter().map(|_| rng.random::<u64>()).collect();
        let shape = config.plot_shape();
        let plot_size_m = config.plot_size_m();
        let sample_placement = config.sample_placement();

        let plots = centers
            .into_par_iter()
            .zip(seeds)
            .map(|(center, seed)| {
                let mut plot_rng = StdRng::seed_from_u64(seed);
                let samples = sample_set(center, shape, plot_size_m, sample_placement, &mut plot_rng)?;
                Ok(PlotDesign { center, samples })
            })
            .collect::<Result<Vec<_>, DesignError>>()?;

        let design = SamplingDesign { boundary, plots };
        tracing::debug!(
            "Generated {} samples ({} distribution)",
            design.sample_count(),
            sample_placement.name()
        );
        Ok(design)
    }
}
