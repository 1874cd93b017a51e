//! Project configuration
//!
//! Two forms exist:
//! - [`ProjectSettings`]: the flat record an operator submits, with string
//!   distribution names and optional fields
//! - [`ProjectConfig`]: the validated, strongly typed configuration the
//!   generator consumes
//!
//! `ProjectConfig` can only be obtained through validation, so a value of that
//! type always satisfies the configuration invariants.

use crate::error::DesignError;
use crate::plots::lattice_len;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use survey_geo::{Bounds, Frame, Point, Projector};

/// Most plot centers plus samples a single design may hold
pub const MAX_DESIGN_POINTS: u64 = 10_000_000;

/// Plot outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotShape {
    /// Circle whose diameter is the plot size
    Circle,
    /// Axis-aligned square whose side is the plot size
    Square,
}

impl PlotShape {
    /// Lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PlotShape::Circle => "circle",
            PlotShape::Square => "square",
        }
    }
}

impl FromStr for PlotShape {
    type Err = DesignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "circle" => Ok(PlotShape::Circle),
            "square" => Ok(PlotShape::Square),
            _ => Err(DesignError::UnsupportedShape(s.to_string())),
        }
    }
}

impl std::fmt::Display for PlotShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How plot centers are placed
#[derive(Debug, Clone, PartialEq)]
pub enum PlotPlacement {
    /// `num_plots` uniform draws inside the geographic boundary
    Random {
        /// Geographic boundary
        boundary: Bounds,
        /// Exact number of plots to draw
        num_plots: usize,
    },
    /// Regular lattice with step `spacing_m` inside the geographic boundary
    Gridded {
        /// Geographic boundary
        boundary: Bounds,
        /// Lattice step in meters
        spacing_m: f64,
    },
    /// Caller-supplied geographic centers, used verbatim
    External {
        /// Plot centers in lon/lat
        centers: Vec<Point>,
    },
}

impl PlotPlacement {
    /// Distribution name as it appears in settings
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PlotPlacement::Random { .. } => "random",
            PlotPlacement::Gridded { .. } => "gridded",
            PlotPlacement::External { .. } => "external",
        }
    }

    /// Boundary for generated placements, `None` for external points
    #[inline]
    #[must_use]
    pub fn boundary(&self) -> Option<Bounds> {
        match self {
            PlotPlacement::Random { boundary, .. } | PlotPlacement::Gridded { boundary, .. } => {
                Some(*boundary)
            }
            PlotPlacement::External { .. } => None,
        }
    }
}

/// How sample points are placed inside each plot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplePlacement {
    /// `samples_per_plot` uniform draws per plot
    Random {
        /// Samples drawn in every plot
        samples_per_plot: usize,
    },
    /// Regular lattice with step `resolution_m` clipped to the plot shape
    Gridded {
        /// Lattice step in meters
        resolution_m: f64,
    },
}

impl SamplePlacement {
    /// Distribution name as it appears in settings
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SamplePlacement::Random { .. } => "random",
            SamplePlacement::Gridded { .. } => "gridded",
        }
    }
}

/// Validated project configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProjectSettings", into = "ProjectSettings")]
pub struct ProjectConfig {
    plot_placement: PlotPlacement,
    plot_shape: PlotShape,
    plot_size_m: f64,
    sample_placement: SamplePlacement,
}

impl ProjectConfig {
    /// Build and validate a configuration
    ///
    /// # Errors
    /// - `DesignError::NonPositive` for a non-positive plot size, spacing or resolution
    /// - `DesignError::MissingField` for a random placement of zero plots
    /// - `DesignError::ResolutionExceedsPlotSize` for gridded samples coarser than the plot
    /// - `DesignError::InvalidBoundary` / `BoundaryTooSmall` for unusable boundaries
    /// - `DesignError::InvalidPointList` for an empty external point list
    /// - `DesignError::TooManyPoints` if plot centers plus samples exceed [`MAX_DESIGN_POINTS`]
    /// - `DesignError::Geometry` if a boundary corner or center cannot be reprojected
    pub fn new(
        plot_placement: PlotPlacement,
        plot_shape: PlotShape,
        plot_size_m: f64,
        sample_placement: SamplePlacement,
    ) -> Result<Self, DesignError> {
        require_positive("plot_size", plot_size_m)?;

        let projector = Projector::new();
        let plot_count = match &plot_placement {
            PlotPlacement::Random { boundary, num_plots } => {
                if *num_plots == 0 {
                    return Err(DesignError::MissingField("num_plots"));
                }
                validate_boundary(&projector, boundary, plot_size_m)?;
                saturating_count(*num_plots)
            }
            PlotPlacement::Gridded { boundary, spacing_m } => {
                require_positive("plot_spacing", *spacing_m)?;
                let padded = validate_boundary(&projector, boundary, plot_size_m)?;
                lattice_len(&padded, *spacing_m)
            }
            PlotPlacement::External { centers } => {
                if centers.is_empty() {
                    return Err(DesignError::InvalidPointList {
                        line: 0,
                        message: "no plot centers supplied".to_string(),
                    });
                }
                for center in centers {
                    projector.to_metric(*center)?;
                }
                saturating_count(centers.len())
            }
        };

        let samples_per_plot = match sample_placement {
            SamplePlacement::Random { samples_per_plot } => saturating_count(samples_per_plot),
            SamplePlacement::Gridded { resolution_m } => {
                require_positive("sample_resolution", resolution_m)?;
                if resolution_m > plot_size_m {
                    return Err(DesignError::ResolutionExceedsPlotSize {
                        resolution: resolution_m,
                        plot_size: plot_size_m,
                    });
                }
                lattice_len(&Bounds::new(0.0, 0.0, plot_size_m, plot_size_m), resolution_m)
            }
        };

        let requested = plot_count.saturating_mul(samples_per_plot.saturating_add(1));
        if requested > MAX_DESIGN_POINTS {
            return Err(DesignError::TooManyPoints {
                requested,
                max: MAX_DESIGN_POINTS,
            });
        }

        Ok(Self {
            plot_placement,
            plot_shape,
            plot_size_m,
            sample_placement,
        })
    }

    /// Parse and validate settings written as TOML
    ///
    /// # Errors
    /// - `DesignError::Parse` if the text is not valid settings TOML
    /// - Any validation error from [`ProjectConfig::new`]
    pub fn from_toml_str(text: &str) -> Result<Self, DesignError> {
        let settings: ProjectSettings =
            toml::from_str(text).map_err(|e| DesignError::Parse(e.to_string()))?;
        Self::try_from(settings)
    }

    /// Parse and validate settings written as JSON
    ///
    /// # Errors
    /// - `DesignError::Parse` if the text is not valid settings JSON
    /// - Any validation error from [`ProjectConfig::new`]
    pub fn from_json_str(text: &str) -> Result<Self, DesignError> {
        let settings: ProjectSettings =
            serde_json::from_str(text).map_err(|e| DesignError::Parse(e.to_string()))?;
        Self::try_from(settings)
    }

    /// Plot placement strategy
    #[inline]
    #[must_use]
    pub fn plot_placement(&self) -> &PlotPlacement {
        &self.plot_placement
    }

    /// Plot outline
    #[inline]
    #[must_use]
    pub fn plot_shape(&self) -> PlotShape {
        self.plot_shape
    }

    /// Plot diameter (circle) or side (square) in meters
    #[inline]
    #[must_use]
    pub fn plot_size_m(&self) -> f64 {
        self.plot_size_m
    }

    /// Half the plot size
    #[inline]
    #[must_use]
    pub fn plot_radius_m(&self) -> f64 {
        self.plot_size_m / 2.0
    }

    /// Sample placement strategy
    #[inline]
    #[must_use]
    pub fn sample_placement(&self) -> SamplePlacement {
        self.sample_placement
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), DesignError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DesignError::non_positive(field, value))
    }
}

fn saturating_count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Padded metric boundary plot centers are drawn from
fn validate_boundary(projector: &Projector, boundary: &Bounds, plot_size_m: f64) -> Result<Bounds, DesignError> {
    if !boundary.is_ordered() {
        return Err(DesignError::InvalidBoundary(format!(
            "lower-left ({}, {}) is not below-left of upper-right ({}, {})",
            boundary.left, boundary.bottom, boundary.right, boundary.top
        )));
    }
    let padded = projector
        .reproject_bounds(*boundary, Frame::Geographic, Frame::WebMercator)?
        .pad(plot_size_m / 2.0);
    if !padded.is_ordered() {
        return Err(DesignError::BoundaryTooSmall {
            plot_size: plot_size_m,
        });
    }
    Ok(padded)
}

/// Flat project settings as submitted by an operator
///
/// Field names follow snake_case; the camelCase names used by the web client
/// are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSettings {
    /// `random`, `gridded` or `external` (`csv` is accepted for `external`)
    #[serde(alias = "plotDistribution")]
    pub plot_distribution: String,
    /// Western edge of the boundary
    #[serde(alias = "lonMin", skip_serializing_if = "Option::is_none")]
    pub lon_min: Option<f64>,
    /// Southern edge of the boundary
    #[serde(alias = "latMin", skip_serializing_if = "Option::is_none")]
    pub lat_min: Option<f64>,
    /// Eastern edge of the boundary
    #[serde(alias = "lonMax", skip_serializing_if = "Option::is_none")]
    pub lon_max: Option<f64>,
    /// Northern edge of the boundary
    #[serde(alias = "latMax", skip_serializing_if = "Option::is_none")]
    pub lat_max: Option<f64>,
    /// Plot count for random placement
    #[serde(alias = "numPlots", skip_serializing_if = "Option::is_none")]
    pub num_plots: Option<usize>,
    /// Lattice step in meters for gridded placement
    #[serde(alias = "plotSpacing", skip_serializing_if = "Option::is_none")]
    pub plot_spacing: Option<f64>,
    /// `circle` or `square`
    #[serde(alias = "plotShape")]
    pub plot_shape: String,
    /// Plot diameter or side in meters
    #[serde(alias = "plotSize", skip_serializing_if = "Option::is_none")]
    pub plot_size: Option<f64>,
    /// `random` or `gridded`
    #[serde(alias = "sampleDistribution")]
    pub sample_distribution: String,
    /// Sample count per plot for random sampling
    #[serde(alias = "samplesPerPlot", skip_serializing_if = "Option::is_none")]
    pub samples_per_plot: Option<usize>,
    /// Lattice step in meters for gridded sampling
    #[serde(alias = "sampleResolution", skip_serializing_if = "Option::is_none")]
    pub sample_resolution: Option<f64>,
    /// External plot centers as `[lon, lat]` pairs
    #[serde(alias = "plotCenters", skip_serializing_if = "Vec::is_empty")]
    pub plot_centers: Vec<[f64; 2]>,
}

impl ProjectSettings {
    fn has_boundary(&self) -> bool {
        [self.lon_min, self.lat_min, self.lon_max, self.lat_max]
            .iter()
            .any(Option::is_some)
    }

    fn boundary(&self) -> Result<Bounds, DesignError> {
        if !self.plot_centers.is_empty() {
            return Err(DesignError::InvalidPointList {
                line: 0,
                message: format!(
                    "plot centers cannot be combined with {} placement",
                    self.plot_distribution
                ),
            });
        }
        Ok(Bounds::new(
            self.lon_min.ok_or(DesignError::MissingField("lon_min"))?,
            self.lat_min.ok_or(DesignError::MissingField("lat_min"))?,
            self.lon_max.ok_or(DesignError::MissingField("lon_max"))?,
            self.lat_max.ok_or(DesignError::MissingField("lat_max"))?,
        ))
    }
}

impl TryFrom<ProjectSettings> for ProjectConfig {
    type Error = DesignError;

    fn try_from(settings: ProjectSettings) -> Result<Self, Self::Error> {
        let plot_shape = settings.plot_shape.parse::<PlotShape>()?;
        let plot_size_m = settings.plot_size.ok_or(DesignError::MissingField("plot_size"))?;

        let plot_placement = match settings.plot_distribution.trim().to_ascii_lowercase().as_str() {
            "random" => PlotPlacement::Random {
                boundary: settings.boundary()?,
                num_plots: settings.num_plots.ok_or(DesignError::MissingField("num_plots"))?,
            },
            "gridded" => PlotPlacement::Gridded {
                boundary: settings.boundary()?,
                spacing_m: settings
                    .plot_spacing
                    .ok_or(DesignError::MissingField("plot_spacing"))?,
            },
            "external" | "csv" if settings.has_boundary() => {
                return Err(DesignError::InvalidBoundary(
                    "a boundary cannot be combined with external plot centers".to_string(),
                ))
            }
            "external" | "csv" => PlotPlacement::External {
                centers: settings
                    .plot_centers
                    .iter()
                    .map(|[lon, lat]| Point::new(*lon, *lat))
                    .collect(),
            },
            _ => {
                return Err(DesignError::UnsupportedDistribution {
                    stage: "plot",
                    value: settings.plot_distribution,
                })
            }
        };

        let sample_placement = match settings.sample_distribution.trim().to_ascii_lowercase().as_str() {
            "random" => SamplePlacement::Random {
                samples_per_plot: settings
                    .samples_per_plot
                    .ok_or(DesignError::MissingField("samples_per_plot"))?,
            },
            "gridded" => SamplePlacement::Gridded {
                resolution_m: settings
                    .sample_resolution
                    .ok_or(DesignError::MissingField("sample_resolution"))?,
            },
            _ => {
                return Err(DesignError::UnsupportedDistribution {
                    stage: "sample",
                    value: settings.sample_distribution,
                })
            }
        };

        ProjectConfig::new(plot_placement, plot_shape, plot_size_m, sample_placement)
    }
}

impl From<ProjectConfig> for ProjectSettings {
    fn from(config: ProjectConfig) -> Self {
        let mut settings = ProjectSettings {
            plot_distribution: config.plot_placement.name().to_string(),
            plot_shape: config.plot_shape.as_str().to_string(),
            plot_size: Some(config.plot_size_m),
            sample_distribution: config.sample_placement.name().to_string(),
            ..ProjectSettings::default()
        };

        if let Some(boundary) = config.plot_placement.boundary() {
            settings.lon_min = Some(boundary.left);
            settings.lat_min = Some(boundary.bottom);
            settings.lon_max = Some(boundary.right);
            settings.lat_max = Some(boundary.top);
        }
        match config.plot_placement {
            PlotPlacement::Random { num_plots, .. } => settings.num_plots = Some(num_plots),
            PlotPlacement::Gridded { spacing_m, .. } => settings.plot_spacing = Some(spacing_m),
            PlotPlacement::External { centers } => {
                settings.plot_centers = centers.into_iter().map(<[f64; 2]>::from).collect();
            }
        }
        match config.sample_placement {
            SamplePlacement::Random { samples_per_plot } => {
                settings.samples_per_plot = Some(samples_per_plot);
            }
            SamplePlacement::Gridded { resolution_m } => {
                settings.sample_resolution = Some(resolution_m);
            }
        }

        settings
    }
}
