//! Survey project service
//!
//! Wires the design generator to the plot store. A project's design is
//! generated in full, then written in one batch; leasing goes through the
//! shared [`LeaseManager`].

use crate::error::SurveyError;
use crate::settings::SurveySettings;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use survey_design::{DesignGenerator, ProjectConfig, SamplingDesign};
use survey_geo::Bounds;
use survey_lease::{InMemoryPlotStore, LeaseManager, NewPlot, PlotId, PlotStore, ProjectId, ProjectSummary};

/// A created project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectRecord {
    /// Identity
    pub project_id: ProjectId,
    /// Configuration the plots were generated from
    pub config: ProjectConfig,
    /// Display boundary
    pub boundary: Bounds,
    /// Plot ids in generation order
    pub plot_ids: Vec<PlotId>,
    /// Total samples across all plots
    pub sample_count: usize,
}

/// Creates projects and exposes their plots for leasing
#[derive(Debug)]
pub struct SurveyService {
    generator: DesignGenerator,
    manager: LeaseManager,
    /// `None` while the project's plots are being stored
    projects: DashMap<ProjectId, Option<ProjectRecord>>,
}

/// Holds a project id while its plots are stored; frees it unless completed
struct Reservation<'a> {
    projects: &'a DashMap<ProjectId, Option<ProjectRecord>>,
    project_id: ProjectId,
    completed: bool,
}

impl<'a> Reservation<'a> {
    fn claim(
        projects: &'a DashMap<ProjectId, Option<ProjectRecord>>,
        project_id: ProjectId,
    ) -> Result<Self, SurveyError> {
        match projects.entry(project_id) {
            Entry::Occupied(_) => Err(SurveyError::ProjectExists(project_id)),
            Entry::Vacant(slot) => {
                slot.insert(None);
                Ok(Self {
                    projects,
                    project_id,
                    completed: false,
                })
            }
        }
    }

    fn complete(mut self, record: ProjectRecord) {
        self.projects.insert(self.project_id, Some(record));
        self.completed = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.projects.remove(&self.project_id);
        }
    }
}

impl SurveyService {
    /// Create a service over an existing lease manager
    #[must_use]
    pub fn new(manager: LeaseManager) -> Self {
        Self {
            generator: DesignGenerator::new(),
            manager,
            projects: DashMap::new(),
        }
    }

    /// Create a service backed by an in-memory store
    ///
    /// # Errors
    /// - `SurveyError::Settings` if the lease duration is invalid
    pub fn in_memory(settings: &SurveySettings) -> Result<Self, SurveyError> {
        let store: Arc<dyn PlotStore> = Arc::new(InMemoryPlotStore::new());
        let manager = LeaseManager::new(store).with_lease_duration(settings.lease_duration()?);
        Ok(Self::new(manager))
    }

    /// Lease manager over this service's store
    #[inline]
    #[must_use]
    pub fn lease_manager(&self) -> &LeaseManager {
        &self.manager
    }

    /// Generate a design without storing it
    ///
    /// # Errors
    /// - `SurveyError::Design` if generation fails
    pub fn generate<R>(&self, config: &ProjectConfig, rng: &mut R) -> Result<SamplingDesign, SurveyError>
    where
        R: Rng + ?Sized,
    {
        self.generator.generate(config, rng).map_err(|e| {
            tracing::warn!("Design generation rejected: {}", e);
            SurveyError::Design(e)
        })
    }

    /// Generate a project's plots and samples and store them
    ///
    /// Nothing is stored if generation fails.
    ///
    /// # Errors
    /// - `SurveyError::ProjectExists` if the id is taken
    /// - `SurveyError::Design` if generation fails
    /// - `SurveyError::Store` if the batch insert fails
    pub async fn create_project<R>(
        &self,
        project_id: ProjectId,
        config: ProjectConfig,
        rng: &mut R,
    ) -> Result<ProjectRecord, SurveyError>
    where
        R: Rng + Send + ?Sized,
    {
        if self.projects.contains_key(&project_id) {
            return Err(SurveyError::ProjectExists(project_id));
        }
        let design = self.generate(&config, rng)?;
        self.insert_design(project_id, config, design).await
    }

    /// Store an already generated design as a new project
    ///
    /// # Errors
    /// - `SurveyError::ProjectExists` if the id is taken
    /// - `SurveyError::Store` if the batch insert fails
    pub async fn insert_design(
        &self,
        project_id: ProjectId,
        config: ProjectConfig,
        design: SamplingDesign,
    ) -> Result<ProjectRecord, SurveyError> {
        let reservation = Reservation::claim(&self.projects, project_id)?;

        let boundary = design.boundary;
        let sample_count = design.sample_count();
        let plots = design
            .plots
            .into_iter()
            .map(|p| NewPlot {
                center: p.center,
                samples: p.samples,
            })
            .collect();

        let plot_ids = self
            .manager
            .store()
            .create_plots_and_samples(project_id, plots)
            .await
            .inspect_err(|e| tracing::warn!("Storing project {} failed: {}", project_id, e))?;

        tracing::info!(
            "Created project {} with {} plots and {} samples ({} plots, {} samples)",
            project_id,
            plot_ids.len(),
            sample_count,
            config.plot_placement().name(),
            config.sample_placement().name()
        );

        let record = ProjectRecord {
            project_id,
            config,
            boundary,
            plot_ids,
            sample_count,
        };
        reservation.complete(record.clone());
        Ok(record)
    }

    /// A created project
    #[must_use]
    pub fn project(&self, project_id: ProjectId) -> Option<ProjectRecord> {
        self.projects
            .get(&project_id)
            .and_then(|r| r.value().clone())
    }

    /// Plot counts for a created project
    ///
    /// # Errors
    /// - `SurveyError::UnknownProject` if the project was never created
    pub async fn project_summary(&self, project_id: ProjectId) -> Result<ProjectSummary, SurveyError> {
        if self.project(project_id).is_none() {
            return Err(SurveyError::UnknownProject(project_id));
        }
        Ok(self.manager.summary(project_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use survey_design::{PlotPlacement, PlotShape, SamplePlacement};

    fn config() -> ProjectConfig {
        ProjectConfig::new(
            PlotPlacement::Random {
                boundary: Bounds::new(0.0, 0.0, 0.01, 0.01),
                num_plots: 4,
            },
            PlotShape::Square,
            20.0,
            SamplePlacement::Random { samples_per_plot: 2 },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_stores_every_plot() {
        let service = SurveyService::in_memory(&SurveySettings::default()).unwrap();
        let record = service
            .create_project(ProjectId(3), config(), &mut StdRng::seed_from_u64(1))
            .await
            .unwrap();
        assert_eq!(record.plot_ids.len(), 4);
        assert_eq!(record.sample_count, 8);

        let summary = service.project_summary(ProjectId(3)).await.unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.available, 4);
        assert!(service.project(ProjectId(3)).is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_with_one_id_have_one_winner() {
        let service = Arc::new(SurveyService::in_memory(&SurveySettings::default()).unwrap());
        let design = service
            .generate(&config(), &mut StdRng::seed_from_u64(4))
            .unwrap();

        let creates: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                let design = design.clone();
                tokio::spawn(async move { service.insert_design(ProjectId(5), config(), design).await })
            })
            .collect();
        let mut created = 0;
        for create in creates {
            match create.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, SurveyError::ProjectExists(ProjectId(5)))),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(service.project_summary(ProjectId(5)).await.unwrap().total, 4);
    }

    #[tokio::test]
    async fn failed_store_frees_the_project_id() {
        let store = Arc::new(InMemoryPlotStore::new());
        let service = SurveyService::new(LeaseManager::new(Arc::clone(&store) as Arc<dyn PlotStore>));
        let mut rng = StdRng::seed_from_u64(6);

        store.set_unavailable(true);
        let err = service
            .create_project(ProjectId(2), config(), &mut rng)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(service.project(ProjectId(2)).is_none());

        store.set_unavailable(false);
        service.create_project(ProjectId(2), config(), &mut rng).await.unwrap();
        assert!(service.project(ProjectId(2)).is_some());
    }

    #[tokio::test]
    async fn duplicate_and_unknown_projects() {
        let service = SurveyService::in_memory(&SurveySettings::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        service.create_project(ProjectId(1), config(), &mut rng).await.unwrap();

        assert!(matches!(
            service.create_project(ProjectId(1), config(), &mut rng).await,
            Err(SurveyError::ProjectExists(ProjectId(1)))
        ));
        assert!(matches!(
            service.project_summary(ProjectId(2)).await,
            Err(SurveyError::UnknownProject(ProjectId(2)))
        ));
    }
}
