use crate::config::{FailurePolicy, PipelineConfig};
use crate::error::PipelineError;
use crate::infrastructure::database::recreate_schema;
use crate::models::StorageObject;
use crate::services::aggregator::{Aggregator, StepReport};
use crate::services::catalog::ObjectCatalog;
use crate::services::fetcher::ObjectFetcher;
use crate::services::loader::EventLoader;
use crate::services::storage::ObjectStore;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, warn};

/// An object left out of the run under [`FailurePolicy::Skip`]
#[derive(Debug, Clone)]
pub struct SkippedObject {
    pub key: String,
    pub reason: String,
}

/// Outcome of one complete run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub objects_accepted: usize,
    pub objects_loaded: usize,
    pub objects_skipped: Vec<SkippedObject>,
    pub events_loaded: u64,
    pub staging: Vec<StepReport>,
    pub reporting: Vec<StepReport>,
}

/// Catalog → fetch → load for every object, then one staging and one final phase
pub struct Pipeline {
    config: PipelineConfig,
    db: DatabaseConnection,
    store: Arc<dyn ObjectStore>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, db: DatabaseConnection, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, db, store }
    }

    /// Rebuilds every table from what is currently in the bucket.
    ///
    /// A failed run leaves `stg_events` with the files committed so far and the derived
    /// tables empty; the next run starts over from schema recreation.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::default();

        recreate_schema(&self.db).await?;

        let catalog = ObjectCatalog::new(self.store.clone(), self.config.storage.max_object_size);
        let fetcher = ObjectFetcher::new(
            self.store.clone(),
            &self.config.storage,
            self.config.scratch_dir.clone(),
        );
        let loader = EventLoader::new(self.db.clone());

        let candidates = catalog
            .list_candidates(&self.config.storage.folder_name)
            .await?;

        for object in candidates {
            report.objects_accepted += 1;

            match ingest_object(&fetcher, &loader, &object).await {
                Ok(events) => {
                    report.objects_loaded += 1;
                    report.events_loaded += events;
                }
                Err(e)
                    if e.is_object_level()
                        && self.config.on_object_error == FailurePolicy::Skip =>
                {
                    warn!("⏭️  Skipping {}: {}", object, e);
                    report.objects_skipped.push(SkippedObject {
                        key: object.key.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "📥 Loaded {} event(s) from {} object(s)",
            report.events_loaded, report.objects_loaded
        );

        let aggregator = Aggregator::new(self.db.clone());
        report.staging = aggregator.build_staging_tables().await?;
        report.reporting = aggregator.build_final_tables().await?;

        Ok(report)
    }
}

/// Fetch and load one object. The scratch file is gone when this returns, whatever the outcome.
async fn ingest_object(
    fetcher: &ObjectFetcher,
    loader: &EventLoader,
    object: &StorageObject,
) -> Result<u64, PipelineError> {
    let file = fetcher.fetch(object).await?;
    let loaded = loader
        .load(&file)
        .await
        .map_err(|source| PipelineError::Load {
            key: object.key.clone(),
            source,
        });
    drop(file);
    loaded
}
