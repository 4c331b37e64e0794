use clap::Parser;
use dotenvy::dotenv;
use event_pipeline::config::FailurePolicy;
use event_pipeline::infrastructure::{database, storage};
use event_pipeline::{Pipeline, PipelineConfig};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder (key prefix) to ingest; overrides AWS_FOLDER_NAME
    #[arg(long)]
    prefix: Option<String>,

    /// Largest object size accepted, in bytes; overrides MAX_OBJECT_SIZE
    #[arg(long)]
    max_object_size: Option<i64>,

    /// What to do when one object is rejected or fails to parse
    #[arg(long, value_enum)]
    on_object_error: Option<FailurePolicy>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "event_pipeline=info,sea_orm=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting event pipeline run...");

    // 2. Configuration
    let mut config = PipelineConfig::from_env();
    if let Some(prefix) = args.prefix {
        config.storage.folder_name = prefix;
    }
    if let Some(max_object_size) = args.max_object_size {
        config.storage.max_object_size = max_object_size;
    }
    if let Some(policy) = args.on_object_error {
        config.on_object_error = policy;
    }
    info!(
        "🛡️  Ingest Config: Max Size={} bytes, Content Types=[{}], On Object Error={:?}",
        config.storage.max_object_size,
        config.storage.allowed_content_types.join(", "),
        config.on_object_error
    );

    // 3. Infrastructure
    let db = database::setup_database(&config.database).await?;
    let store = storage::setup_storage(&config.storage).await;

    // 4. Run once
    let pipeline = Pipeline::new(config, db, store);
    match pipeline.run().await {
        Ok(report) => {
            for skipped in &report.objects_skipped {
                warn!("   - Skipped {}: {}", skipped.key, skipped.reason);
            }
            for step in report.staging.iter().chain(&report.reporting) {
                info!("   - {}: {} row(s)", step.table, step.rows);
            }
            info!(
                "👋 Run complete: {} event(s) from {} of {} object(s), {} skipped",
                report.events_loaded,
                report.objects_loaded,
                report.objects_accepted,
                report.objects_skipped.len()
            );
            Ok(())
        }
        Err(e) => {
            error!("❌ Run aborted ({:?}): {}", e.kind(), e);
            Err(e.into())
        }
    }
}
