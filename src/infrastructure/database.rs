use crate::config::DatabaseConfig;
use crate::entities::{
    article_performance, stg_article, stg_article_performance, stg_events,
    stg_user_performance, user_performance,
};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema, Statement,
};
use std::time::Duration;
use tracing::info;

/// Tables owned by the pipeline, in creation order. Dropped in reverse.
pub const PIPELINE_TABLES: [&str; 6] = [
    "stg_events",
    "stg_article",
    "stg_article_performance",
    "stg_user_performance",
    "article_performance",
    "user_performance",
];

pub async fn setup_database(config: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    info!(
        "📂 Database: {}:{}/{} (user: {})",
        config.host, config.port, config.name, config.user
    );

    // The run is sequential; one connection is reused for every load and phase
    let mut opt = ConnectOptions::new(config.connection_url());
    opt.max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    Ok(db)
}

/// Drops and recreates all six pipeline tables, leaving them empty
pub async fn recreate_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Recreating pipeline schema...");

    for table in PIPELINE_TABLES.iter().rev() {
        db.execute(Statement::from_string(
            builder,
            format!("DROP TABLE IF EXISTS {}", table),
        ))
        .await?;
    }

    let stmts = vec![
        schema.create_table_from_entity(stg_events::Entity),
        schema.create_table_from_entity(stg_article::Entity),
        schema.create_table_from_entity(stg_article_performance::Entity),
        schema.create_table_from_entity(stg_user_performance::Entity),
        schema.create_table_from_entity(article_performance::Entity),
        schema.create_table_from_entity(user_performance::Entity),
    ];

    for (name, stmt) in PIPELINE_TABLES.iter().zip(stmts) {
        db.execute(builder.build(&stmt)).await?;
        info!("   - Table '{}' created", name);
    }

    Ok(())
}
