use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, Statement, TransactionTrait,
};
use tracing::info;

/// Event counted in the `card_views` column
pub const ARTICLE_VIEWED: &str = "article_viewed";
/// Events counted together in the `article_views` column
pub const CARD_VIEWED_EVENTS: [&str; 2] = ["top_news_card_viewed", "my_news_card_viewed"];

/// Backend-specific fragments of the aggregation SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlDialect {
    Postgres,
    Sqlite,
}

impl SqlDialect {
    fn for_backend(backend: DatabaseBackend) -> Result<Self, DbErr> {
        match backend {
            DatabaseBackend::Postgres => Ok(Self::Postgres),
            DatabaseBackend::Sqlite => Ok(Self::Sqlite),
            other => Err(DbErr::Custom(format!(
                "aggregation is not supported on {:?}",
                other
            ))),
        }
    }

    /// Calendar day (UTC) of an event
    fn event_day(self) -> &'static str {
        match self {
            Self::Postgres => r#"CAST("timestamp" AT TIME ZONE 'UTC' AS DATE)"#,
            Self::Sqlite => r#"DATE("timestamp")"#,
        }
    }

    /// Expression ordering events by instant regardless of their UTC offset
    fn event_instant(self) -> &'static str {
        match self {
            Self::Postgres => r#""timestamp""#,
            Self::Sqlite => r#"JULIANDAY("timestamp")"#,
        }
    }
}

fn quoted_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v))
        .collect::<Vec<_>>()
        .join(", ")
}

struct AggregationStep {
    table: &'static str,
    sources: &'static str,
    sql: fn(SqlDialect) -> String,
}

const STAGING_STEPS: [AggregationStep; 3] = [
    AggregationStep {
        table: "stg_article",
        sources: "stg_events",
        sql: stg_article_sql,
    },
    AggregationStep {
        table: "stg_article_performance",
        sources: "stg_events",
        sql: stg_article_performance_sql,
    },
    AggregationStep {
        table: "stg_user_performance",
        sources: "stg_events",
        sql: stg_user_performance_sql,
    },
];

const FINAL_STEPS: [AggregationStep; 2] = [
    AggregationStep {
        table: "article_performance",
        sources: "stg_article, stg_article_performance",
        sql: article_performance_sql,
    },
    AggregationStep {
        table: "user_performance",
        sources: "stg_user_performance",
        sql: user_performance_sql,
    },
];

/// Latest title and category per article, picked from the last event carrying both
fn stg_article_sql(dialect: SqlDialect) -> String {
    format!(
        r#"INSERT INTO stg_article (article_id, title, category)
SELECT article_id, title, category
FROM (
    SELECT
        ("attributes" ->> 'id') AS article_id,
        ("attributes" ->> 'title') AS title,
        ("attributes" ->> 'category') AS category,
        ROW_NUMBER() OVER (
            PARTITION BY ("attributes" ->> 'id')
            ORDER BY {instant} DESC, id DESC
        ) AS recency
    FROM stg_events
    WHERE ("attributes" ->> 'id') IS NOT NULL
      AND ("attributes" ->> 'title') IS NOT NULL
      AND ("attributes" ->> 'category') IS NOT NULL
) latest
WHERE recency = 1"#,
        instant = dialect.event_instant(),
    )
}

/// `article_viewed` feeds `card_views`; the card events feed `article_views`
fn stg_article_performance_sql(dialect: SqlDialect) -> String {
    let card_events = quoted_list(&CARD_VIEWED_EVENTS);
    format!(
        r#"INSERT INTO stg_article_performance (article_id, "date", card_views, article_views)
SELECT
    ("attributes" ->> 'id') AS article_id,
    {day} AS day,
    COUNT(*) FILTER (WHERE event_name = '{article_viewed}') AS card_views,
    COUNT(*) FILTER (WHERE event_name IN ({card_events})) AS article_views
FROM stg_events
WHERE event_name IN ('{article_viewed}', {card_events})
  AND ("attributes" ->> 'id') IS NOT NULL
GROUP BY 1, 2"#,
        day = dialect.event_day(),
        article_viewed = ARTICLE_VIEWED,
    )
}

/// Ratio of `article_viewed` to card events per user and day, 0 when there were no card events
fn stg_user_performance_sql(dialect: SqlDialect) -> String {
    let card_events = quoted_list(&CARD_VIEWED_EVENTS);
    format!(
        r#"INSERT INTO stg_user_performance (user_id, "date", ctr)
SELECT
    user_id_md5 AS user_id,
    {day} AS day,
    COALESCE(
        CAST(COUNT(*) FILTER (WHERE event_name = '{article_viewed}') AS DOUBLE PRECISION)
            / NULLIF(COUNT(*) FILTER (WHERE event_name IN ({card_events})), 0),
        0
    ) AS ctr
FROM stg_events
WHERE user_id_md5 IS NOT NULL
GROUP BY 1, 2"#,
        day = dialect.event_day(),
        article_viewed = ARTICLE_VIEWED,
    )
}

fn article_performance_sql(_: SqlDialect) -> String {
    r#"INSERT INTO article_performance (article_id, "date", title, category, card_views, article_views)
SELECT
    sap.article_id,
    sap."date",
    sa.title,
    sa.category,
    sap.card_views,
    sap.article_views
FROM stg_article_performance sap
JOIN stg_article sa ON sa.article_id = sap.article_id"#
        .to_string()
}

fn user_performance_sql(_: SqlDialect) -> String {
    r#"INSERT INTO user_performance (article_id, "date", ctr)
SELECT user_id, "date", ctr
FROM stg_user_performance"#
        .to_string()
}

/// Rows written by one aggregation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub table: &'static str,
    pub rows: u64,
}

/// Turns `stg_events` into the staging and reporting tables.
///
/// Both phases expect freshly recreated tables and run as one transaction each.
pub struct Aggregator {
    db: DatabaseConnection,
}

impl Aggregator {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Builds `stg_article`, `stg_article_performance` and `stg_user_performance`, in that order
    pub async fn build_staging_tables(&self) -> Result<Vec<StepReport>, DbErr> {
        self.run_phase("staging", &STAGING_STEPS).await
    }

    /// Builds `article_performance` and `user_performance` from the staging tables
    pub async fn build_final_tables(&self) -> Result<Vec<StepReport>, DbErr> {
        self.run_phase("final", &FINAL_STEPS).await
    }

    async fn run_phase(
        &self,
        phase: &str,
        steps: &[AggregationStep],
    ) -> Result<Vec<StepReport>, DbErr> {
        let backend = self.db.get_database_backend();
        let dialect = SqlDialect::for_backend(backend)?;
        let txn = self.db.begin().await?;
        let mut reports = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            info!(
                "🏗️  Building {} table ({} of {}): {} (from: {})",
                phase,
                index + 1,
                steps.len(),
                step.table,
                step.sources
            );
            let result = txn
                .execute(Statement::from_string(backend, (step.sql)(dialect)))
                .await?;
            reports.push(StepReport {
                table: step.table,
                rows: result.rows_affected(),
            });
        }

        txn.commit().await?;
        info!("✅ {} tables built", phase);
        Ok(reports)
    }
}
