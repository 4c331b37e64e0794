use clap::ValueEnum;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Largest object accepted from the source bucket (default: 10,240,000 bytes)
pub const DEFAULT_MAX_OBJECT_SIZE: i64 = 10_240_000;

pub const TSV_CONTENT_TYPE: &str = "text/tab-separated-values";

/// What the pipeline does when a single object fails validation or parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FailurePolicy {
    /// Stop the run on the first object-level failure
    #[default]
    Abort,
    /// Log the failure, release the object and continue with the next one
    Skip,
}

/// Source bucket settings
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket holding the event logs
    pub bucket_name: String,

    /// Folder (key prefix) listed on every run
    pub folder_name: String,

    /// Maximum accepted object size in bytes
    pub max_object_size: i64,

    /// Accepted `Content-Type` values (default: text/tab-separated-values only)
    pub allowed_content_types: Vec<String>,

    /// Custom S3 endpoint, e.g. MinIO (default: AWS)
    pub endpoint_url: Option<String>,

    /// Region override (default: resolved by the AWS provider chain)
    pub region: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            folder_name: String::new(),
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            allowed_content_types: vec![TSV_CONTENT_TYPE.to_string()],
            endpoint_url: None,
            region: None,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bucket_name: env::var("AWS_BUCKET_NAME").unwrap_or(default.bucket_name),

            folder_name: env::var("AWS_FOLDER_NAME").unwrap_or(default.folder_name),

            max_object_size: env::var("MAX_OBJECT_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_object_size),

            allowed_content_types: env::var("ALLOWED_CONTENT_TYPES")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|types| !types.is_empty())
                .unwrap_or(default.allowed_content_types),

            endpoint_url: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),

            region: env::var("AWS_REGION").ok().filter(|v| !v.is_empty()),
        }
    }
}

/// Relational sink connection settings
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,

    /// Full connection URL; takes precedence over the individual parts
    pub url: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "postgres".to_string(),
            url: None,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("name", &self.name)
            .field("url", &self.url.as_ref().map(|_| "***"))
            .finish()
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            host: env::var("DB_HOST").unwrap_or(default.host),

            port: env::var("DB_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            user: env::var("DB_USER").unwrap_or(default.user),

            password: env::var("DB_PASSWORD").unwrap_or(default.password),

            // DB_TABLE is the name older deployments used for the database name
            name: env::var("DB_NAME")
                .or_else(|_| env::var("DB_TABLE"))
                .unwrap_or(default.name),

            url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Connection URL handed to the database driver
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        format!(
            "postgres://{}:{}@{}:{}/{}",
            utf8_percent_encode(&self.user, NON_ALPHANUMERIC),
            utf8_percent_encode(&self.password, NON_ALPHANUMERIC),
            self.host,
            self.port,
            utf8_percent_encode(&self.name, NON_ALPHANUMERIC),
        )
    }
}

/// Everything a single pipeline run needs, built once at startup
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub storage: StorageConfig,
    pub database: DatabaseConfig,

    /// Directory for downloaded objects (default: system temp dir)
    pub scratch_dir: Option<PathBuf>,

    pub on_object_error: FailurePolicy,
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            storage: StorageConfig::from_env(),
            database: DatabaseConfig::from_env(),
            scratch_dir: env::var("SCRATCH_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            on_object_error: env::var("ON_OBJECT_ERROR")
                .ok()
                .and_then(|v| FailurePolicy::from_str(v.trim(), true).ok())
                .unwrap_or_default(),
        }
    }
}
