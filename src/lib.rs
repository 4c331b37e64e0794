//! Batch job that loads daily event-log exports from S3 into Postgres and rebuilds the
//! article and user performance reports from them.

pub mod config;
pub mod entities;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError};
pub use services::pipeline::{Pipeline, RunReport};
