use sea_orm::DbErr;
use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the object store
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{operation} failed for '{target}': {message}")]
    Request {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("Failed to write object body: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{key} has an unsupported content type: {content_type} (supported: {allowed})")]
    ContentTypeRejected {
        key: String,
        content_type: String,
        allowed: String,
        /// Where the body was staged; already removed when this error is returned
        scratch_path: PathBuf,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Scratch file error: {0}")]
    Scratch(#[from] std::io::Error),
}

/// A source line that cannot be turned into an event
#[derive(Error, Debug)]
pub enum LineError {
    #[error("expected 5 tab-separated fields, found {0}")]
    FieldCount(usize),

    #[error("malformed timestamp '{value}': {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("malformed attributes: {0}")]
    Attributes(#[from] serde_json::Error),

    #[error("attributes must be a JSON object")]
    AttributesNotObject,

    #[error("line is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Parse error at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: LineError,
    },

    #[error("Failed to read source file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Sink(#[from] DbErr),
}

/// Coarse classification used to decide between skipping an object and aborting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ContentTypeRejected,
    Parse,
    Sink,
    Retrieval,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to load '{key}': {source}")]
    Load {
        key: String,
        #[source]
        source: LoadError,
    },

    #[error("Storage error: {0}")]
    Retrieval(#[from] StorageError),

    #[error("Database error: {0}")]
    Sink(#[from] DbErr),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Fetch(FetchError::ContentTypeRejected { .. }) => {
                ErrorKind::ContentTypeRejected
            }
            PipelineError::Fetch(_) | PipelineError::Retrieval(_) => ErrorKind::Retrieval,
            PipelineError::Load { source, .. } => match source {
                LoadError::Parse { .. } => ErrorKind::Parse,
                LoadError::Io(_) => ErrorKind::Retrieval,
                LoadError::Sink(_) => ErrorKind::Sink,
            },
            PipelineError::Sink(_) => ErrorKind::Sink,
        }
    }

    /// Failures confined to one object; everything else always aborts the run
    pub fn is_object_level(&self) -> bool {
        matches!(self.kind(), ErrorKind::ContentTypeRejected | ErrorKind::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let rejected = PipelineError::from(FetchError::ContentTypeRejected {
            key: "events/2021-01-01.tsv".to_string(),
            content_type: "text/csv".to_string(),
            allowed: "text/tab-separated-values".to_string(),
            scratch_path: PathBuf::from("/tmp/x"),
        });
        assert_eq!(rejected.kind(), ErrorKind::ContentTypeRejected);
        assert!(rejected.is_object_level());

        let parse = PipelineError::Load {
            key: "events/2021-01-01.tsv".to_string(),
            source: LoadError::Parse {
                line: 2,
                source: LineError::FieldCount(3),
            },
        };
        assert_eq!(parse.kind(), ErrorKind::Parse);
        assert!(parse.is_object_level());

        let sink = PipelineError::from(DbErr::Custom("connection reset".to_string()));
        assert_eq!(sink.kind(), ErrorKind::Sink);
        assert!(!sink.is_object_level());

        let listing = PipelineError::from(StorageError::Request {
            operation: "ListObjectsV2",
            target: "events/".to_string(),
            message: "timeout".to_string(),
        });
        assert_eq!(listing.kind(), ErrorKind::Retrieval);
        assert!(!listing.is_object_level());
    }

    #[test]
    fn test_rejection_message() {
        let err = FetchError::ContentTypeRejected {
            key: "events/2021-01-01.tsv".to_string(),
            content_type: "text/csv".to_string(),
            allowed: "text/tab-separated-values".to_string(),
            scratch_path: PathBuf::from("/tmp/x"),
        };
        assert_eq!(
            err.to_string(),
            "events/2021-01-01.tsv has an unsupported content type: text/csv (supported: text/tab-separated-values)"
        );
    }
}
