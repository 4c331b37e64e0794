use crate::config::StorageConfig;
use crate::error::FetchError;
use crate::models::StorageObject;
use crate::services::storage::ObjectStore;
use crate::utils::validation::is_content_type_allowed;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

/// Local copy of one object. The scratch file is deleted when this value is dropped.
#[derive(Debug)]
pub struct StorageFile {
    key: String,
    content_type: String,
    size: u64,
    file: NamedTempFile,
}

impl StorageFile {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

pub struct ObjectFetcher {
    store: Arc<dyn ObjectStore>,
    allowed_content_types: Vec<String>,
    scratch_dir: Option<PathBuf>,
}

impl ObjectFetcher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: &StorageConfig,
        scratch_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            allowed_content_types: config.allowed_content_types.clone(),
            scratch_dir,
        }
    }

    /// Downloads `object` into a fresh scratch file and checks its declared content type.
    ///
    /// The body is fully staged before the check runs; on rejection the scratch file is
    /// removed before the error is returned.
    pub async fn fetch(&self, object: &StorageObject) -> Result<StorageFile, FetchError> {
        let metadata = self.store.get_object_metadata(&object.key).await?;
        info!(
            "🔎 Fetched metadata for object {}: content_type={:?}, size={}",
            object, metadata.content_type, metadata.size
        );
        let content_type = metadata.content_type.unwrap_or_default();

        let temp_file = self.create_scratch_file()?;
        info!(
            "Created scratch file to store object content at {}",
            temp_file.path().display()
        );

        let mut writer = tokio::fs::File::from_std(temp_file.reopen()?);
        let size = self
            .store
            .download_object(&object.key, &mut writer)
            .await?;
        writer.flush().await?;
        drop(writer);

        let file = StorageFile {
            key: object.key.clone(),
            content_type,
            size,
            file: temp_file,
        };
        info!(
            "⬇️  Completed download of {} ({} bytes) at {}",
            object,
            file.size,
            file.path().display()
        );

        if !is_content_type_allowed(&file.content_type, &self.allowed_content_types) {
            let err = FetchError::ContentTypeRejected {
                key: file.key.clone(),
                content_type: file.content_type.clone(),
                allowed: self.allowed_content_types.join(", "),
                scratch_path: file.path().to_path_buf(),
            };
            error!("{}", err);
            drop(file);
            return Err(err);
        }

        Ok(file)
    }

    fn create_scratch_file(&self) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("events-").suffix(".tsv");
        match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}
