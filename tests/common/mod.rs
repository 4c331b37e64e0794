#![allow(dead_code)]

use async_trait::async_trait;
use event_pipeline::entities::stg_events;
use event_pipeline::error::StorageError;
use event_pipeline::models::{ObjectMetadata, StorageObject};
use event_pipeline::services::storage::ObjectStore;
use sea_orm::{Database, DatabaseConnection, EntityTrait, NotSet, Set};
use serde_json::Value;
use std::sync::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const TSV: &str = "text/tab-separated-values";
pub const HEADER: &str = "timestamp\tsession_id_md5\tevent_name\tuser_id_md5\tattributes";
pub const SESSION: &str = "5d41402abc4b2a76b9719d911017c592";

pub async fn setup_test_db() -> DatabaseConnection {
    let _ = tracing_subscriber::fmt::try_init();
    let db = Database::connect("sqlite::memory:").await.unwrap();
    event_pipeline::infrastructure::database::recreate_schema(&db)
        .await
        .unwrap();
    db
}

/// A TSV body with the usual header followed by `lines`
pub fn tsv(lines: &[String]) -> Vec<u8> {
    let mut body = String::from(HEADER);
    for line in lines {
        body.push('\n');
        body.push_str(line);
    }
    body.push('\n');
    body.into_bytes()
}

pub fn event_line(timestamp: &str, event_name: &str, user: &str, attributes: &str) -> String {
    format!("{timestamp}\t{SESSION}\t{event_name}\t{user}\t{attributes}")
}

/// Inserts a raw event directly, bypassing the file loader
pub async fn insert_event(
    db: &DatabaseConnection,
    timestamp: &str,
    event_name: &str,
    user: &str,
    attributes: Value,
) {
    let timestamp = chrono::DateTime::parse_from_str(
        timestamp,
        event_pipeline::services::loader::TIMESTAMP_FORMAT,
    )
    .unwrap();
    let model = stg_events::ActiveModel {
        id: NotSet,
        timestamp: Set(timestamp),
        session_id_md5: Set(SESSION.to_string()),
        event_name: Set(event_name.to_string()),
        user_id_md5: Set(user.to_string()),
        attributes: Set(attributes),
    };
    stg_events::Entity::insert(model).exec(db).await.unwrap();
}

struct StoredObject {
    object: StorageObject,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// Object store fake that serves objects from memory, in insertion order
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<Vec<StoredObject>>,
    fail_listing: bool,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }

    pub fn put(&self, key: &str, content_type: &str, body: Vec<u8>) {
        self.put_with_size(key, content_type, body.len() as i64, body);
    }

    /// Stores an object whose listed size differs from its body length
    pub fn put_with_size(&self, key: &str, content_type: &str, size: i64, body: Vec<u8>) {
        self.objects.lock().unwrap().push(StoredObject {
            object: StorageObject {
                key: key.to_string(),
                size,
                last_modified: Some(chrono::Utc::now()),
            },
            content_type: Some(content_type.to_string()),
            body,
        });
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<StorageObject>, StorageError> {
        if self.fail_listing {
            return Err(StorageError::Request {
                operation: "ListObjectsV2",
                target: prefix.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|stored| stored.object.key.starts_with(prefix))
            .map(|stored| stored.object.clone())
            .collect())
    }

    async fn get_object_metadata(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let objects = self.objects.lock().unwrap();
        let stored = objects
            .iter()
            .find(|stored| stored.object.key == key)
            .ok_or_else(|| StorageError::Request {
                operation: "HeadObject",
                target: key.to_string(),
                message: "NotFound".to_string(),
            })?;
        Ok(ObjectMetadata {
            content_type: stored.content_type.clone(),
            size: stored.body.len() as i64,
        })
    }

    async fn download_object(
        &self,
        key: &str,
        dest: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let body = {
            let objects = self.objects.lock().unwrap();
            objects
                .iter()
                .find(|stored| stored.object.key == key)
                .map(|stored| stored.body.clone())
                .ok_or_else(|| StorageError::Request {
                    operation: "GetObject",
                    target: key.to_string(),
                    message: "NotFound".to_string(),
                })?
        };
        dest.write_all(&body).await?;
        dest.flush().await?;
        Ok(body.len() as u64)
    }
}
