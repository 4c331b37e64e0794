use crate::error::StorageError;
use crate::models::StorageObject;
use crate::services::storage::ObjectStore;
use crate::utils::validation::{is_key_allowed, is_size_allowed};
use std::sync::Arc;
use tracing::info;

/// Lists the source folder and keeps the objects worth downloading
pub struct ObjectCatalog {
    store: Arc<dyn ObjectStore>,
    max_object_size: i64,
}

impl ObjectCatalog {
    pub fn new(store: Arc<dyn ObjectStore>, max_object_size: i64) -> Self {
        Self {
            store,
            max_object_size,
        }
    }

    /// Lists `prefix` once and yields the objects passing both the size and the key gate.
    ///
    /// The returned iterator is consumed once; call again to re-list. Objects come out in
    /// the order the store listed them.
    pub async fn list_candidates(&self, prefix: &str) -> Result<Candidates, StorageError> {
        let objects = self.store.list_objects(prefix).await?;
        info!(
            "📦 Found {} object(s) listed under '{}'",
            objects.len(),
            prefix
        );

        Ok(Candidates {
            listed: objects.into_iter(),
            max_object_size: self.max_object_size,
        })
    }
}

/// Pull-based view over one listing; gates are evaluated as objects are pulled
pub struct Candidates {
    listed: std::vec::IntoIter<StorageObject>,
    max_object_size: i64,
}

impl Iterator for Candidates {
    type Item = StorageObject;

    fn next(&mut self) -> Option<Self::Item> {
        let max_object_size = self.max_object_size;
        self.listed
            .by_ref()
            .find(|object| check_object(object, max_object_size))
    }
}

fn check_object(object: &StorageObject, max_object_size: i64) -> bool {
    let is_size_ok = is_size_allowed(object.size, max_object_size);
    let is_key_ok = is_key_allowed(&object.key);
    info!(
        "Checked object '{}' size ({}) and key ({})",
        object,
        if is_size_ok { "OK" } else { "KO" },
        if is_key_ok { "OK" } else { "KO" }
    );
    is_size_ok && is_key_ok
}
