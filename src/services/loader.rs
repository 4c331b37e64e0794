use crate::entities::{prelude::*, stg_events};
use crate::error::{LineError, LoadError};
use crate::models::RawEvent;
use crate::services::fetcher::StorageFile;
use chrono::DateTime;
use sea_orm::{DatabaseConnection, DatabaseTransaction, EntityTrait, NotSet, Set, TransactionTrait};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tracing::{debug, info, warn};

/// Timestamp layout of the first column, e.g. `2021-06-01 10:15:00.123456 +0200`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

const FIELD_COUNT: usize = 5;

/// Parses one data line: timestamp, session hash, event name, user hash, attributes.
pub fn parse_line(line: &str) -> Result<RawEvent, LineError> {
    let fields: Vec<&str> = line.split('\t').collect();
    let [timestamp, session_id_md5, event_name, user_id_md5, attributes] = fields[..] else {
        return Err(LineError::FieldCount(fields.len()));
    };

    let timestamp = DateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|source| {
        LineError::Timestamp {
            value: timestamp.to_string(),
            source,
        }
    })?;

    let attributes = if attributes.is_empty() {
        Value::Object(Map::new())
    } else {
        match serde_json::from_str(attributes)? {
            object @ Value::Object(_) => object,
            _ => return Err(LineError::AttributesNotObject),
        }
    };

    Ok(RawEvent {
        timestamp,
        session_id_md5: session_id_md5.to_string(),
        event_name: event_name.to_string(),
        user_id_md5: user_id_md5.to_string(),
        attributes,
    })
}

impl From<RawEvent> for stg_events::ActiveModel {
    fn from(event: RawEvent) -> Self {
        stg_events::ActiveModel {
            id: NotSet,
            timestamp: Set(event.timestamp),
            session_id_md5: Set(event.session_id_md5),
            event_name: Set(event.event_name),
            user_id_md5: Set(event.user_id_md5),
            attributes: Set(event.attributes),
        }
    }
}

/// Appends the events of one source file to `stg_events`
pub struct EventLoader {
    db: DatabaseConnection,
}

impl EventLoader {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn load(&self, file: &StorageFile) -> Result<u64, LoadError> {
        self.load_path(file.path()).await
    }

    /// Loads every data line of `path` inside one transaction.
    ///
    /// The first line is a header and is skipped without inspection. Any malformed line
    /// rolls the whole file back.
    pub async fn load_path(&self, path: &Path) -> Result<u64, LoadError> {
        info!("📄 Reading file {}", path.display());
        let handle = tokio::fs::File::open(path).await?;
        let mut lines = BufReader::new(handle).split(b'\n');

        if lines.next_segment().await?.is_none() {
            warn!("File {} is empty, nothing to load", path.display());
            return Ok(0);
        }

        let txn = self.db.begin().await?;
        match append_events(&txn, &mut lines).await {
            Ok(count) => {
                txn.commit().await?;
                info!("✅ File {} loaded ({} events)", path.display(), count);
                Ok(count)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!(
                        "Rollback of {} failed after load error: {}",
                        path.display(),
                        rollback_err
                    );
                }
                Err(e)
            }
        }
    }
}

/// Blank lines (including a lone `\r`) decode to `None`
fn decode_line(bytes: Vec<u8>) -> Result<Option<RawEvent>, LineError> {
    let line = String::from_utf8(bytes)?;
    let line = line.strip_suffix('\r').unwrap_or(&line);
    if line.is_empty() {
        return Ok(None);
    }
    parse_line(line).map(Some)
}

async fn append_events(
    txn: &DatabaseTransaction,
    lines: &mut Split<BufReader<tokio::fs::File>>,
) -> Result<u64, LoadError> {
    let mut line_number = 1;
    let mut count = 0;

    while let Some(bytes) = lines.next_segment().await? {
        line_number += 1;
        let decoded = decode_line(bytes).map_err(|source| LoadError::Parse {
            line: line_number,
            source,
        })?;
        let Some(event) = decoded else { continue };
        debug!(?event, "Parsed line {}", line_number);

        StgEvents::insert(stg_events::ActiveModel::from(event))
            .exec(txn)
            .await?;
        count += 1;
    }

    Ok(count)
}
