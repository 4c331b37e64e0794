use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Raw events, appended once per source line and never updated
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stg_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub timestamp: DateTimeWithTimeZone,
    pub session_id_md5: String,
    pub event_name: String,
    pub user_id_md5: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub attributes: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
