use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reporting table: click-through ratio per user and day
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_performance")]
pub struct Model {
    /// Holds the user hash; the column name is part of the published schema
    #[sea_orm(primary_key, auto_increment = false)]
    pub article_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: Date,
    pub ctr: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
