use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reporting table: one row per article and day
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "article_performance")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub article_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: Date,
    pub title: String,
    pub category: String,
    pub card_views: i64,
    pub article_views: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
