pub mod prelude;

pub mod stg_events;

pub mod stg_article;
pub mod stg_article_performance;
pub mod stg_user_performance;

pub mod article_performance;
pub mod user_performance;
