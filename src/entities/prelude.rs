pub use super::article_performance::Entity as ArticlePerformance;
pub use super::stg_article::Entity as StgArticle;
pub use super::stg_article_performance::Entity as StgArticlePerformance;
pub use super::stg_events::Entity as StgEvents;
pub use super::stg_user_performance::Entity as StgUserPerformance;
pub use super::user_performance::Entity as UserPerformance;
