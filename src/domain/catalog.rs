use super::ArticleSummary;
use crate::library::BoxedError;
use async_trait::async_trait;

/// Source of truth for articles
#[async_trait]
pub trait ArticleSource {
    /// Fetches an article by its identifier on behalf of the owner of the token.
    ///
    /// Returns `Ok(None)` if the article does not exist and an error if the source could not
    /// be queried. Disabled articles are returned as-is.
    async fn fetch_article(
        &self,
        article_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<ArticleSummary>, BoxedError>;
}

/// Article lookups as used by the rest of the service
///
/// Implementations fail closed: an article that could not be confirmed in time is reported
/// exactly like one that does not exist.
#[async_trait]
pub trait ArticleCatalog: Sync {
    /// Retrieves the article if it exists and is enabled
    async fn get(&self, article_id: &str, auth_token: Option<&str>) -> Option<ArticleSummary>;

    /// Whether the article exists and is enabled
    async fn exists(&self, article_id: &str, auth_token: Option<&str>) -> bool {
        self.get(article_id, auth_token).await.is_some()
    }
}
