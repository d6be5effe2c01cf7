//! Jikan (unofficial MyAnimeList) provider
//!
//! Serves anime, light novels, manga and manhwa. Anime is looked up under
//! `/v4/anime`; every print category goes through `/v4/manga`, which is where
//! MyAnimeList files novels and manhwa as well.
use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Category, Enrichment, JikanSearchResponse},
    services::providers::Enricher,
};

#[derive(Clone)]
pub struct JikanProvider {
    http_client: HttpClient,
    api_url: String,
    cache: Cache,
    cache_ttl: Duration,
}

impl JikanProvider {
    pub fn new(http_client: HttpClient, api_url: String, cache: Cache, cache_ttl: Duration) -> Self {
        Self {
            http_client,
            api_url,
            cache,
            cache_ttl,
        }
    }

    fn resource(category: Category) -> AppResult<&'static str> {
        match category {
            Category::Anime => Ok("anime"),
            Category::Manga | Category::Manhwa | Category::LightNovels => Ok("manga"),
            other => Err(AppError::InvalidRequest(format!(
                "Jikan does not index {}",
                other
            ))),
        }
    }
}

#[async_trait::async_trait]
impl Enricher for JikanProvider {
    async fn fetch(&self, title: &str, category: Category) -> AppResult<Enrichment> {
        let resource = Self::resource(category)?;
        let key = CacheKey::Enrichment {
            provider: self.name(),
            category,
            title: title.to_string(),
        };

        cached!(self.cache, key, self.cache_ttl, async move {
            let url = format!("{}/v4/{}", self.api_url, resource);

            let response = self
                .http_client
                .get(&url)
                .query(&[("q", title), ("limit", "1")])
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ExternalApi(format!(
                    "Jikan API returned status {}: {}",
                    status, body
                )));
            }

            let search: JikanSearchResponse = response.json().await?;
            let enrichment = search
                .data
                .into_iter()
                .next()
                .map(Enrichment::from)
                .unwrap_or_default();

            tracing::debug!(
                title = %title,
                category = %category,
                found = !enrichment.is_empty(),
                "Jikan lookup completed"
            );

            Ok::<Enrichment, AppError>(enrichment)
        })
    }

    fn name(&self) -> &'static str {
        "jikan"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> JikanProvider {
        JikanProvider::new(
            HttpClient::new(),
            server.uri(),
            Cache::in_memory(),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_anime_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/anime"))
            .and(query_param("q", "Frieren"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "score": 9.3,
                    "images": { "jpg": { "image_url": "https://cdn.myanimelist.net/f.jpg" } }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server);
        let enrichment = provider.fetch("Frieren", Category::Anime).await.unwrap();
        assert_eq!(enrichment.external_rating, Some(9.3));
        assert_eq!(
            enrichment.cover_image.as_deref(),
            Some("https://cdn.myanimelist.net/f.jpg")
        );

        // Cached: the mock expects a single request
        let again = provider.fetch("frieren ", Category::Anime).await.unwrap();
        assert_eq!(again, enrichment);
    }

    #[tokio::test]
    async fn test_manhwa_uses_manga_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/manga"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "score": 8.7 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let enrichment = provider(&server)
            .fetch("Solo Leveling", Category::Manhwa)
            .await
            .unwrap();
        assert_eq!(enrichment.external_rating, Some(8.7));
        assert!(enrichment.cover_image.is_none());
    }

    #[tokio::test]
    async fn test_no_results_is_empty_enrichment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let enrichment = provider(&server)
            .fetch("Nothing", Category::Anime)
            .await
            .unwrap();
        assert!(enrichment.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let result = provider(&server).fetch("Frieren", Category::Anime).await;
        assert!(matches!(result, Err(AppError::HttpClient(_))));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = provider(&server).fetch("Frieren", Category::Anime).await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_unsupported_category() {
        let server = MockServer::start().await;
        let result = provider(&server).fetch("Tetris", Category::Games).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
