//! OMDb provider for movies and web series
use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Category, Enrichment, OmdbTitle},
    services::providers::Enricher,
};

#[derive(Clone)]
pub struct OmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
    cache_ttl: Duration,
}

impl OmdbProvider {
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        cache: Cache,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            cache,
            cache_ttl,
        }
    }

    /// OMDb `type` filter for a category
    fn title_type(category: Category) -> AppResult<&'static str> {
        match category {
            Category::Movies => Ok("movie"),
            Category::WebSeries => Ok("series"),
            other => Err(AppError::InvalidRequest(format!(
                "OMDb does not index {}",
                other
            ))),
        }
    }
}

/// Drops the request URL, which carries the API key, from client errors
fn redact(error: reqwest::Error) -> AppError {
    AppError::HttpClient(error.without_url())
}

#[async_trait::async_trait]
impl Enricher for OmdbProvider {
    async fn fetch(&self, title: &str, category: Category) -> AppResult<Enrichment> {
        let title_type = Self::title_type(category)?;
        let key = CacheKey::Enrichment {
            provider: self.name(),
            category,
            title: title.to_string(),
        };

        cached!(self.cache, key, self.cache_ttl, async move {
            let response = self
                .http_client
                .get(format!("{}/", self.api_url))
                .query(&[
                    ("apikey", self.api_key.as_str()),
                    ("t", title),
                    ("type", title_type),
                ])
                .send()
                .await
                .map_err(redact)?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ExternalApi(format!(
                    "OMDb API returned status {}: {}",
                    status, body
                )));
            }

            let found: OmdbTitle = response.json().await.map_err(redact)?;

            // OMDb answers 200 with Response=False for unknown titles
            let enrichment = if found.response.eq_ignore_ascii_case("true") {
                Enrichment::from(found)
            } else {
                Enrichment::default()
            };

            tracing::debug!(
                title = %title,
                category = %category,
                found = !enrichment.is_empty(),
                "OMDb lookup completed"
            );

            Ok::<Enrichment, AppError>(enrichment)
        })
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}
