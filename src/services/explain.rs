//! Explanation generation
//!
//! The deterministic template is always available and is the fallback for any
//! pluggable [`Explainer`]. Remote explainers may fail or time out freely; the
//! ranker never lets that reach the caller.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::ContentItem,
    services::recommendations::ResolvedQuery,
};

/// Deterministic explanation for an item
///
/// `matched_genres` and `matched_moods` are the request tags the item satisfied.
pub fn template_explanation(
    item: &ContentItem,
    matched_genres: &[String],
    matched_moods: &[String],
) -> String {
    let genres = if matched_genres.is_empty() {
        "mixed".to_string()
    } else {
        matched_genres.join(", ")
    };
    let moods = if matched_moods.is_empty() {
        "various".to_string()
    } else {
        matched_moods.join(", ")
    };

    format!(
        "This {} with {} genres matches your {} preference.",
        item.category.label(),
        genres,
        moods
    )
}

/// Natural-language rationale generator
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Explainer: Send + Sync {
    async fn generate(&self, item: &ContentItem, query: &ResolvedQuery) -> AppResult<String>;

    fn name(&self) -> &'static str;
}

/// Gemini `generateContent` explainer
#[derive(Clone)]
pub struct GeminiExplainer {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    cache: Cache,
    cache_ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiExplainer {
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        model: String,
        cache: Cache,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            http_client,
            api_key,
            api_url,
            model,
            cache,
            cache_ttl,
        }
    }

    fn prompt(item: &ContentItem, query: &ResolvedQuery) -> String {
        let genres = if query.genres.is_empty() {
            "any".to_string()
        } else {
            query.genres.join(", ")
        };
        let moods = if query.mood_labels.is_empty() {
            "any".to_string()
        } else {
            query.mood_labels.join(", ")
        };

        format!(
            "Write a compelling 2-3 sentence recommendation for \"{}\" ({}).\n\
             Description: {}\n\
             The user wants genres: {}. Their mood: {}.\n\
             Explain why it fits. Reply with plain text only.",
            item.title,
            item.category.label(),
            item.description,
            genres,
            moods
        )
    }

    fn extract_text(response: GenerateContentResponse) -> AppResult<String> {
        response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
            .ok_or_else(|| AppError::ExternalApi("Gemini returned no text".to_string()))
    }
}

#[async_trait::async_trait]
impl Explainer for GeminiExplainer {
    async fn generate(&self, item: &ContentItem, query: &ResolvedQuery) -> AppResult<String> {
        let key = CacheKey::Explanation {
            content_id: format!("{}:{}", item.category, item.id),
            signature: query.signature(),
        };

        cached!(self.cache, key, self.cache_ttl, async move {
            let url = format!(
                "{}/v1beta/models/{}:generateContent",
                self.api_url, self.model
            );

            let response = self
                .http_client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&json!({
                    "contents": [{ "parts": [{ "text": Self::prompt(item, query) }] }]
                }))
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::ExternalApi(format!(
                    "Gemini API returned status {}: {}",
                    status, body
                )));
            }

            let parsed: GenerateContentResponse = response.json().await?;
            let text = Self::extract_text(parsed)?;

            tracing::debug!(content_id = %item.id, provider = "gemini", "Explanation generated");

            Ok::<String, AppError>(text)
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(category: Category) -> ContentItem {
        ContentItem {
            id: "a1".to_string(),
            title: "Ronin".to_string(),
            category,
            genres: vec!["action".to_string()],
            moods: vec!["intense".to_string()],
            rating: 8.5,
            description: "A wandering swordsman.".to_string(),
        }
    }

    fn explainer(server: &MockServer) -> GeminiExplainer {
        GeminiExplainer::new(
            HttpClient::new(),
            "test_key".to_string(),
            server.uri(),
            "gemini-test".to_string(),
            Cache::in_memory(),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_template_with_matches() {
        let text = template_explanation(
            &item(Category::Anime),
            &["action".to_string()],
            &["intense".to_string(), "epic".to_string()],
        );
        assert_eq!(
            text,
            "This anime with action genres matches your intense, epic preference."
        );
    }

    #[test]
    fn test_template_without_matches_uses_placeholders() {
        let text = template_explanation(&item(Category::WebSeries), &[], &[]);
        assert_eq!(
            text,
            "This web series with mixed genres matches your various preference."
        );
    }

    #[tokio::test]
    async fn test_gemini_explainer_extracts_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "  Pure adrenaline.  " }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let explainer = explainer(&server);
        let query = ResolvedQuery::for_tests(&["action"], &["excited"]);
        let text = explainer.generate(&item(Category::Anime), &query).await.unwrap();
        assert_eq!(text, "Pure adrenaline.");

        // Second call is served from cache; the mock expects exactly one hit
        let again = explainer.generate(&item(Category::Anime), &query).await.unwrap();
        assert_eq!(again, "Pure adrenaline.");
    }

    #[tokio::test]
    async fn test_gemini_explainer_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota"))
            .mount(&server)
            .await;

        let result = explainer(&server)
            .generate(&item(Category::Anime), &ResolvedQuery::for_tests(&[], &[]))
            .await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_gemini_explainer_empty_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let result = explainer(&server)
            .generate(&item(Category::Anime), &ResolvedQuery::for_tests(&[], &[]))
            .await;
        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }

    #[tokio::test]
    async fn test_gemini_transport_error_does_not_expose_key() {
        let explainer = GeminiExplainer::new(
            HttpClient::new(),
            "SECRET_GEMINI_KEY".to_string(),
            "http://127.0.0.1:9".to_string(),
            "gemini-test".to_string(),
            Cache::in_memory(),
            Duration::from_secs(60),
        );

        let err = explainer
            .generate(&item(Category::Anime), &ResolvedQuery::for_tests(&[], &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::HttpClient(_)));
        assert!(!err.to_string().contains("SECRET_GEMINI_KEY"));
    }
}
