use serde::{Deserialize, Serialize};

pub mod content;
pub mod history;
pub mod mood;

pub use content::{CatalogRecord, Category, ContentItem, Enrichment};
pub use history::{
    CreateUserRequest, HistoryEntry, NewHistoryEntry, StoredRecommendation, UserProfile,
};
pub use mood::MoodLabel;

/// Preference query accepted by the recommendation pipeline
///
/// Categories are kept as raw strings: unknown names are dropped during search
/// rather than rejected here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: String,
    #[serde(alias = "content_types")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    #[serde(default)]
    pub moods: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_ids: Option<Vec<String>>,
    /// Signed so that zero and negative values can be reported as invalid
    #[serde(default)]
    pub count: Option<i64>,
}

/// One ranked entry of a recommendation batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedRecommendation {
    pub content_id: String,
    pub title: String,
    pub category: Category,
    pub genres: Vec<String>,
    pub moods: Vec<String>,
    pub rating: f64,
    pub description: String,
    pub explanation: String,
    /// 1-based, dense within the batch
    pub rank: u32,
    pub external_rating: Option<f64>,
    pub cover_image: Option<String>,
}

/// Output of a single `resolve` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedResult {
    pub batch_id: String,
    pub recommendations: Vec<RankedRecommendation>,
}

/// Wire response for `POST /recommendations`
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub batch_id: String,
    pub count: usize,
    pub recommendations: Vec<RankedRecommendation>,
}

// ============================================================================
// Jikan (MyAnimeList) API Types
// ============================================================================

/// Response from `GET /v4/{anime|manga}?q=...`
#[derive(Debug, Clone, Deserialize)]
pub struct JikanSearchResponse {
    #[serde(default)]
    pub data: Vec<JikanEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanEntry {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub images: Option<JikanImages>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImages {
    #[serde(default)]
    pub jpg: Option<JikanImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JikanImage {
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<JikanEntry> for Enrichment {
    fn from(entry: JikanEntry) -> Self {
        Enrichment {
            external_rating: entry.score,
            cover_image: entry
                .images
                .and_then(|images| images.jpg)
                .and_then(|jpg| jpg.image_url),
        }
    }
}

// ============================================================================
// OMDb (IMDb) API Types
// ============================================================================

/// Response from `GET /?t=...` ; absent values come back as the string "N/A"
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbTitle {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "imdbRating", default)]
    pub imdb_rating: Option<String>,
    #[serde(rename = "Poster", default)]
    pub poster: Option<String>,
}

impl From<OmdbTitle> for Enrichment {
    fn from(title: OmdbTitle) -> Self {
        let present = |value: Option<String>| value.filter(|v| !v.is_empty() && v != "N/A");

        Enrichment {
            external_rating: present(title.imdb_rating).and_then(|r| r.parse::<f64>().ok()),
            cover_image: present(title.poster),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_content_types_alias() {
        let json = r#"{"user_id": "u1", "content_types": ["anime"], "genres": ["action"]}"#;
        let request: RecommendationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.categories, vec!["anime".to_string()]);
        assert_eq!(request.genres, Some(vec!["action".to_string()]));
        assert_eq!(request.moods, None);
        assert_eq!(request.count, None);
    }

    #[test]
    fn test_jikan_entry_to_enrichment() {
        let json = r#"{
            "data": [{
                "score": 8.62,
                "images": {"jpg": {"image_url": "https://cdn.myanimelist.net/images/anime/1/1.jpg"}}
            }]
        }"#;

        let response: JikanSearchResponse = serde_json::from_str(json).unwrap();
        let enrichment: Enrichment = response.data.into_iter().next().unwrap().into();
        assert_eq!(enrichment.external_rating, Some(8.62));
        assert_eq!(
            enrichment.cover_image.as_deref(),
            Some("https://cdn.myanimelist.net/images/anime/1/1.jpg")
        );
    }

    #[test]
    fn test_jikan_entry_without_images() {
        let entry: JikanEntry = serde_json::from_str(r#"{"score": null}"#).unwrap();
        let enrichment: Enrichment = entry.into();
        assert!(enrichment.is_empty());
    }

    #[test]
    fn test_omdb_title_to_enrichment() {
        let json = r#"{"Response": "True", "imdbRating": "8.8", "Poster": "https://m.media-amazon.com/x.jpg"}"#;
        let title: OmdbTitle = serde_json::from_str(json).unwrap();
        let enrichment: Enrichment = title.into();
        assert_eq!(enrichment.external_rating, Some(8.8));
        assert_eq!(
            enrichment.cover_image.as_deref(),
            Some("https://m.media-amazon.com/x.jpg")
        );
    }

    #[test]
    fn test_omdb_title_not_available_fields() {
        let json = r#"{"Response": "True", "imdbRating": "N/A", "Poster": "N/A"}"#;
        let title: OmdbTitle = serde_json::from_str(json).unwrap();
        let enrichment: Enrichment = title.into();
        assert!(enrichment.is_empty());
    }
}
