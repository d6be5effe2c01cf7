use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Kind of content a catalog partition holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Anime,
    Movies,
    WebSeries,
    Manga,
    Manhwa,
    Comics,
    LightNovels,
    Novels,
    Games,
}

impl Category {
    /// Every category, in catalog load order
    pub const ALL: [Category; 9] = [
        Category::Anime,
        Category::Movies,
        Category::WebSeries,
        Category::Manga,
        Category::Manhwa,
        Category::Comics,
        Category::LightNovels,
        Category::Novels,
        Category::Games,
    ];

    /// Wire name, also the catalog file stem (e.g. `web_series.json`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Anime => "anime",
            Category::Movies => "movies",
            Category::WebSeries => "web_series",
            Category::Manga => "manga",
            Category::Manhwa => "manhwa",
            Category::Comics => "comics",
            Category::LightNovels => "light_novels",
            Category::Novels => "novels",
            Category::Games => "games",
        }
    }

    /// Singular, human-readable name used in explanations
    pub fn label(&self) -> &'static str {
        match self {
            Category::Anime => "anime",
            Category::Movies => "movie",
            Category::WebSeries => "web series",
            Category::Manga => "manga",
            Category::Manhwa => "manhwa",
            Category::Comics => "comic",
            Category::LightNovels => "light novel",
            Category::Novels => "novel",
            Category::Games => "game",
        }
    }

    /// Lenient parse used for request input; `None` for names we don't carry
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// A single catalog entry
///
/// Loaded once from its category's catalog file and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub moods: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub description: String,
}

/// Raw catalog record as it appears in a `<category>.json` file
///
/// Catalog files carry no category field; it is stamped from the file name.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, alias = "moods")]
    pub mood: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub description: String,
}

impl CatalogRecord {
    pub fn into_item(self, category: Category) -> ContentItem {
        ContentItem {
            id: self.id,
            title: self.title,
            category,
            genres: self.genres,
            moods: self.mood,
            rating: self.rating.clamp(0.0, 10.0),
            description: self.description,
        }
    }
}

/// Best-effort metadata from an external provider
///
/// Both fields stay `None` when the provider is missing, slow or broken.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Enrichment {
    pub external_rating: Option<f64>,
    pub cover_image: Option<String>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.external_rating.is_none() && self.cover_image.is_none()
    }
}
