//! External metadata providers
//!
//! Each provider implements [`Enricher`] for the categories it understands.
//! [`EnrichmentRouter`] picks the provider for an item's category from a static
//! routing table, bounds every call with a timeout and turns any failure into an
//! empty [`Enrichment`].
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::AppResult,
    models::{Category, Enrichment},
};

pub mod jikan;
pub mod omdb;

pub use jikan::JikanProvider;
pub use omdb::OmdbProvider;

/// Provider families known to the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// MyAnimeList data via the Jikan API
    Jikan,
    /// IMDb data via OMDb
    Omdb,
}

/// Which provider serves which category
///
/// Categories absent from this table are never enriched.
pub const ENRICHMENT_ROUTES: &[(Category, ProviderKind)] = &[
    (Category::Anime, ProviderKind::Jikan),
    (Category::LightNovels, ProviderKind::Jikan),
    (Category::Manga, ProviderKind::Jikan),
    (Category::Manhwa, ProviderKind::Jikan),
    (Category::Movies, ProviderKind::Omdb),
    (Category::WebSeries, ProviderKind::Omdb),
];

/// A single external metadata source
///
/// Implementations may fail; the router absorbs every error.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Enricher: Send + Sync {
    /// Looks up rating and cover art for a title
    async fn fetch(&self, title: &str, category: Category) -> AppResult<Enrichment>;

    /// Provider name for logging and cache keys
    fn name(&self) -> &'static str;
}

/// Routes enrichment requests to providers by category
#[derive(Clone)]
pub struct EnrichmentRouter {
    routes: HashMap<Category, Arc<dyn Enricher>>,
    timeout: Duration,
}

impl EnrichmentRouter {
    /// Builds the routing table from [`ENRICHMENT_ROUTES`] and the registered providers
    ///
    /// Routes whose provider is not registered are left out.
    pub fn new(providers: HashMap<ProviderKind, Arc<dyn Enricher>>, timeout: Duration) -> Self {
        let routes = ENRICHMENT_ROUTES
            .iter()
            .filter_map(|(category, kind)| {
                providers
                    .get(kind)
                    .map(|provider| (*category, Arc::clone(provider)))
            })
            .collect();

        Self { routes, timeout }
    }

    /// Router with an explicit category → provider table
    pub fn with_routes(routes: HashMap<Category, Arc<dyn Enricher>>, timeout: Duration) -> Self {
        Self { routes, timeout }
    }

    pub fn provider_for(&self, category: Category) -> Option<&Arc<dyn Enricher>> {
        self.routes.get(&category)
    }

    /// Best-effort lookup; never fails and never exceeds the configured timeout
    pub async fn fetch(&self, title: &str, category: Category) -> Enrichment {
        let Some(provider) = self.provider_for(category) else {
            return Enrichment::default();
        };

        match tokio::time::timeout(self.timeout, provider.fetch(title, category)).await {
            Ok(Ok(enrichment)) => enrichment,
            Ok(Err(e)) => {
                tracing::warn!(
                    error = %e,
                    provider = provider.name(),
                    title = %title,
                    "Enrichment failed"
                );
                Enrichment::default()
            }
            Err(_) => {
                tracing::warn!(
                    provider = provider.name(),
                    title = %title,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Enrichment timed out"
                );
                Enrichment::default()
            }
        }
    }

    /// Enriches many titles in parallel, returning results in input order
    ///
    /// Each lookup runs in its own task, so one slow or failing provider does
    /// not hold back the others beyond the shared timeout.
    pub async fn fetch_batch(&self, titles: Vec<(String, Category)>) -> Vec<Enrichment> {
        let mut tasks = Vec::with_capacity(titles.len());

        for (title, category) in titles {
            let router = self.clone();
            tasks.push(tokio::spawn(async move { router.fetch(&title, category).await }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        let mut failed = 0usize;

        for task in tasks {
            match task.await {
                Ok(enrichment) => results.push(enrichment),
                Err(e) => {
                    tracing::error!(error = %e, "Enrichment task join error");
                    failed += 1;
                    results.push(Enrichment::default());
                }
            }
        }

        let enriched = results.iter().filter(|e| !e.is_empty()).count();
        tracing::debug!(
            requested = results.len(),
            enriched,
            failed,
            "Enrichment batch completed"
        );

        results
    }
}
