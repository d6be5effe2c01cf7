//! Recommendation resolution pipeline
//!
//! A request moves through `Received → Validated → Searched → Filtered →
//! Ranked → Done`. Any step may fail into the error state, which is logged
//! with the stage it failed in and returned to the caller. Enrichment,
//! explanation and persistence problems never fail a resolution.
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Category, ContentItem, RankedRecommendation, RankedResult, RecommendationRequest},
    services::{
        catalog::CatalogStore,
        dedup::filter_consumed,
        explain::Explainer,
        history::{HistoryLedger, RecommendationSink},
        mood,
        providers::EnrichmentRouter,
        ranking::Ranker,
        search::{self, normalize_tag},
    },
};

pub const DEFAULT_COUNT: usize = 10;
pub const MAX_COUNT: usize = 50;

/// A validated, normalized request
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub user_id: String,
    /// Known categories only, deduplicated, request order
    pub categories: Vec<Category>,
    /// Lower-cased, deduplicated
    pub genres: Vec<String>,
    /// Lower-cased, deduplicated mood labels as given
    pub mood_labels: Vec<String>,
    /// Translation of `mood_labels`
    pub mood_tags: Vec<String>,
    pub exclude_ids: HashSet<String>,
    /// Already clamped to the hard maximum
    pub count: usize,
}

impl ResolvedQuery {
    /// Preference fingerprint used to key cached explanations
    pub fn signature(&self) -> String {
        format!("{}|{}", self.genres.join(","), self.mood_labels.join(","))
    }

    #[cfg(test)]
    pub fn for_tests(genres: &[&str], moods: &[&str]) -> Self {
        let mood_labels: Vec<String> = moods.iter().map(|m| normalize_tag(m)).collect();
        Self {
            user_id: "test_user".to_string(),
            categories: vec![Category::Anime],
            genres: genres.iter().map(|g| normalize_tag(g)).collect(),
            mood_tags: mood::translate(&mood_labels),
            mood_labels,
            exclude_ids: HashSet::new(),
            count: DEFAULT_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Searched,
    Filtered,
    Ranked,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Searched => "searched",
            Stage::Filtered => "filtered",
            Stage::Ranked => "ranked",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Pipeline state; each variant carries what the next step needs
enum Resolution {
    Received(RecommendationRequest),
    Validated(ResolvedQuery),
    Searched {
        query: ResolvedQuery,
        candidates: Vec<ContentItem>,
    },
    Filtered {
        query: ResolvedQuery,
        candidates: Vec<ContentItem>,
    },
    Ranked {
        query: ResolvedQuery,
        recommendations: Vec<RankedRecommendation>,
    },
    Done(RankedResult),
}

impl Resolution {
    fn stage(&self) -> Stage {
        match self {
            Resolution::Received(_) => Stage::Received,
            Resolution::Validated(_) => Stage::Validated,
            Resolution::Searched { .. } => Stage::Searched,
            Resolution::Filtered { .. } => Stage::Filtered,
            Resolution::Ranked { .. } => Stage::Ranked,
            Resolution::Done(_) => Stage::Done,
        }
    }
}

/// Composes search, dedup, ranking and enrichment into `resolve`
///
/// All collaborators are injected; the pipeline holds no per-request state.
#[derive(Clone)]
pub struct RecommendationPipeline {
    catalog: Arc<dyn CatalogStore>,
    ledger: Arc<dyn HistoryLedger>,
    ranker: Ranker,
    enricher: Option<EnrichmentRouter>,
    sink: Option<Arc<dyn RecommendationSink>>,
    default_count: usize,
    max_count: usize,
}

impl RecommendationPipeline {
    pub fn new(catalog: Arc<dyn CatalogStore>, ledger: Arc<dyn HistoryLedger>) -> Self {
        Self {
            catalog,
            ledger,
            ranker: Ranker::template_only(),
            enricher: None,
            sink: None,
            default_count: DEFAULT_COUNT,
            max_count: MAX_COUNT,
        }
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>, timeout: Duration) -> Self {
        self.ranker = Ranker::new(Some(explainer), timeout);
        self
    }

    pub fn with_enrichment(mut self, router: EnrichmentRouter) -> Self {
        self.enricher = Some(router);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecommendationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Overrides the default and maximum `count`; the default never exceeds the maximum
    pub fn with_count_limits(mut self, default_count: usize, max_count: usize) -> Self {
        self.max_count = max_count.max(1);
        self.default_count = default_count.clamp(1, self.max_count);
        self
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Resolves a request into a ranked, explained batch
    pub async fn resolve(&self, request: RecommendationRequest) -> AppResult<RankedResult> {
        let user_id = request.user_id.clone();
        let mut state = Resolution::Received(request);

        loop {
            let stage = state.stage();
            tracing::debug!(user_id = %user_id, stage = %stage, "Resolution stage");

            state = match state {
                Resolution::Done(result) => {
                    tracing::info!(
                        user_id = %user_id,
                        batch_id = %result.batch_id,
                        count = result.recommendations.len(),
                        "Recommendations resolved"
                    );
                    return Ok(result);
                }
                other => match self.advance(other).await {
                    Ok(next) => next,
                    Err(e) => {
                        tracing::warn!(user_id = %user_id, stage = %stage, error = %e, "Resolution failed");
                        return Err(e);
                    }
                },
            };
        }
    }

    async fn advance(&self, state: Resolution) -> AppResult<Resolution> {
        let next = match state {
            Resolution::Received(request) => Resolution::Validated(self.validate(request)?),
            Resolution::Validated(query) => {
                let candidates = search::search(
                    self.catalog.as_ref(),
                    &query.categories,
                    &query.genres,
                    &query.mood_tags,
                );
                Resolution::Searched { query, candidates }
            }
            Resolution::Searched { query, candidates } => {
                let consumed = self.excluded_ids(&query).await;
                let candidates = filter_consumed(candidates, &consumed);
                Resolution::Filtered { query, candidates }
            }
            Resolution::Filtered { query, candidates } => {
                let recommendations = self.ranker.rank(candidates, &query).await;
                Resolution::Ranked {
                    query,
                    recommendations,
                }
            }
            Resolution::Ranked {
                query,
                mut recommendations,
            } => {
                self.enrich(&mut recommendations).await;

                let result = RankedResult {
                    batch_id: Uuid::new_v4().to_string(),
                    recommendations,
                };
                self.persist(&query.user_id, &result);
                Resolution::Done(result)
            }
            Resolution::Done(result) => Resolution::Done(result),
        };

        Ok(next)
    }

    fn validate(&self, request: RecommendationRequest) -> AppResult<ResolvedQuery> {
        let user_id = request.user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(AppError::InvalidRequest(
                "user_id cannot be empty".to_string(),
            ));
        }

        if request.categories.is_empty() {
            return Err(AppError::InvalidRequest(
                "At least one category is required".to_string(),
            ));
        }

        let count = match request.count {
            None => self.default_count,
            Some(c) if c <= 0 => {
                return Err(AppError::InvalidRequest(format!(
                    "count must be positive, got {}",
                    c
                )))
            }
            Some(c) => usize::try_from(c)
                .unwrap_or(usize::MAX)
                .min(self.max_count),
        };

        let mut categories = Vec::new();
        for raw in &request.categories {
            if raw.trim().is_empty() {
                return Err(AppError::InvalidRequest(
                    "Category names cannot be blank".to_string(),
                ));
            }
            match Category::parse_lenient(raw) {
                Some(category) if !categories.contains(&category) => categories.push(category),
                Some(_) => {}
                None => tracing::debug!(category = %raw, "Unknown category skipped"),
            }
        }

        let genres = normalized_tags(request.genres.as_deref().unwrap_or_default(), "genre")?;
        let mood_labels = normalized_tags(request.moods.as_deref().unwrap_or_default(), "mood")?;
        let mood_tags = mood::translate(&mood_labels);

        let exclude_ids = request
            .exclude_ids
            .unwrap_or_default()
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        Ok(ResolvedQuery {
            user_id,
            categories,
            genres,
            mood_labels,
            mood_tags,
            exclude_ids,
            count,
        })
    }

    /// Consumed ids from the ledger plus the request's own exclusions
    ///
    /// A ledger failure degrades to the request exclusions alone.
    async fn excluded_ids(&self, query: &ResolvedQuery) -> HashSet<String> {
        let mut consumed = match self.ledger.consumed_ids(&query.user_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    user_id = %query.user_id,
                    error = %e,
                    "Failed to read history, continuing without it"
                );
                HashSet::new()
            }
        };

        consumed.extend(query.exclude_ids.iter().cloned());
        consumed
    }

    async fn enrich(&self, recommendations: &mut [RankedRecommendation]) {
        let Some(router) = &self.enricher else {
            return;
        };
        if recommendations.is_empty() {
            return;
        }

        let titles = recommendations
            .iter()
            .map(|r| (r.title.clone(), r.category))
            .collect();

        for (recommendation, enrichment) in recommendations
            .iter_mut()
            .zip(router.fetch_batch(titles).await)
        {
            recommendation.external_rating = enrichment.external_rating;
            recommendation.cover_image = enrichment.cover_image;
        }
    }

    /// Hands the batch to the sink without waiting for it
    fn persist(&self, user_id: &str, result: &RankedResult) {
        let Some(sink) = &self.sink else {
            return;
        };
        if result.recommendations.is_empty() {
            return;
        }

        let sink = Arc::clone(sink);
        let user_id = user_id.to_string();
        let result = result.clone();

        tokio::spawn(async move {
            if let Err(e) = sink.save_batch(&user_id, &result).await {
                tracing::error!(
                    user_id = %user_id,
                    batch_id = %result.batch_id,
                    error = %e,
                    "Failed to persist recommendation batch"
                );
            }
        });
    }
}

/// Trims, lower-cases and deduplicates tags; blank entries are rejected
fn normalized_tags(raw: &[String], kind: &str) -> AppResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut tags = Vec::with_capacity(raw.len());

    for value in raw {
        let tag = normalize_tag(value);
        if tag.is_empty() {
            return Err(AppError::InvalidRequest(format!(
                "{} values cannot be blank",
                kind
            )));
        }
        if seen.insert(tag.clone()) {
            tags.push(tag);
        }
    }

    Ok(tags)
}
