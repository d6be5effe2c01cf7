use std::sync::Arc;
use std::time::Duration;

use crate::{
    models::{ContentItem, RankedRecommendation},
    services::{
        explain::{template_explanation, Explainer},
        recommendations::ResolvedQuery,
        search::matched_tags,
    },
};

/// Orders candidates by relevance and attaches explanations
#[derive(Clone)]
pub struct Ranker {
    explainer: Option<Arc<dyn Explainer>>,
    explain_timeout: Duration,
}

struct Scored {
    item: ContentItem,
    score: usize,
    matched_genres: Vec<String>,
    matched_moods: Vec<String>,
}

impl Ranker {
    pub fn new(explainer: Option<Arc<dyn Explainer>>, explain_timeout: Duration) -> Self {
        Self {
            explainer,
            explain_timeout,
        }
    }

    /// Ranker that only uses the deterministic template
    pub fn template_only() -> Self {
        Self::new(None, Duration::ZERO)
    }

    /// Relevance is the number of requested genres matched plus translated mood tags matched
    fn score_item(item: ContentItem, query: &ResolvedQuery) -> Scored {
        let matched_genres: Vec<String> = matched_tags(&query.genres, &item.genres)
            .into_iter()
            .cloned()
            .collect();
        let matched_moods: Vec<String> = matched_tags(&query.mood_tags, &item.moods)
            .into_iter()
            .cloned()
            .collect();

        Scored {
            score: matched_genres.len() + matched_moods.len(),
            item,
            matched_genres,
            matched_moods,
        }
    }

    /// Scores, sorts and truncates `items` to `query.count`, then explains each survivor
    ///
    /// Order is score descending, then declared rating descending, then input
    /// order. Ranks run 1..=N with no gaps.
    pub async fn rank(
        &self,
        items: Vec<ContentItem>,
        query: &ResolvedQuery,
    ) -> Vec<RankedRecommendation> {
        let mut scored: Vec<Scored> = items
            .into_iter()
            .map(|item| Self::score_item(item, query))
            .collect();

        // Stable sort keeps input order for full ties
        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.item.rating.total_cmp(&a.item.rating))
        });
        scored.truncate(query.count);

        let explanations = self.explain_all(&scored, query).await;

        scored
            .into_iter()
            .zip(explanations)
            .enumerate()
            .map(|(index, (entry, explanation))| RankedRecommendation {
                content_id: entry.item.id,
                title: entry.item.title,
                category: entry.item.category,
                genres: entry.item.genres,
                moods: entry.item.moods,
                rating: entry.item.rating,
                description: entry.item.description,
                explanation,
                rank: index as u32 + 1,
                external_rating: None,
                cover_image: None,
            })
            .collect()
    }

    async fn explain_all(&self, scored: &[Scored], query: &ResolvedQuery) -> Vec<String> {
        let templates: Vec<String> = scored
            .iter()
            .map(|s| template_explanation(&s.item, &s.matched_genres, &s.matched_moods))
            .collect();

        let Some(explainer) = &self.explainer else {
            return templates;
        };

        let query = Arc::new(query.clone());
        let mut tasks = Vec::with_capacity(scored.len());

        for entry in scored {
            let explainer = Arc::clone(explainer);
            let query = Arc::clone(&query);
            let item = entry.item.clone();
            let timeout = self.explain_timeout;

            tasks.push(tokio::spawn(async move {
                match tokio::time::timeout(timeout, explainer.generate(&item, &query)).await {
                    Ok(Ok(text)) => Some(text),
                    Ok(Err(e)) => {
                        tracing::warn!(
                            error = %e,
                            explainer = explainer.name(),
                            content_id = %item.id,
                            "Explanation failed, using template"
                        );
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            explainer = explainer.name(),
                            content_id = %item.id,
                            timeout_ms = timeout.as_millis() as u64,
                            "Explanation timed out, using template"
                        );
                        None
                    }
                }
            }));
        }

        let mut explanations = Vec::with_capacity(tasks.len());
        for (task, template) in tasks.into_iter().zip(templates) {
            let generated = match task.await {
                Ok(generated) => generated,
                Err(e) => {
                    tracing::error!(error = %e, "Explanation task join error");
                    None
                }
            };
            explanations.push(generated.unwrap_or(template));
        }

        explanations
    }
}
