pub mod catalog;
pub mod dedup;
pub mod explain;
pub mod history;
pub mod mood;
pub mod providers;
pub mod ranking;
pub mod recommendations;
pub mod search;

pub use catalog::{CatalogStore, InMemoryCatalog};
pub use explain::{Explainer, GeminiExplainer};
pub use history::{HistoryLedger, RecommendationSink, UserStore};
pub use providers::{EnrichmentRouter, JikanProvider, OmdbProvider, ProviderKind};
pub use recommendations::{RecommendationPipeline, ResolvedQuery};
