use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use reqwest::Client as HttpClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodreel::{
    config::Config,
    db::{
        create_pool, create_redis_client, Cache, CacheWriterHandle, MemoryCacheBackend,
        MemoryStore, PgStore, RedisCacheBackend,
    },
    routes::{create_router, AppState},
    services::{
        history::{HistoryLedger, RecommendationSink, UserStore},
        providers::Enricher,
        CatalogStore, EnrichmentRouter, GeminiExplainer, InMemoryCatalog, JikanProvider,
        OmdbProvider, ProviderKind, RecommendationPipeline,
    },
};

/// History, user and audit storage behind one concrete store
struct Stores {
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn HistoryLedger>,
    audit: Arc<dyn RecommendationSink>,
}

async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            let store = Arc::new(PgStore::new(pool));
            tracing::info!("Using PostgreSQL store");
            Ok(Stores {
                users: store.clone(),
                ledger: store.clone(),
                audit: store,
            })
        }
        None => {
            let store = Arc::new(MemoryStore::new());
            tracing::warn!("DATABASE_URL not set, history is kept in memory");
            Ok(Stores {
                users: store.clone(),
                ledger: store.clone(),
                audit: store,
            })
        }
    }
}

fn build_cache(config: &Config) -> anyhow::Result<(Cache, Option<CacheWriterHandle>)> {
    match &config.redis_url {
        Some(url) => {
            let client = create_redis_client(url)?;
            let (backend, writer) = RedisCacheBackend::new(client);
            tracing::info!("Using Redis cache");
            Ok((Cache::new(Arc::new(backend)), Some(writer)))
        }
        None => {
            let backend = Arc::new(MemoryCacheBackend::new());
            backend.clone().spawn_sweeper(config.cache_sweep_interval());
            tracing::info!(
                sweep_interval_secs = config.cache_sweep_interval_secs,
                "Using in-memory cache"
            );
            Ok((Cache::new(backend), None))
        }
    }
}

fn build_enrichment(
    config: &Config,
    http_client: &HttpClient,
    cache: &Cache,
) -> Option<EnrichmentRouter> {
    if !config.enrichment_enabled {
        return None;
    }

    let mut providers: HashMap<ProviderKind, Arc<dyn Enricher>> = HashMap::new();
    providers.insert(
        ProviderKind::Jikan,
        Arc::new(JikanProvider::new(
            http_client.clone(),
            config.jikan_api_url.clone(),
            cache.clone(),
            config.cache_ttl(),
        )),
    );

    match &config.omdb_api_key {
        Some(api_key) => {
            providers.insert(
                ProviderKind::Omdb,
                Arc::new(OmdbProvider::new(
                    http_client.clone(),
                    api_key.clone(),
                    config.omdb_api_url.clone(),
                    cache.clone(),
                    config.cache_ttl(),
                )),
            );
        }
        None => tracing::warn!("OMDB_API_KEY not set, movies and web series are not enriched"),
    }

    let router = EnrichmentRouter::new(providers, config.enrichment_timeout());
    tracing::info!(
        timeout_ms = config.enrichment_timeout_ms,
        "External enrichment enabled"
    );
    Some(router)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("moodreel=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Catalog load failure is fatal
    let catalog: Arc<dyn CatalogStore> = Arc::new(
        InMemoryCatalog::load_from_dir(&config.catalog_dir)
            .with_context(|| format!("Failed to load catalogs from '{}'", config.catalog_dir))?,
    );
    tracing::info!(
        categories = catalog.categories().len(),
        items = catalog.total_items(),
        "Catalog loaded"
    );

    let stores = build_stores(&config).await?;
    let (cache, cache_writer) = build_cache(&config)?;
    let http_client = HttpClient::new();

    let mut pipeline = RecommendationPipeline::new(catalog.clone(), stores.ledger.clone())
        .with_sink(stores.audit.clone())
        .with_count_limits(config.default_count, config.max_count);

    if let Some(router) = build_enrichment(&config, &http_client, &cache) {
        pipeline = pipeline.with_enrichment(router);
    }

    if let Some(api_key) = &config.gemini_api_key {
        let explainer = GeminiExplainer::new(
            http_client.clone(),
            api_key.clone(),
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
            cache.clone(),
            config.cache_ttl(),
        );
        pipeline = pipeline.with_explainer(Arc::new(explainer), config.explainer_timeout());
        tracing::info!(model = %config.gemini_model, "Gemini explainer enabled");
    }

    let state = AppState {
        pipeline: Arc::new(pipeline),
        catalog,
        users: stores.users,
        ledger: stores.ledger,
        audit: stores.audit,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, cache = cache.backend_name(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
