/// Read-through caching helper.
///
/// Returns the cached value for `$key` when present; otherwise awaits `$block`,
/// queues the result for a background write with `$ttl`, and returns it.
/// A failed cache read is logged and treated as a miss; errors from the block
/// are propagated with `?`.
///
/// # Arguments
/// * `$cache`: a [`crate::db::Cache`]
/// * `$key`: the [`crate::db::CacheKey`] to read and write
/// * `$ttl`: a `std::time::Duration`
/// * `$block`: future computing the value on a miss
///
/// # Example
/// ```rust,ignore
/// let enrichment = cached!(self.cache, key, self.ttl, async move {
///     fetch_from_provider().await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let hit = match $cache.get_from_cache(&$key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, treating as miss");
                None
            }
        };
        if let Some(cached) = hit {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
