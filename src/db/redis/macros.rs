/// A macro to simplify read-through caching with an optional Redis cache.
///
/// If a cache is configured and holds the key, the cached value is returned.
/// Otherwise the provided block is executed to compute the value, which is
/// queued for a background cache write and then returned. Cache read failures
/// count as misses.
///
/// # Arguments
/// * `$cache`: An `Option<Cache>`. `None` disables caching.
/// * `$key`: The [`CacheKey`](crate::db::CacheKey) for the value.
/// * `$ttl`: The time-to-live (TTL) for the cached value in seconds.
/// * `$block`: The future to await if the value is not found in cache.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache, CacheKey::Movie(movie_id), MOVIE_CACHE_TTL, async move {
///     fetch_movie_from_api(movie_id).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.as_ref() {
            Some(cache) => cache.lookup(&key).await,
            None => None,
        };
        if let Some(hit) = hit {
            Ok(hit)
        } else {
            let value = $block.await?;
            if let Some(cache) = $cache.as_ref() {
                cache.set_in_background(&key, &value, $ttl);
            }
            Ok(value)
        }
    }};
}
