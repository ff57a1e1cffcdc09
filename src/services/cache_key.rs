use chrono::NaiveDate;

/// Granularity of the instant a cache key is built for. Point lookups and
/// range buckets use different forms so their keys can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheInstant {
    /// Unix seconds, used by point lookups
    Unix(i64),
    /// UTC calendar day, used by range buckets
    Day(NaiveDate),
}

/// Build `price:{token}:{network}:{instant}` with token and network lower-cased
pub fn build_key(token_address: &str, network: &str, instant: CacheInstant) -> String {
    let instant = match instant {
        CacheInstant::Unix(secs) => secs.to_string(),
        CacheInstant::Day(day) => day.format("%Y-%m-%d").to_string(),
    };
    format!(
        "price:{}:{}:{}",
        token_address.trim().to_lowercase(),
        network.trim().to_lowercase(),
        instant
    )
}
