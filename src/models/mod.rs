//! Data models for price lookups, backfill jobs and the HTTP boundary
//!
//! Each model is either persisted (records, cache entries), carried on the
//! queue (jobs) or returned to callers (quotes, history points).

pub mod history;
pub mod job;
pub mod price;
pub mod requests;

// Re-export commonly used types for convenience
pub use history::{HistoryPoint, TimeRange};
pub use job::{BackfillJob, BackfillSummary, JobState};
pub use price::{CacheEntry, PriceMethod, PriceQuote, PriceRecord};
pub use requests::{HistoryRequest, PriceRequest, ScheduleRequest};
