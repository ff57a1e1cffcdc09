pub mod days;
pub mod errors;
pub mod ratelimit;

pub use days::{day_start, utc_day, DayCursor};
pub use errors::{extract_clean_error, BackfillError, PriceError, StoreError};
pub use ratelimit::RateLimiter;
