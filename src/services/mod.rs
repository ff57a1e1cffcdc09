pub mod backfill_service;
pub mod cache_key;
pub mod history_service;
pub mod interpolation;
pub mod price_service;
pub mod schedule_service;

pub use backfill_service::{BackfillRunner, BackfillWorker};
pub use history_service::PriceHistoryService;
pub use price_service::PriceLookupService;
pub use schedule_service::ScheduleService;
