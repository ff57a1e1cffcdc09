//! Range history models

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::Serialize;

use super::PriceMethod;

/// Supported lookback windows for range history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    ThreeYears,
}

impl TimeRange {
    /// Parse a range string such as "1w" or "3m"
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_lowercase().as_str() {
            "1w" => Ok(TimeRange::OneWeek),
            "1m" => Ok(TimeRange::OneMonth),
            "3m" => Ok(TimeRange::ThreeMonths),
            "6m" => Ok(TimeRange::SixMonths),
            "1y" => Ok(TimeRange::OneYear),
            "3y" => Ok(TimeRange::ThreeYears),
            _ => Err(format!(
                "Unknown timeRange: '{}'. Supported: 1w, 1m, 3m, 6m, 1y, 3y",
                raw
            )),
        }
    }

    /// Start of the window ending at `now`, in calendar terms
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let months = match self {
            TimeRange::OneWeek => return now - Duration::days(7),
            TimeRange::OneMonth => 1,
            TimeRange::ThreeMonths => 3,
            TimeRange::SixMonths => 6,
            TimeRange::OneYear => 12,
            TimeRange::ThreeYears => 36,
        };
        now.checked_sub_months(Months::new(months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Width of one sampled bucket
    pub fn bucket_width(&self) -> Duration {
        match self {
            TimeRange::OneWeek => Duration::days(1),
            TimeRange::OneMonth => Duration::days(5),
            TimeRange::ThreeMonths => Duration::days(10),
            TimeRange::SixMonths | TimeRange::OneYear | TimeRange::ThreeYears => Duration::days(30),
        }
    }
}

/// One sampled point of a range history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub price: Option<f64>,
    pub method: PriceMethod,
}
