//! Request schemas for the HTTP boundary
//!
//! Every field is optional at the serde level so that a missing field is
//! reported as a validation error rather than a deserialization failure.
//! Unknown fields are rejected outright.

use serde::Deserialize;

use super::{BackfillJob, TimeRange};
use crate::utils::errors::PriceError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PriceRequest {
    pub coin_id: Option<String>,
    pub network: Option<String>,
    pub start_time: Option<i64>,
}

/// Validated `/api/price` input
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPriceRequest {
    pub token_address: String,
    pub network: String,
    pub at_time: i64,
}

impl PriceRequest {
    pub fn validate(self) -> Result<ValidPriceRequest, PriceError> {
        match (non_blank(self.coin_id), non_blank(self.network), self.start_time) {
            (Some(token_address), Some(network), Some(at_time)) if at_time > 0 => Ok(ValidPriceRequest {
                token_address,
                network,
                at_time,
            }),
            _ => Err(PriceError::Validation(
                "coinId, network, and startTime are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HistoryRequest {
    pub token_address: Option<String>,
    pub network: Option<String>,
    pub time_range: Option<String>,
}

/// Validated `/api/historical-prices` input
#[derive(Debug, Clone, PartialEq)]
pub struct ValidHistoryRequest {
    pub token_address: String,
    pub network: String,
    pub time_range: TimeRange,
}

impl HistoryRequest {
    pub fn validate(self) -> Result<ValidHistoryRequest, PriceError> {
        let (Some(token_address), Some(network), Some(range)) = (
            non_blank(self.token_address),
            non_blank(self.network),
            non_blank(self.time_range),
        ) else {
            return Err(PriceError::Validation(
                "tokenAddress, network, and timeRange are required".to_string(),
            ));
        };

        let time_range = TimeRange::parse(&range).map_err(PriceError::Validation)?;
        Ok(ValidHistoryRequest {
            token_address,
            network,
            time_range,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScheduleRequest {
    pub coin_id: Option<String>,
    pub network: Option<String>,
}

impl ScheduleRequest {
    pub fn validate(self) -> Result<BackfillJob, PriceError> {
        match (non_blank(self.coin_id), non_blank(self.network)) {
            (Some(coin_id), Some(network)) => Ok(BackfillJob::new(&coin_id, &network)),
            _ => Err(PriceError::Validation(
                "coinId and network are required".to_string(),
            )),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_request_valid() {
        let req: PriceRequest = serde_json::from_str(
            r#"{"coinId":"0xAAA","network":"ethereum","startTime":1700000000}"#,
        )
        .unwrap();
        let valid = req.validate().unwrap();
        assert_eq!(valid.token_address, "0xAAA");
        assert_eq!(valid.at_time, 1_700_000_000);
    }

    #[test]
    fn test_price_request_missing_field() {
        let req: PriceRequest = serde_json::from_str(r#"{"coinId":"0xAAA","network":""}"#).unwrap();
        assert!(matches!(req.validate(), Err(PriceError::Validation(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parsed = serde_json::from_str::<ScheduleRequest>(
            r#"{"coinId":"0xAAA","network":"base","priority":1}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_history_request_bad_range() {
        let req: HistoryRequest = serde_json::from_str(
            r#"{"tokenAddress":"0xAAA","network":"base","timeRange":"5y"}"#,
        )
        .unwrap();
        assert!(matches!(req.validate(), Err(PriceError::Validation(_))));
    }

    #[test]
    fn test_schedule_request_normalizes() {
        let req: ScheduleRequest =
            serde_json::from_str(r#"{"coinId":"0xAbC","network":"Polygon"}"#).unwrap();
        assert_eq!(req.validate().unwrap(), BackfillJob::new("0xabc", "polygon"));
    }
}
