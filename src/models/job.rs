//! Backfill job models

use serde::{Deserialize, Serialize};

/// Queue payload for a backfill request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillJob {
    pub coin_id: String,
    pub network: String,
}

impl BackfillJob {
    /// Build a job with trimmed, lower-cased identifiers so every delivery
    /// maps onto the same record keys
    pub fn new(coin_id: &str, network: &str) -> Self {
        Self {
            coin_id: coin_id.trim().to_lowercase(),
            network: network.trim().to_lowercase(),
        }
    }
}

/// Lifecycle of one job delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Dequeued,
    DiscoveringGenesis,
    Iterating,
    Completed,
    Failed,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Dequeued => "dequeued",
            JobState::DiscoveringGenesis => "discovering genesis",
            JobState::Iterating => "iterating",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed backfill
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillSummary {
    pub coin_id: String,
    pub network: String,
    pub days_processed: u32,
    pub records_written: u32,
    /// Days that already had a record
    pub days_skipped: u32,
    /// Days the source had no price for
    pub days_missing: u32,
}
