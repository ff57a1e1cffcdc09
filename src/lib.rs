//! Token price history: on-demand cache-aside price lookups and a
//! day-by-day backfill worker that records a token's full daily history.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod queue;
pub mod services;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
