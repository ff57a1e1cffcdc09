use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::mysql::MySqlPool;
use tracing::debug;

use crate::models::PriceRecord;
use crate::utils::StoreError;

pub mod price_record;

pub use price_record::MySqlRecordStore;

const CREATE_TABLES_SQL: &str = include_str!("../../migrations/create_tables.sql");

/// Durable daily price history keyed by (token_address, network, date)
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_one(
        &self,
        token_address: &str,
        network: &str,
        date: NaiveDate,
    ) -> Result<Option<PriceRecord>, StoreError>;

    /// Insert unless a record for the same day exists. Returns whether a row
    /// was written; an existing day is a no-op, never an overwrite.
    async fn create(&self, record: &PriceRecord) -> Result<bool, StoreError>;
}

/// Initialize the MySQL connection pool and create tables
pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPool::connect(database_url).await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Execute every statement of the embedded schema file
async fn create_tables(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    for statement in split_statements(CREATE_TABLES_SQL) {
        debug!("Applying schema statement: {}", statement.lines().next().unwrap_or_default());
        sqlx::raw_sql(statement).execute(pool).await?;
    }
    Ok(())
}

/// Split a schema file on `;`, dropping comment-only and empty chunks
fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| {
            s.lines()
                .any(|line| !line.trim().is_empty() && !line.trim_start().starts_with("--"))
        })
        .collect()
}
