use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::mysql::MySqlPool;

use super::RecordStore;
use crate::models::PriceRecord;
use crate::utils::StoreError;

/// MySQL-backed record store. Uniqueness of the natural key is enforced by
/// the `uq_price_record_day` index, so concurrent writers cannot both insert
/// the same day.
#[derive(Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Close the pool, waiting for in-flight queries
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn find_one(
        &self,
        token_address: &str,
        network: &str,
        date: NaiveDate,
    ) -> Result<Option<PriceRecord>, StoreError> {
        // Read DECIMAL as a string to avoid driver-side float coercion
        let row: Option<(String, String, NaiveDate, String)> = sqlx::query_as(
            "SELECT token_address, network, date, CAST(price AS CHAR) as price_str FROM price_record WHERE token_address = ? AND network = ? AND date = ?"
        )
        .bind(token_address)
        .bind(network)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((token_address, network, date, price_str)) => {
                let price = price_str
                    .parse::<f64>()
                    .map_err(|e| sqlx::Error::Decode(e.into()))?;
                Ok(Some(PriceRecord {
                    token_address,
                    network,
                    date,
                    price,
                }))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, record: &PriceRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO price_record (token_address, network, date, price) VALUES (?, ?, ?, ?)"
        )
        .bind(&record.token_address)
        .bind(&record.network)
        .bind(record.date)
        .bind(record.price)
        .execute(&self.pool)
        .await
        .map(|done| done.rows_affected());

        insert_outcome(result)
    }
}

/// Whether an insert wrote a row. A unique-key conflict means the day is
/// already recorded and is not an error.
fn insert_outcome(result: Result<u64, sqlx::Error>) -> Result<bool, StoreError> {
    match result {
        Ok(rows) => Ok(rows > 0),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(false),
        Err(e) => Err(e.into()),
    }
}
