//! In-memory collaborators for unit tests

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::api::{ApiError, PriceSource};
use crate::cache::CacheStore;
use crate::db::RecordStore;
use crate::models::{BackfillJob, PriceRecord};
use crate::queue::{Delivery, JobEnvelope, JobQueue, RetryOutcome};
use crate::utils::StoreError;

fn io_failure(what: &str) -> StoreError {
    StoreError::Database(sqlx::Error::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        what.to_string(),
    )))
}

#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Price(f64),
    Fail,
}

impl Scripted {
    fn to_result(self) -> Result<Option<f64>, ApiError> {
        match self {
            Scripted::Price(p) => Ok(Some(p)),
            Scripted::Fail => Err(ApiError::ServerError(503, "scripted failure".to_string())),
        }
    }
}

/// Price source answering from a script and counting calls
#[derive(Default)]
pub struct ScriptedSource {
    /// (window start, window end) in unix seconds -> answer; unscripted windows have no data
    pub historical: Mutex<HashMap<(i64, i64), Scripted>>,
    pub current: Mutex<Option<Scripted>>,
    pub genesis: Mutex<Option<DateTime<Utc>>>,
    pub unconfigured: AtomicBool,
    pub unreachable: AtomicBool,
    pub historical_calls: AtomicUsize,
    pub current_calls: AtomicUsize,
    pub genesis_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn with_historical(self, start: i64, end: i64, answer: Scripted) -> Self {
        self.historical.lock().unwrap().insert((start, end), answer);
        self
    }

    pub fn with_current(self, answer: Scripted) -> Self {
        *self.current.lock().unwrap() = Some(answer);
        self
    }

    pub fn with_genesis(self, genesis: DateTime<Utc>) -> Self {
        *self.genesis.lock().unwrap() = Some(genesis);
        self
    }

    /// Script a whole UTC day window, as the backfill requests it
    pub fn with_day(self, day: NaiveDate, answer: Scripted) -> Self {
        let start = crate::utils::day_start(day).timestamp();
        self.with_historical(start, start + 86_400, answer)
    }

    pub fn upstream_calls(&self) -> usize {
        self.historical_calls.load(Ordering::SeqCst)
            + self.current_calls.load(Ordering::SeqCst)
            + self.genesis_calls.load(Ordering::SeqCst)
    }

    fn unreachable_error(&self) -> Option<ApiError> {
        self.unreachable
            .load(Ordering::SeqCst)
            .then(|| ApiError::Unreachable("connection refused".to_string()))
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    fn is_configured(&self) -> bool {
        !self.unconfigured.load(Ordering::SeqCst)
    }

    async fn historical_price(
        &self,
        _address: &str,
        _network: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, ApiError> {
        self.historical_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.unreachable_error() {
            return Err(err);
        }
        let answer = self
            .historical
            .lock()
            .unwrap()
            .get(&(start.timestamp(), end.timestamp()))
            .copied();
        match answer {
            Some(a) => a.to_result(),
            None => Ok(None),
        }
    }

    async fn current_price(&self, _address: &str, _network: &str) -> Result<Option<f64>, ApiError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.unreachable_error() {
            return Err(err);
        }
        match *self.current.lock().unwrap() {
            Some(a) => a.to_result(),
            None => Ok(None),
        }
    }

    async fn earliest_transfer(&self, address: &str, _network: &str) -> Result<DateTime<Utc>, ApiError> {
        self.genesis_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.unreachable_error() {
            return Err(err);
        }
        (*self.genesis.lock().unwrap()).ok_or_else(|| ApiError::NoTransfers(address.to_string()))
    }
}

#[derive(Default)]
pub struct MemoryCache {
    pub entries: Mutex<HashMap<String, (String, Duration)>>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(io_failure("cache read"));
        }
        Ok(self.entries.lock().unwrap().get(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io_failure("cache write"));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), ttl));
        Ok(())
    }
}

/// Record store enforcing the (token, network, date) natural key
#[derive(Default)]
pub struct MemoryRecords {
    pub records: Mutex<HashMap<(String, String, NaiveDate), PriceRecord>>,
    pub fail_writes: AtomicBool,
    pub create_calls: AtomicUsize,
}

impl MemoryRecords {
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days: Vec<_> = self.records.lock().unwrap().keys().map(|k| k.2).collect();
        days.sort();
        days
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn find_one(
        &self,
        token_address: &str,
        network: &str,
        date: NaiveDate,
    ) -> Result<Option<PriceRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(token_address.to_string(), network.to_string(), date))
            .cloned())
    }

    async fn create(&self, record: &PriceRecord) -> Result<bool, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io_failure("record insert"));
        }
        let key = (record.token_address.clone(), record.network.clone(), record.date);
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&key) {
            return Ok(false);
        }
        records.insert(key, record.clone());
        Ok(true)
    }
}

/// Queue with the same ack/retry/release semantics as the Redis one
pub struct MemoryQueue {
    pub wait: Mutex<VecDeque<JobEnvelope>>,
    pub active: Mutex<Vec<JobEnvelope>>,
    pub failed: Mutex<Vec<JobEnvelope>>,
    pub acked: Mutex<Vec<JobEnvelope>>,
    pub max_attempts: u32,
    pub fail_enqueue: AtomicBool,
}

impl MemoryQueue {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            wait: Mutex::new(VecDeque::new()),
            active: Mutex::new(Vec::new()),
            failed: Mutex::new(Vec::new()),
            acked: Mutex::new(Vec::new()),
            max_attempts,
            fail_enqueue: AtomicBool::new(false),
        }
    }

    fn take_active(&self, id: Uuid) {
        self.active.lock().unwrap().retain(|e| e.id != id);
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    async fn enqueue(&self, job: BackfillJob) -> Result<Uuid, StoreError> {
        if self.fail_enqueue.load(Ordering::SeqCst) {
            return Err(io_failure("enqueue"));
        }
        let envelope = JobEnvelope::new(job);
        let id = envelope.id;
        self.wait.lock().unwrap().push_back(envelope);
        Ok(id)
    }

    async fn dequeue(&self, _timeout: Duration) -> Result<Option<Delivery>, StoreError> {
        let next = self.wait.lock().unwrap().pop_front();
        Ok(next.map(|envelope| {
            self.active.lock().unwrap().push(envelope.clone());
            let raw = serde_json::to_string(&envelope).unwrap_or_default();
            Delivery { envelope, raw }
        }))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), StoreError> {
        self.take_active(delivery.envelope.id);
        self.acked.lock().unwrap().push(delivery.envelope.clone());
        Ok(())
    }

    async fn retry(&self, delivery: &Delivery) -> Result<RetryOutcome, StoreError> {
        self.take_active(delivery.envelope.id);
        let mut envelope = delivery.envelope.clone();
        envelope.attempts += 1;
        if envelope.attempts >= self.max_attempts {
            self.failed.lock().unwrap().push(envelope);
            Ok(RetryOutcome::Parked)
        } else {
            let attempt = envelope.attempts;
            self.wait.lock().unwrap().push_back(envelope);
            Ok(RetryOutcome::Requeued { attempt })
        }
    }

    async fn release(&self, delivery: &Delivery) -> Result<(), StoreError> {
        self.take_active(delivery.envelope.id);
        self.wait.lock().unwrap().push_front(delivery.envelope.clone());
        Ok(())
    }
}
