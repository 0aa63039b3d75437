//! Local fallback for credit records.
//!
//! Every read-modify-write on a key runs under that key's lock, so two
//! debits for the same user in one process cannot lose an update.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::record::{CreditRecord, Credits, Feature};
use crate::store::{LocalStore, LocalStoreError};

pub struct LocalFallback {
    store: Arc<dyn LocalStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for LocalFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFallback")
            .field("locked_keys", &self.locks.lock().len())
            .finish_non_exhaustive()
    }
}

impl LocalFallback {
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    fn read(&self, key: &str) -> Result<Option<CreditRecord>, LocalReadError> {
        match self.store.get_item(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, record: &CreditRecord) -> Result<(), LocalStoreError> {
        let raw = serde_json::to_string(record)
            .map_err(|err| LocalStoreError::Unavailable(err.to_string()))?;
        self.store.set_item(key, &raw)
    }

    /// Loads today's credits from the local store, resetting or creating the
    /// stored blob as needed. Never fails: an unreadable store yields
    /// `defaults` without persisting them.
    pub fn load_or_init(
        &self,
        key: &str,
        now: &DateTime<FixedOffset>,
        defaults: &CreditRecord,
    ) -> Credits {
        let lock = self.key_lock(key);
        let _guard = lock.lock();

        match self.read(key) {
            Ok(Some(record)) if record.is_current(now) => {
                debug!("local credits are current for {}", key);
                record.credits()
            }
            Ok(stale_or_missing) => {
                if stale_or_missing.is_some() {
                    debug!("local credits are stale for {}, resetting", key);
                }
                if let Err(err) = self.write(key, defaults) {
                    warn!("failed to persist default local credits for {}: {}", key, err);
                }
                defaults.credits()
            }
            Err(err) => {
                warn!("local credits unreadable for {}, using defaults: {}", key, err);
                defaults.credits()
            }
        }
    }

    /// Persists a debit: the stored blob gets `feature = new_value` when it
    /// is from today, otherwise it is replaced by `snapshot` stamped `now`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written, or cannot be read at all.
    pub fn record_debit(
        &self,
        key: &str,
        feature: Feature,
        new_value: i64,
        snapshot: Credits,
        now: &DateTime<FixedOffset>,
    ) -> Result<(), LocalStoreError> {
        let lock = self.key_lock(key);
        let _guard = lock.lock();

        let record = match self.read(key) {
            Ok(Some(mut record)) if record.is_current(now) => {
                match feature {
                    Feature::Grader => record.grader = new_value,
                    Feature::Generator => record.generator = new_value,
                }
                record
            }
            Ok(_) | Err(LocalReadError::Corrupt(_)) => {
                let mut credits = snapshot;
                credits.set(feature, new_value);
                CreditRecord::from_credits(credits, *now)
            }
            Err(LocalReadError::Store(err)) => return Err(err),
        };

        self.write(key, &record)
    }
}

#[derive(Debug, thiserror::Error)]
enum LocalReadError {
    #[error(transparent)]
    Store(#[from] LocalStoreError),

    #[error("corrupt local record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryLocalStore;

    const KEY: &str = "limva_credits_u1";

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-10-18T10:00:00+07:00").unwrap()
    }

    fn stored(store: &MemoryLocalStore) -> CreditRecord {
        serde_json::from_str(&store.get_item(KEY).unwrap().unwrap()).unwrap()
    }

    struct BrokenStore;

    impl LocalStore for BrokenStore {
        fn get_item(&self, _key: &str) -> Result<Option<String>, LocalStoreError> {
            Err(LocalStoreError::Unavailable("storage disabled".to_string()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), LocalStoreError> {
            Err(LocalStoreError::Unavailable("storage disabled".to_string()))
        }
    }

    #[test]
    fn missing_record_is_initialized() {
        let store = Arc::new(MemoryLocalStore::new());
        let fallback = LocalFallback::new(store.clone());
        let defaults = CreditRecord::fresh(30, now());

        assert_eq!(fallback.load_or_init(KEY, &now(), &defaults), Credits::uniform(30));
        assert_eq!(stored(&store), defaults);
    }

    #[test]
    fn current_record_is_adopted() {
        let store = Arc::new(MemoryLocalStore::new());
        let record = CreditRecord {
            grader: 12,
            generator: 7,
            last_reset: "2026-10-18T08:00:00+07:00".to_string(),
        };
        store
            .set_item(KEY, &serde_json::to_string(&record).unwrap())
            .unwrap();
        let fallback = LocalFallback::new(store.clone());

        let credits = fallback.load_or_init(KEY, &now(), &CreditRecord::fresh(30, now()));
        assert_eq!(credits, Credits { grader: 12, generator: 7 });
        assert_eq!(stored(&store), record);
    }

    #[test]
    fn stale_record_is_reset() {
        let store = Arc::new(MemoryLocalStore::new());
        store
            .set_item(
                KEY,
                r#"{"grader":0,"generator":1,"lastReset":"2026-10-16T08:00:00+07:00"}"#,
            )
            .unwrap();
        let fallback = LocalFallback::new(store.clone());
        let defaults = CreditRecord::fresh(30, now());

        assert_eq!(fallback.load_or_init(KEY, &now(), &defaults), Credits::uniform(30));
        assert_eq!(stored(&store), defaults);
    }

    #[test]
    fn corrupt_record_yields_defaults_without_persisting() {
        let store = Arc::new(MemoryLocalStore::new());
        store.set_item(KEY, "{not json").unwrap();
        let fallback = LocalFallback::new(store.clone());

        let credits = fallback.load_or_init(KEY, &now(), &CreditRecord::fresh(30, now()));
        assert_eq!(credits, Credits::uniform(30));
        assert_eq!(store.get_item(KEY).unwrap().as_deref(), Some("{not json"));
    }

    #[test]
    fn unavailable_store_yields_defaults() {
        let fallback = LocalFallback::new(Arc::new(BrokenStore));
        let credits = fallback.load_or_init(KEY, &now(), &CreditRecord::fresh(30, now()));
        assert_eq!(credits, Credits::uniform(30));
    }

    #[test]
    fn debit_updates_current_record_in_place() {
        let store = Arc::new(MemoryLocalStore::new());
        let fallback = LocalFallback::new(store.clone());
        let defaults = CreditRecord::fresh(30, now());
        fallback.load_or_init(KEY, &now(), &defaults);

        fallback
            .record_debit(KEY, Feature::Grader, 29, Credits::uniform(30), &now())
            .unwrap();

        let record = stored(&store);
        assert_eq!(record.grader, 29);
        assert_eq!(record.generator, 30);
        assert_eq!(record.last_reset, defaults.last_reset);
    }

    #[test]
    fn debit_without_record_writes_snapshot() {
        let store = Arc::new(MemoryLocalStore::new());
        let fallback = LocalFallback::new(store.clone());

        fallback
            .record_debit(
                KEY,
                Feature::Generator,
                17,
                Credits { grader: 9, generator: 18 },
                &now(),
            )
            .unwrap();

        let record = stored(&store);
        assert_eq!(record.credits(), Credits { grader: 9, generator: 17 });
        assert!(record.is_current(&now()));
    }

    #[test]
    fn debit_on_broken_store_fails() {
        let fallback = LocalFallback::new(Arc::new(BrokenStore));
        let result = fallback.record_debit(KEY, Feature::Grader, 1, Credits::uniform(2), &now());
        assert!(matches!(result, Err(LocalStoreError::Unavailable(_))));
    }

    #[test]
    fn concurrent_debits_do_not_lose_updates() {
        let store = Arc::new(MemoryLocalStore::new());
        let fallback = Arc::new(LocalFallback::new(store.clone()));
        fallback.load_or_init(KEY, &now(), &CreditRecord::fresh(30, now()));

        let handles: Vec<_> = [(Feature::Grader, 29), (Feature::Generator, 29)]
            .into_iter()
            .map(|(feature, value)| {
                let fallback = fallback.clone();
                std::thread::spawn(move || {
                    fallback
                        .record_debit(KEY, feature, value, Credits::uniform(30), &now())
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stored(&store).credits(), Credits::uniform(29));
    }
}
