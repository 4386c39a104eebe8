//! Browser-style local storage adapter.
//!
//! Patients are kept as one JSON-serialized sequence under a single key of a
//! synchronous key/value store, mirroring `window.localStorage`. A fixed
//! artificial delay runs before each contract operation so callers see the
//! same latency profile as the networked backends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{Result, StoreError};
use crate::models::{DeletePolicy, NewPatient, Patient, PatientStatistics};
use crate::records::PatientRecords;
use crate::seed;
use crate::store::PatientStore;

pub const STORAGE_KEY: &str = "patient-management-data";
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(100);

/// Synchronous string key/value store with `localStorage` semantics
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Process-local key/value store
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    items: StdMutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| StoreError::Storage("key/value store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items()?.remove(key);
        Ok(())
    }
}

pub struct LocalStoragePatientStore<S: KeyValueStore = MemoryKeyValueStore> {
    storage: S,
    key: String,
    latency: Duration,
    delete_policy: DeletePolicy,
    lock: Mutex<()>,
    last_issued: AtomicI64,
}

impl LocalStoragePatientStore<MemoryKeyValueStore> {
    /// Adapter over a fresh in-memory key/value store
    pub fn in_memory() -> Self {
        Self::new(MemoryKeyValueStore::new())
    }
}

impl<S: KeyValueStore> LocalStoragePatientStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: STORAGE_KEY.to_string(),
            latency: DEFAULT_LATENCY,
            delete_policy: DeletePolicy::default(),
            lock: Mutex::new(()),
            last_issued: AtomicI64::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Look up a record by id regardless of its status
    pub async fn find(&self, id: i64) -> Result<Option<Patient>> {
        let _guard = self.lock.lock().await;
        Ok(self.load()?.find(id).cloned())
    }

    /// Pretty-printed JSON of the full stored sequence, inactive records included
    pub async fn export_data(&self) -> Result<String> {
        let _guard = self.lock.lock().await;
        let records = self.load()?;
        Ok(serde_json::to_string_pretty(records.as_slice())?)
    }

    /// Replace the stored sequence with `json`
    pub async fn import_data(&self, json: &str) -> Result<()> {
        let patients: Vec<Patient> =
            serde_json::from_str(json).map_err(|e| StoreError::InvalidImport(e.to_string()))?;

        let _guard = self.lock.lock().await;
        self.save(&PatientRecords::new(patients))?;
        tracing::info!("✓ Imported patient data into local storage");
        Ok(())
    }

    /// Drop the stored sequence; the next read seeds sample data again
    pub async fn clear_all(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.storage.remove_item(&self.key)
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn load(&self) -> Result<PatientRecords> {
        if let Some(stored) = self.storage.get_item(&self.key)? {
            match serde_json::from_str::<Vec<Patient>>(&stored) {
                Ok(patients) => return Ok(PatientRecords::new(patients)),
                Err(e) => {
                    tracing::warn!("⚠ Stored patient data under '{}' is unreadable, reseeding: {}", self.key, e);
                }
            }
        }

        let records = PatientRecords::new(seed::local_seed(Utc::now()));
        self.save(&records)?;
        Ok(records)
    }

    fn save(&self, records: &PatientRecords) -> Result<()> {
        let json = serde_json::to_string(records.as_slice())?;
        self.storage.set_item(&self.key, &json)
    }
}

#[async_trait]
impl<S: KeyValueStore> PatientStore for LocalStoragePatientStore<S> {
    async fn get_all(&self) -> Result<Vec<Patient>> {
        self.simulate_latency().await;
        let _guard = self.lock.lock().await;
        Ok(self.load()?.active())
    }

    async fn search(&self, term: &str) -> Result<Vec<Patient>> {
        self.simulate_latency().await;
        let _guard = self.lock.lock().await;
        Ok(self.load()?.search(term))
    }

    async fn add(&self, patient: NewPatient) -> Result<Patient> {
        self.simulate_latency().await;
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        let floor = self.last_issued.load(Ordering::SeqCst);
        let created = records.add(patient, Utc::now(), floor)?;
        self.save(&records)?;
        self.last_issued.fetch_max(created.id, Ordering::SeqCst);
        Ok(created)
    }

    async fn update(&self, id: i64, patient: NewPatient) -> Result<Patient> {
        self.simulate_latency().await;
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        let updated = records.update(id, patient, Utc::now())?;
        self.save(&records)?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.simulate_latency().await;
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        if self.delete_policy == DeletePolicy::Hard {
            self.last_issued.fetch_max(records.max_id(), Ordering::SeqCst);
        }
        records.delete(id, self.delete_policy, Utc::now())?;
        self.save(&records)
    }

    async fn statistics(&self) -> Result<PatientStatistics> {
        self.simulate_latency().await;
        let _guard = self.lock.lock().await;
        match self.load() {
            Ok(records) => Ok(records.statistics()),
            Err(e) => {
                tracing::warn!("⚠ Failed to compute statistics, reporting zeros: {}", e);
                Ok(PatientStatistics::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Key/value store whose every call fails, like a browser with storage disabled
    struct BrokenStorage;

    impl KeyValueStore for BrokenStorage {
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Err(StoreError::Storage("quota exceeded".to_string()))
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(StoreError::Storage("quota exceeded".to_string()))
        }

        fn remove_item(&self, _key: &str) -> Result<()> {
            Err(StoreError::Storage("quota exceeded".to_string()))
        }
    }

    fn store() -> LocalStoragePatientStore {
        LocalStoragePatientStore::in_memory().with_latency(Duration::ZERO)
    }

    #[test]
    fn test_memory_key_value_store() {
        let kv = MemoryKeyValueStore::new();
        assert_eq!(kv.get_item("k").unwrap(), None);
        kv.set_item("k", "v").unwrap();
        assert_eq!(kv.get_item("k").unwrap().as_deref(), Some("v"));
        kv.remove_item("k").unwrap();
        assert_eq!(kv.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_first_read_seeds_three_patients() {
        let store = store();
        let patients = tokio_test::block_on(store.get_all()).unwrap();
        assert_eq!(patients.len(), 3);
        assert!(store.storage().get_item(STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn test_unreadable_value_is_reseeded() {
        let store = store();
        store.storage().set_item(STORAGE_KEY, "{not json").unwrap();

        let patients = tokio_test::block_on(store.get_all()).unwrap();
        assert_eq!(patients.len(), 3);
    }

    #[test]
    fn test_broken_storage_errors_but_statistics_degrade() {
        let store = LocalStoragePatientStore::new(BrokenStorage).with_latency(Duration::ZERO);

        assert!(tokio_test::block_on(store.get_all()).is_err());
        assert!(tokio_test::block_on(store.add(NewPatient::default())).is_err());
        let stats = tokio_test::block_on(store.statistics()).unwrap();
        assert_eq!(stats, PatientStatistics::default());
    }

    #[test]
    fn test_import_rejects_malformed_json() {
        let store = store();
        let err = tokio_test::block_on(store.import_data("[{")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidImport(_)));
    }

    #[test]
    fn test_clear_all_removes_key() {
        let store = store();
        tokio_test::block_on(store.get_all()).unwrap();
        tokio_test::block_on(store.clear_all()).unwrap();
        assert_eq!(store.storage().get_item(STORAGE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let store = LocalStoragePatientStore::in_memory().with_latency(Duration::from_millis(30));
        let started = std::time::Instant::now();
        store.get_all().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_add_after_importing_max_id_fails_cleanly() {
        let store = store();
        tokio_test::block_on(store.import_data(
            r#"[{"id": 9223372036854775807, "firstName": "Last", "lastName": "Id", "status": "Active"}]"#,
        ))
        .unwrap();

        let err = tokio_test::block_on(store.add(NewPatient::default())).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(tokio_test::block_on(store.get_all()).unwrap().len(), 1);
    }

    #[test]
    fn test_null_fields_do_not_trigger_reseed() {
        let store = store();
        store
            .storage()
            .set_item(
                STORAGE_KEY,
                r#"[{"id":7,"firstName":"Kept","lastName":"Record","allergies":null,"status":"Active"}]"#,
            )
            .unwrap();

        let patients = tokio_test::block_on(store.get_all()).unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].id, 7);
        assert_eq!(patients[0].details.allergies, "");
    }
}
