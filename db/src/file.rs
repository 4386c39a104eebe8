//! JSON file adapter.
//!
//! The whole patient sequence lives in one JSON document. Every mutation reads
//! the document, changes it in memory and writes it back through a temp file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{DeletePolicy, NewPatient, Patient, PatientStatistics};
use crate::records::PatientRecords;
use crate::seed;
use crate::store::PatientStore;

pub const DEFAULT_DATA_FILE: &str = "data/patients.json";

pub struct FilePatientStore {
    path: PathBuf,
    delete_policy: DeletePolicy,
    // Serializes read-modify-write cycles within this process only
    lock: Mutex<()>,
    last_issued: AtomicI64,
}

impl FilePatientStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delete_policy: DeletePolicy::default(),
            lock: Mutex::new(()),
            last_issued: AtomicI64::new(0),
        }
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Look up a record by id regardless of its status
    pub async fn find(&self, id: i64) -> Result<Option<Patient>> {
        let _guard = self.lock.lock().await;
        let records = self.load().await?;
        Ok(records.find(id).cloned())
    }

    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Read the document, seeding it when it is missing or unparseable
    async fn load(&self) -> Result<PatientRecords> {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<Patient>>(&bytes) {
                Ok(patients) => return Ok(PatientRecords::new(patients)),
                Err(e) => {
                    tracing::warn!(
                        "⚠ Patient file {} is not valid JSON ({}), reinitializing with seed data",
                        self.path.display(),
                        e
                    );
                    self.back_up_corrupt().await?;
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("Patient file {} not found, seeding sample data", self.path.display());
            }
            Err(e) => return Err(e.into()),
        }

        let records = PatientRecords::new(seed::file_seed(Utc::now()));
        self.save(&records).await?;
        Ok(records)
    }

    /// Keep the unreadable bytes next to the data file before it is overwritten
    async fn back_up_corrupt(&self) -> Result<()> {
        let mut backup = self.path.clone().into_os_string();
        backup.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.f")));
        fs::rename(&self.path, &backup).await?;
        tracing::warn!("⚠ Corrupt patient data moved to {}", Path::new(&backup).display());
        Ok(())
    }

    async fn save(&self, records: &PatientRecords) -> Result<()> {
        self.ensure_dir().await?;
        let content = serde_json::to_string_pretty(records.as_slice())?;

        let tmp = self.path.with_file_name(format!(".patients-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn issued_floor(&self) -> i64 {
        self.last_issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PatientStore for FilePatientStore {
    async fn get_all(&self) -> Result<Vec<Patient>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.active())
    }

    async fn search(&self, term: &str) -> Result<Vec<Patient>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.search(term))
    }

    async fn add(&self, patient: NewPatient) -> Result<Patient> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let created = records.add(patient, Utc::now(), self.issued_floor())?;
        self.save(&records).await?;
        self.last_issued.fetch_max(created.id, Ordering::SeqCst);

        tracing::info!("✓ Patient created: {}", created.id);
        Ok(created)
    }

    async fn update(&self, id: i64, patient: NewPatient) -> Result<Patient> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        let updated = records.update(id, patient, Utc::now())?;
        self.save(&records).await?;

        tracing::info!("✓ Patient updated: {}", id);
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if self.delete_policy == DeletePolicy::Hard {
            self.last_issued.fetch_max(records.max_id(), Ordering::SeqCst);
        }
        records.delete(id, self.delete_policy, Utc::now())?;
        self.save(&records).await?;

        tracing::info!("✓ Patient deleted ({:?}): {}", self.delete_policy, id);
        Ok(())
    }

    async fn statistics(&self) -> Result<PatientStatistics> {
        let _guard = self.lock.lock().await;
        match self.load().await {
            Ok(records) => Ok(records.statistics()),
            Err(e) => {
                tracing::warn!("⚠ Failed to compute statistics, reporting zeros: {}", e);
                Ok(PatientStatistics::default())
            }
        }
    }
}
