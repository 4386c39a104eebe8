//! The storage contract every backend implements.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewPatient, Patient, PatientStatistics};

/// Patient persistence backend.
///
/// Implementations are picked when the process is wired up and shared behind
/// `Arc<dyn PatientStore>`.
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// All patients whose status is Active, in insertion order.
    async fn get_all(&self) -> Result<Vec<Patient>>;

    /// Active patients matching `term` on first name, last name, email or phone.
    ///
    /// An empty term yields the same set as [`PatientStore::get_all`].
    async fn search(&self, term: &str) -> Result<Vec<Patient>>;

    /// Persist a new patient, assigning its id and timestamps.
    async fn add(&self, patient: NewPatient) -> Result<Patient>;

    /// Overwrite every field of patient `id` except its id and createdDate.
    ///
    /// # Errors
    /// `StoreError::NotFound` when the id does not exist (file and local-storage adapters).
    async fn update(&self, id: i64, patient: NewPatient) -> Result<Patient>;

    /// Delete patient `id` according to the adapter's delete policy.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Counters over every stored record, active or not.
    async fn statistics(&self) -> Result<PatientStatistics>;
}
