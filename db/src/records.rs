//! In-memory operations over a whole patient sequence.
//!
//! The file and local-storage adapters both load the full sequence, apply one of
//! these operations and write the sequence back.

use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};
use crate::models::{DeletePolicy, NewPatient, Patient, PatientStatistics, PatientStatus};

#[derive(Debug, Clone, Default)]
pub(crate) struct PatientRecords {
    patients: Vec<Patient>,
}

impl PatientRecords {
    pub fn new(patients: Vec<Patient>) -> Self {
        Self { patients }
    }

    pub fn as_slice(&self) -> &[Patient] {
        &self.patients
    }

    pub fn active(&self) -> Vec<Patient> {
        self.patients.iter().filter(|p| p.is_active()).cloned().collect()
    }

    pub fn search(&self, term: &str) -> Vec<Patient> {
        self.patients
            .iter()
            .filter(|p| p.is_active() && p.matches(term))
            .cloned()
            .collect()
    }

    pub fn find(&self, id: i64) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn statistics(&self) -> PatientStatistics {
        PatientStatistics::from_records(&self.patients)
    }

    /// Highest stored id, or 0 for an empty sequence
    pub fn max_id(&self) -> i64 {
        self.patients.iter().map(|p| p.id).max().unwrap_or(0)
    }

    /// One past the highest id seen, never below `issued_floor + 1`
    pub fn next_id(&self, issued_floor: i64) -> Result<i64> {
        self.max_id()
            .max(issued_floor)
            .checked_add(1)
            .ok_or_else(|| StoreError::Storage("id space exhausted".to_string()))
    }

    pub fn add(
        &mut self,
        details: NewPatient,
        now: DateTime<Utc>,
        issued_floor: i64,
    ) -> Result<Patient> {
        let patient = Patient::create(self.next_id(issued_floor)?, details, now);
        self.patients.push(patient.clone());
        Ok(patient)
    }

    pub fn update(&mut self, id: i64, details: NewPatient, now: DateTime<Utc>) -> Result<Patient> {
        let patient = self
            .patients
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;
        patient.apply_update(details, now);
        Ok(patient.clone())
    }

    pub fn delete(&mut self, id: i64, policy: DeletePolicy, now: DateTime<Utc>) -> Result<()> {
        let index = self
            .patients
            .iter()
            .position(|p| p.id == id)
            .ok_or(StoreError::NotFound(id))?;

        match policy {
            DeletePolicy::Soft => {
                let patient = &mut self.patients[index];
                patient.details.status = PatientStatus::Inactive;
                patient.touch(now);
            }
            DeletePolicy::Hard => {
                self.patients.remove(index);
            }
        }
        Ok(())
    }
}
