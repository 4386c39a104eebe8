//! # clinic-db
//!
//! Patient record model and the storage contract shared by every backend.
//!
//! - `models`: `Patient`, `NewPatient`, statistics and delete policy
//! - `store`: the `PatientStore` trait
//! - `file`: JSON document on disk
//! - `local`: browser-style key/value storage
//! - `sql`: relational database through stored procedures
//! - `browser`: cached, latest-wins view for a presentation layer

pub mod browser;
pub mod error;
pub mod file;
pub mod local;
pub mod models;
mod records;
pub mod seed;
pub mod sql;
pub mod store;

pub use browser::{PatientBrowser, SearchOutcome, Snapshot};
pub use error::{Result, StoreError};
pub use file::FilePatientStore;
pub use local::{KeyValueStore, LocalStoragePatientStore, MemoryKeyValueStore};
pub use models::{DeletePolicy, NewPatient, Patient, PatientStatistics, PatientStatus};
pub use sql::{DbConfig, SqlPatientStore};
pub use store::PatientStore;
