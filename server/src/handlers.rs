use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use clinic_db::{NewPatient, Patient, PatientStatistics, PatientStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;

pub type AppState = Arc<dyn PatientStore>;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive substring over names and email, literal over phone
    pub search: Option<String>,
}

/// A patient echoed back together with a confirmation message
#[derive(Debug, Serialize, Deserialize)]
pub struct PatientResponse {
    #[serde(flatten)]
    pub patient: Patient,
    pub message: String,
}

/// GET /patients
pub async fn list_patients(
    State(store): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let term = query.search.as_deref().map(str::trim).unwrap_or_default();
    let patients = if term.is_empty() {
        store.get_all().await
    } else {
        store.search(term).await
    }
    .map_err(|e| ApiError::from_store(e, "Failed to fetch patients"))?;

    Ok(Json(patients.into_iter().map(Patient::normalized).collect()))
}

/// POST /patients
pub async fn create_patient(
    State(store): State<AppState>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientResponse>), ApiError> {
    let Json(patient) = payload?;
    let created = store
        .add(patient)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to add patient"))?;

    Ok((
        StatusCode::CREATED,
        Json(PatientResponse {
            patient: created.normalized(),
            message: "Patient added successfully".to_string(),
        }),
    ))
}

/// PUT /patients/:id
pub async fn update_patient(
    State(store): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<Json<PatientResponse>, ApiError> {
    let Json(patient) = payload?;
    let updated = store
        .update(id, patient)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to update patient"))?;

    Ok(Json(PatientResponse {
        patient: updated.normalized(),
        message: "Patient updated successfully".to_string(),
    }))
}

/// DELETE /patients/:id
pub async fn delete_patient(
    State(store): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    store
        .delete(id)
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to delete patient"))?;

    Ok(Json(json!({ "message": "Patient deleted successfully" })))
}

/// GET /patients/statistics
pub async fn patient_statistics(
    State(store): State<AppState>,
) -> Result<Json<PatientStatistics>, ApiError> {
    let stats = store
        .statistics()
        .await
        .map_err(|e| ApiError::from_store(e, "Failed to fetch statistics"))?;
    Ok(Json(stats))
}
