//! Calls into the patient stored procedures.
//!
//! Each function runs exactly one procedure on the connection it is given and
//! maps the result rows into the domain model.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, PgConnection, Postgres, Row};

use crate::models::{NewPatient, Patient, PatientStatistics, PatientStatus};

const DETAIL_PARAMS: &str = "$1, $2, NULLIF($3, '')::date, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15";

const UPDATE_PARAMS: &str =
    "$1, $2, $3, NULLIF($4, '')::date, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16";

/// Bind the 15 caller-owned fields in procedure argument order
fn bind_details<'q>(
    query: Query<'q, Postgres, PgArguments>,
    d: &'q NewPatient,
) -> Query<'q, Postgres, PgArguments> {
    query
        .bind(d.first_name.as_str())
        .bind(d.last_name.as_str())
        .bind(d.date_of_birth.trim())
        .bind(d.gender.as_str())
        .bind(d.phone.as_str())
        .bind(d.email.as_str())
        .bind(d.address.as_str())
        .bind(d.blood_type.as_str())
        .bind(d.allergies.as_str())
        .bind(d.emergency_contact.as_str())
        .bind(d.emergency_phone.as_str())
        .bind(d.insurance_provider.as_str())
        .bind(d.insurance_number.as_str())
        .bind(d.medical_history.as_str())
        .bind(d.status.as_str())
}

fn count(row: &PgRow, column: &str) -> Result<u64, sqlx::Error> {
    let value = row.try_get::<Option<i64>, _>(column)?.unwrap_or(0);
    Ok(value.max(0) as u64)
}

/// One row of the patients table as the procedures return it; every column but Id is nullable
#[derive(Debug, Default, FromRow)]
#[sqlx(rename_all = "PascalCase")]
pub struct PatientRow {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub blood_type: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_number: Option<String>,
    pub medical_history: Option<String>,
    pub status: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl PatientRow {
    /// NULL text reads as empty, DateOfBirth becomes `YYYY-MM-DD`
    pub fn into_patient(self) -> Patient {
        Patient {
            id: self.id,
            details: NewPatient {
                first_name: self.first_name.unwrap_or_default(),
                last_name: self.last_name.unwrap_or_default(),
                date_of_birth: self
                    .date_of_birth
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                gender: self.gender.unwrap_or_default(),
                phone: self.phone.unwrap_or_default(),
                email: self.email.unwrap_or_default(),
                address: self.address.unwrap_or_default(),
                blood_type: self.blood_type.unwrap_or_default(),
                allergies: self.allergies.unwrap_or_default(),
                emergency_contact: self.emergency_contact.unwrap_or_default(),
                emergency_phone: self.emergency_phone.unwrap_or_default(),
                insurance_provider: self.insurance_provider.unwrap_or_default(),
                insurance_number: self.insurance_number.unwrap_or_default(),
                medical_history: self.medical_history.unwrap_or_default(),
                status: PatientStatus::from_db(self.status.as_deref()),
            },
            created_date: self.created_date,
            updated_date: self.updated_date,
        }
    }
}

pub fn patient_from_row(row: &PgRow) -> Result<Patient, sqlx::Error> {
    Ok(PatientRow::from_row(row)?.into_patient())
}

/// The record `AddPatient` created, using `now` for any timestamp it did not return
fn created_patient(
    id: i64,
    details: &NewPatient,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Patient {
    let mut patient = Patient::create(id, details.clone(), now).normalized();
    patient.created_date = created.or(Some(now));
    patient.updated_date = updated.or(Some(now));
    patient
}

/// `GetAllPatients()`
pub async fn get_all_patients(conn: &mut PgConnection) -> Result<Vec<Patient>, sqlx::Error> {
    let rows = sqlx::query(r#"SELECT * FROM "GetAllPatients"()"#)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(patient_from_row).collect()
}

/// `SearchPatients(SearchTerm)`
pub async fn search_patients(conn: &mut PgConnection, term: &str) -> Result<Vec<Patient>, sqlx::Error> {
    let rows = sqlx::query(r#"SELECT * FROM "SearchPatients"($1)"#)
        .bind(term)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(patient_from_row).collect()
}

/// `AddPatient(<15 fields>) -> NewPatientId`
pub async fn add_patient(conn: &mut PgConnection, details: &NewPatient) -> Result<Patient, sqlx::Error> {
    let sql = format!(r#"SELECT * FROM "AddPatient"({})"#, DETAIL_PARAMS);
    let row = bind_details(sqlx::query(&sql), details)
        .fetch_one(&mut *conn)
        .await?;

    let id: i64 = row.try_get("NewPatientId")?;
    // Timestamps are optional columns
    let created: Option<DateTime<Utc>> = row.try_get("CreatedDate").ok().flatten();
    let updated: Option<DateTime<Utc>> = row.try_get("UpdatedDate").ok().flatten();
    Ok(created_patient(id, details, created, updated, Utc::now()))
}

/// `UpdatePatient(Id, <15 fields>)`, which returns the updated row
pub async fn update_patient(
    conn: &mut PgConnection,
    id: i64,
    details: &NewPatient,
) -> Result<Patient, sqlx::Error> {
    let sql = format!(r#"SELECT * FROM "UpdatePatient"({})"#, UPDATE_PARAMS);
    let row = bind_details(sqlx::query(&sql).bind(id), details)
        .fetch_one(&mut *conn)
        .await?;
    patient_from_row(&row)
}

/// `DeletePatient(Id)`
pub async fn delete_patient(conn: &mut PgConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(r#"SELECT "DeletePatient"($1)"#)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// `GetPatientStatistics()`
pub async fn patient_statistics(conn: &mut PgConnection) -> Result<PatientStatistics, sqlx::Error> {
    let row = sqlx::query(r#"SELECT * FROM "GetPatientStatistics"()"#)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else {
        return Ok(PatientStatistics::default());
    };

    Ok(PatientStatistics {
        total_patients: count(&row, "TotalPatients")?,
        active_patients: count(&row, "ActivePatients")?,
        inactive_patients: count(&row, "InactivePatients")?,
        active_male: count(&row, "ActiveMale")?,
        active_female: count(&row, "ActiveFemale")?,
    })
}

/// Round-trip check used at startup
pub async fn ping(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1 AS test").execute(&mut *conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_lists_cover_every_field() {
        assert_eq!(DETAIL_PARAMS.matches('$').count(), 15);
        assert_eq!(UPDATE_PARAMS.matches('$').count(), 16);
        assert!(UPDATE_PARAMS.contains("NULLIF($4, '')::date"));
    }

    #[test]
    fn test_null_columns_map_to_empty_fields() {
        let patient = PatientRow {
            id: 12,
            first_name: Some("Ana".to_string()),
            ..Default::default()
        }
        .into_patient();

        assert_eq!(patient.id, 12);
        assert_eq!(patient.details.first_name, "Ana");
        assert_eq!(patient.details.last_name, "");
        assert_eq!(patient.details.date_of_birth, "");
        assert_eq!(patient.details.allergies, "");
        assert_eq!(patient.details.status, PatientStatus::Active);
        assert!(patient.created_date.is_none());
    }

    #[test]
    fn test_row_status_and_date_of_birth() {
        let stamp = Utc::now();
        let patient = PatientRow {
            id: 3,
            date_of_birth: NaiveDate::from_ymd_opt(1978, 11, 8),
            status: Some("Inactive".to_string()),
            created_date: Some(stamp),
            updated_date: Some(stamp),
            ..Default::default()
        }
        .into_patient();

        assert_eq!(patient.details.date_of_birth, "1978-11-08");
        assert_eq!(patient.details.status, PatientStatus::Inactive);
        assert_eq!(patient.created_date, Some(stamp));

        let unknown = PatientRow {
            status: Some("Archived".to_string()),
            ..Default::default()
        }
        .into_patient();
        assert_eq!(unknown.details.status, PatientStatus::Active);
    }

    #[test]
    fn test_created_patient_falls_back_to_now() {
        let now = Utc::now();
        let returned = now - chrono::Duration::seconds(5);
        let details = NewPatient {
            date_of_birth: "1990-04-12T00:00:00.000Z".to_string(),
            ..Default::default()
        };

        let patient = created_patient(9, &details, Some(returned), None, now);
        assert_eq!(patient.id, 9);
        assert_eq!(patient.details.date_of_birth, "1990-04-12");
        assert_eq!(patient.created_date, Some(returned));
        assert_eq!(patient.updated_date, Some(now));

        let patient = created_patient(9, &details, None, None, now);
        assert_eq!(patient.created_date, Some(now));
        assert_eq!(patient.updated_date, Some(now));
    }
}
