use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Soft-delete flag carried by every patient record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PatientStatus {
    #[default]
    Active,
    Inactive,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Active => "Active",
            PatientStatus::Inactive => "Inactive",
        }
    }

    /// Parse the database representation. Unknown or missing values read as Active.
    pub fn from_db(value: Option<&str>) -> Self {
        match value {
            Some("Inactive") => PatientStatus::Inactive,
            _ => PatientStatus::Active,
        }
    }
}

impl std::fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied patient fields: everything except id and timestamps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPatient {
    #[serde(deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date_of_birth: String,
    #[serde(deserialize_with = "null_as_default")]
    pub gender: String,
    #[serde(deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub blood_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub allergies: String,
    #[serde(deserialize_with = "null_as_default")]
    pub emergency_contact: String,
    #[serde(deserialize_with = "null_as_default")]
    pub emergency_phone: String,
    #[serde(deserialize_with = "null_as_default")]
    pub insurance_provider: String,
    #[serde(deserialize_with = "null_as_default")]
    pub insurance_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub medical_history: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: PatientStatus,
}

/// Reads a JSON `null` as the field's default instead of failing the whole record
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A stored patient record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    #[serde(flatten)]
    pub details: NewPatient,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<DateTime<Utc>>,
}

impl Patient {
    /// Build a freshly created record, stamping both timestamps
    pub fn create(id: i64, details: NewPatient, now: DateTime<Utc>) -> Self {
        Self {
            id,
            details,
            created_date: Some(now),
            updated_date: Some(now),
        }
    }

    pub fn is_active(&self) -> bool {
        self.details.status == PatientStatus::Active
    }

    /// Case-insensitive match on names and email, literal match on phone
    pub fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        let d = &self.details;
        d.first_name.to_lowercase().contains(&needle)
            || d.last_name.to_lowercase().contains(&needle)
            || d.email.to_lowercase().contains(&needle)
            || d.phone.contains(term)
    }

    /// Replace every caller-owned field, keeping id and createdDate
    pub fn apply_update(&mut self, details: NewPatient, now: DateTime<Utc>) {
        self.details = details;
        self.touch(now);
    }

    /// Refresh updatedDate so it never goes backwards for this record
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_date = Some(next_timestamp(self.updated_date, now));
    }

    /// Copy with dateOfBirth cut down to `YYYY-MM-DD`
    pub fn normalized(mut self) -> Self {
        self.details.date_of_birth = normalize_date(&self.details.date_of_birth);
        self
    }
}

/// Aggregate counters over the whole stored set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatientStatistics {
    pub total_patients: u64,
    pub active_patients: u64,
    pub inactive_patients: u64,
    pub active_male: u64,
    pub active_female: u64,
}

impl PatientStatistics {
    pub fn from_records(records: &[Patient]) -> Self {
        records.iter().fold(Self::default(), |mut stats, p| {
            stats.total_patients += 1;
            match p.details.status {
                PatientStatus::Active => {
                    stats.active_patients += 1;
                    match p.details.gender.as_str() {
                        "Male" => stats.active_male += 1,
                        "Female" => stats.active_female += 1,
                        _ => {}
                    }
                }
                PatientStatus::Inactive => stats.inactive_patients += 1,
            }
            stats
        })
    }
}

/// How the file and local-storage adapters treat `delete`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Flip status to Inactive and keep the record
    #[default]
    Soft,
    /// Remove the record from the store
    Hard,
}

impl std::str::FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(DeletePolicy::Soft),
            "hard" => Ok(DeletePolicy::Hard),
            other => Err(format!("unknown delete policy: {}", other)),
        }
    }
}

/// `now`, or one microsecond past `previous` when the clock has not moved on
pub fn next_timestamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

/// Reduce an ISO date or datetime string to `YYYY-MM-DD`; anything else passes through
pub fn normalize_date(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(prefix) = trimmed.get(..10) {
        if NaiveDate::parse_from_str(prefix, "%Y-%m-%d").is_ok() {
            return prefix.to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(first: &str, gender: &str, status: PatientStatus) -> Patient {
        Patient::create(
            1,
            NewPatient {
                first_name: first.to_string(),
                last_name: "Doe".to_string(),
                email: format!("{}@email.com", first.to_lowercase()),
                phone: "(555) 123-4567".to_string(),
                gender: gender.to_string(),
                status,
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_patient_serialization_uses_camel_case() {
        let patient = sample("John", "Male", PatientStatus::Active);
        let json = serde_json::to_value(&patient).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["firstName"], "John");
        assert_eq!(json["status"], "Active");
        assert!(json["createdDate"].is_string());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let patient: Patient = serde_json::from_str(
            r#"{"id":7,"firstName":"Kept","lastName":null,"allergies":null,"status":null}"#,
        )
        .unwrap();

        assert_eq!(patient.id, 7);
        assert_eq!(patient.details.first_name, "Kept");
        assert_eq!(patient.details.last_name, "");
        assert_eq!(patient.details.allergies, "");
        assert_eq!(patient.details.status, PatientStatus::Active);
        assert!(patient.created_date.is_none());
    }

    #[test]
    fn test_new_patient_tolerates_missing_fields() {
        let parsed: NewPatient = serde_json::from_str(r#"{"firstName": "A", "lastName": "B"}"#).unwrap();
        assert_eq!(parsed.first_name, "A");
        assert_eq!(parsed.email, "");
        assert_eq!(parsed.status, PatientStatus::Active);
    }

    #[test]
    fn test_patient_without_timestamps_skips_them() {
        let mut patient = sample("Jane", "Female", PatientStatus::Active);
        patient.created_date = None;
        patient.updated_date = None;

        let json = serde_json::to_string(&patient).unwrap();
        assert!(!json.contains("createdDate"));
        assert!(!json.contains("updatedDate"));
    }

    #[test]
    fn test_matches_is_case_insensitive_except_phone() {
        let patient = sample("Sarah", "Female", PatientStatus::Active);
        assert!(patient.matches("sar"));
        assert!(patient.matches("DOE"));
        assert!(patient.matches("sarah@"));
        assert!(patient.matches("123-45"));
        assert!(patient.matches(""));
        assert!(!patient.matches("smith"));
    }

    #[test]
    fn test_statistics_counts_exact_gender_only() {
        let records = vec![
            sample("A", "Male", PatientStatus::Active),
            sample("B", "Female", PatientStatus::Active),
            sample("C", "male", PatientStatus::Active),
            sample("D", "Other", PatientStatus::Active),
            sample("E", "Male", PatientStatus::Inactive),
        ];

        let stats = PatientStatistics::from_records(&records);
        assert_eq!(stats.total_patients, 5);
        assert_eq!(stats.active_patients, 4);
        assert_eq!(stats.inactive_patients, 1);
        assert_eq!(stats.active_male, 1);
        assert_eq!(stats.active_female, 1);
        assert_eq!(stats.total_patients, stats.active_patients + stats.inactive_patients);
    }

    #[test]
    fn test_next_timestamp_never_repeats() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(next_timestamp(None, t), t);
        assert!(next_timestamp(Some(t), t) > t);
        let later = t + Duration::seconds(5);
        assert_eq!(next_timestamp(Some(t), later), later);
    }

    #[test]
    fn test_apply_update_preserves_created_date() {
        let mut patient = sample("John", "Male", PatientStatus::Active);
        let created = patient.created_date;
        let before = patient.updated_date.unwrap();

        let details = NewPatient {
            first_name: "Johnny".to_string(),
            ..patient.details.clone()
        };
        patient.apply_update(details, before);

        assert_eq!(patient.id, 1);
        assert_eq!(patient.created_date, created);
        assert_eq!(patient.details.first_name, "Johnny");
        assert!(patient.updated_date.unwrap() > before);
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("1985-06-15"), "1985-06-15");
        assert_eq!(normalize_date("1985-06-15T00:00:00.000Z"), "1985-06-15");
        assert_eq!(normalize_date(""), "");
        assert_eq!(normalize_date("June 1985"), "June 1985");
    }

    #[test]
    fn test_delete_policy_parsing() {
        assert_eq!("soft".parse::<DeletePolicy>().unwrap(), DeletePolicy::Soft);
        assert_eq!(" HARD ".parse::<DeletePolicy>().unwrap(), DeletePolicy::Hard);
        assert!("archive".parse::<DeletePolicy>().is_err());
    }
}
