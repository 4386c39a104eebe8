//! Sample records written when a store has no prior data.

use chrono::{DateTime, Utc};

use crate::models::{NewPatient, Patient, PatientStatus};

fn john_doe() -> NewPatient {
    NewPatient {
        first_name: "John".to_string(),
        last_name: "Doe".to_string(),
        date_of_birth: "1985-06-15".to_string(),
        gender: "Male".to_string(),
        phone: "(555) 123-4567".to_string(),
        email: "john.doe@email.com".to_string(),
        address: "123 Main St, City, State 12345".to_string(),
        blood_type: "O+".to_string(),
        allergies: "Penicillin".to_string(),
        emergency_contact: "Jane Doe".to_string(),
        emergency_phone: "(555) 987-6543".to_string(),
        insurance_provider: "Blue Cross".to_string(),
        insurance_number: "BC123456789".to_string(),
        medical_history: "Hypertension, managed with medication".to_string(),
        status: PatientStatus::Active,
    }
}

fn sarah_johnson() -> NewPatient {
    NewPatient {
        first_name: "Sarah".to_string(),
        last_name: "Johnson".to_string(),
        date_of_birth: "1992-03-22".to_string(),
        gender: "Female".to_string(),
        phone: "(555) 234-5678".to_string(),
        email: "sarah.johnson@email.com".to_string(),
        address: "456 Oak Ave, City, State 12345".to_string(),
        blood_type: "A-".to_string(),
        allergies: "None known".to_string(),
        emergency_contact: "Mike Johnson".to_string(),
        emergency_phone: "(555) 876-5432".to_string(),
        insurance_provider: "Aetna".to_string(),
        insurance_number: "AE987654321".to_string(),
        medical_history: "No significant medical history".to_string(),
        status: PatientStatus::Active,
    }
}

fn michael_brown() -> NewPatient {
    NewPatient {
        first_name: "Michael".to_string(),
        last_name: "Brown".to_string(),
        date_of_birth: "1978-11-08".to_string(),
        gender: "Male".to_string(),
        phone: "(555) 345-6789".to_string(),
        email: "michael.brown@email.com".to_string(),
        address: "789 Pine St, City, State 12345".to_string(),
        blood_type: "B+".to_string(),
        allergies: "Shellfish".to_string(),
        emergency_contact: "Lisa Brown".to_string(),
        emergency_phone: "(555) 765-4321".to_string(),
        insurance_provider: "Cigna".to_string(),
        insurance_number: "CG456789123".to_string(),
        medical_history: "Type 2 Diabetes, well controlled".to_string(),
        status: PatientStatus::Active,
    }
}

fn numbered(details: Vec<NewPatient>, now: DateTime<Utc>) -> Vec<Patient> {
    details
        .into_iter()
        .zip(1..)
        .map(|(d, id)| Patient::create(id, d, now))
        .collect()
}

/// Seed for the JSON file adapter
pub fn file_seed(now: DateTime<Utc>) -> Vec<Patient> {
    numbered(vec![john_doe(), sarah_johnson()], now)
}

/// Seed for the local-storage adapter
pub fn local_seed(now: DateTime<Utc>) -> Vec<Patient> {
    numbered(vec![john_doe(), sarah_johnson(), michael_brown()], now)
}
