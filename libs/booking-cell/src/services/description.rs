// libs/booking-cell/src/services/description.rs
//! Structured calendar event descriptions.
//!
//! The commit coordinator writes these; the reminder sweeper reads them to
//! recover recipient identity without a datastore join. The format is a
//! contract between the two: a version tag on the first line followed by
//! one `key=value` field per line. Unknown versions and missing fields are
//! decode errors, not silent misses.

use std::collections::HashMap;

pub const DESCRIPTION_VERSION: &str = "v1";

const FIELD_PATIENT_NAME: &str = "patient_name";
const FIELD_PATIENT_EMAIL: &str = "patient_email";
const FIELD_DOCTOR_ID: &str = "doctor_id";
const FIELD_CLINIC_ID: &str = "clinic_id";
const FIELD_DURATION_MINUTES: &str = "duration_minutes";

#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionFields {
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_id: String,
    pub clinic_id: String,
    pub duration_minutes: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    #[error("unsupported description version: {0:?}")]
    UnsupportedVersion(String),

    #[error("missing description field: {0}")]
    MissingField(&'static str),

    #[error("malformed description line: {0:?}")]
    MalformedLine(String),
}

pub fn encode(fields: &DescriptionFields) -> String {
    let mut out = String::from(DESCRIPTION_VERSION);
    for (key, value) in [
        (FIELD_PATIENT_NAME, fields.patient_name.as_str()),
        (FIELD_PATIENT_EMAIL, fields.patient_email.as_str()),
        (FIELD_DOCTOR_ID, fields.doctor_id.as_str()),
        (FIELD_CLINIC_ID, fields.clinic_id.as_str()),
    ] {
        out.push('\n');
        out.push_str(key);
        out.push('=');
        out.push_str(&sanitize(value));
    }
    out.push('\n');
    out.push_str(FIELD_DURATION_MINUTES);
    out.push('=');
    out.push_str(&fields.duration_minutes.to_string());
    out
}

pub fn decode(text: &str) -> Result<DescriptionFields, DescriptionError> {
    let mut lines = text.lines();

    let version = lines.next().unwrap_or_default().trim();
    if version != DESCRIPTION_VERSION {
        return Err(DescriptionError::UnsupportedVersion(version.to_string()));
    }

    let mut fields: HashMap<&str, String> = HashMap::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| DescriptionError::MalformedLine(line.to_string()))?;
        match key {
            FIELD_PATIENT_NAME | FIELD_PATIENT_EMAIL | FIELD_DOCTOR_ID | FIELD_CLINIC_ID
            | FIELD_DURATION_MINUTES => {
                fields.insert(key, value.to_string());
            }
            // Unknown keys are tolerated so v1 readers survive additive
            // changes; a breaking change bumps the version line instead.
            _ => {}
        }
    }

    let mut take = |key: &'static str| -> Result<String, DescriptionError> {
        fields.remove(key).ok_or(DescriptionError::MissingField(key))
    };

    let duration_raw = take(FIELD_DURATION_MINUTES)?;
    let duration_minutes = duration_raw
        .parse::<i64>()
        .map_err(|_| DescriptionError::MalformedLine(duration_raw.clone()))?;

    Ok(DescriptionFields {
        patient_name: take(FIELD_PATIENT_NAME)?,
        patient_email: take(FIELD_PATIENT_EMAIL)?,
        doctor_id: take(FIELD_DOCTOR_ID)?,
        clinic_id: take(FIELD_CLINIC_ID)?,
        duration_minutes,
    })
}

/// Field values live one per line, so embedded newlines must not survive.
fn sanitize(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}
