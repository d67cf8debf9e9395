//! Per-resource field validation, applied on create/update routes.
//!
//! Checks are required-field and enumerated-value level; deeper consistency
//! (referenced patient exists, status transitions) lives in the handlers.

use serde_json::{Map, Value};
use std::str::FromStr;

use dispensario_api::ApiError;
use dispensario_core::{PlainDate, RecordType};

pub const APPOINTMENT_STATES: [&str; 3] = ["PENDIENTE", "ATENDIDA", "CANCELADA"];
pub const DIAGNOSIS_KINDS: [&str; 2] = ["PRESUNTIVO", "DEFINITIVO"];
pub const URGENCY_LEVELS: [&str; 3] = ["ALTA", "MEDIA", "BAJA"];
pub const USER_ROLES: [&str; 4] = ["ADMIN", "MEDICO", "ENFERMERIA", "ADMISION"];
pub const SEX_VALUES: [&str; 2] = ["M", "F"];

/// Validate a create/update payload for a record type.
pub fn validate(record_type: RecordType, payload: &Map<String, Value>) -> Result<(), ApiError> {
    match record_type {
        RecordType::Patient => {
            require_str(payload, "documentNumber")?;
            require_str(payload, "givenNames")?;
            require_str(payload, "familyNames")?;
            optional_date(payload, "birthDate")?;
            optional_enum(payload, "sex", &SEX_VALUES)?;
        }
        RecordType::Appointment => {
            require_str(payload, "patientId")?;
            require_date(payload, "date")?;
            require_time(payload, "time")?;
            require_str(payload, "reason")?;
            optional_enum(payload, "state", &APPOINTMENT_STATES)?;
        }
        RecordType::Triage => {
            require_str(payload, "patientId")?;
            optional_positive_number(payload, "weightKg")?;
            optional_positive_number(payload, "heightCm")?;
            optional_positive_number(payload, "temperatureC")?;
            optional_positive_number(payload, "pulseBpm")?;
            optional_positive_number(payload, "oxygenSaturation")?;
            optional_positive_number(payload, "systolicMmhg")?;
            optional_positive_number(payload, "diastolicMmhg")?;
            optional_enum(payload, "urgency", &URGENCY_LEVELS)?;
        }
        RecordType::Attention => {
            require_str(payload, "patientId")?;
            require_date(payload, "date")?;
            require_str(payload, "reason")?;
        }
        RecordType::Diagnosis => {
            let code = require_str(payload, "cie10Code")?;
            if !is_valid_cie10(code) {
                return Err(ApiError::unprocessable(format!(
                    "field 'cie10Code' is not a valid CIE10 code: '{code}'"
                )));
            }
            require_str(payload, "description")?;
            optional_enum(payload, "kind", &DIAGNOSIS_KINDS)?;
        }
        RecordType::Procedure => {
            require_str(payload, "code")?;
            require_str(payload, "description")?;
        }
        RecordType::Prescription => {
            require_str(payload, "medication")?;
            require_str(payload, "dose")?;
            require_str(payload, "frequency")?;
            require_str(payload, "duration")?;
        }
        RecordType::Contraceptive => {
            require_str(payload, "patientId")?;
            require_str(payload, "method")?;
            require_date(payload, "startDate")?;
            optional_date(payload, "nextControlDate")?;
        }
        RecordType::Activity => {
            require_str(payload, "activityType")?;
            require_str(payload, "description")?;
            require_date(payload, "date")?;
        }
        RecordType::User => {
            require_str(payload, "username")?;
            require_str(payload, "name")?;
            require_enum(payload, "role", &USER_ROLES)?;
            if let Some(companies) = payload.get("companies") {
                let ok = companies
                    .as_array()
                    .is_some_and(|arr| arr.iter().all(|v| v.is_string()));
                if !ok {
                    return Err(ApiError::unprocessable(
                        "field 'companies' must be an array of company codes",
                    ));
                }
            }
        }
        RecordType::Company => {
            require_str(payload, "code")?;
            require_str(payload, "name")?;
            require_str(payload, "branchCode")?;
        }
    }
    Ok(())
}

/// CIE10 shape: an upper-case letter, two digits, optionally a dot and one or
/// two alphanumerics (`J02`, `J02.9`, `M54.5`).
pub fn is_valid_cie10(code: &str) -> bool {
    let bytes = code.as_bytes();
    if bytes.len() < 3 || !bytes[0].is_ascii_uppercase() {
        return false;
    }
    if !bytes[1].is_ascii_digit() || !bytes[2].is_ascii_digit() {
        return false;
    }
    match &bytes[3..] {
        [] => true,
        [b'.', rest @ ..] => {
            (1..=2).contains(&rest.len()) && rest.iter().all(u8::is_ascii_alphanumeric)
        }
        _ => false,
    }
}

fn require_str<'a>(payload: &'a Map<String, Value>, field: &str) -> Result<&'a str, ApiError> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::unprocessable(format!("field '{field}' is required")))
}

fn require_date(payload: &Map<String, Value>, field: &str) -> Result<(), ApiError> {
    let value = require_str(payload, field)?;
    PlainDate::from_str(value).map_err(|_| {
        ApiError::unprocessable(format!("field '{field}' must be a YYYY-MM-DD date"))
    })?;
    Ok(())
}

fn optional_date(payload: &Map<String, Value>, field: &str) -> Result<(), ApiError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(_) => require_date(payload, field),
    }
}

fn require_time(payload: &Map<String, Value>, field: &str) -> Result<(), ApiError> {
    let value = require_str(payload, field)?;
    let valid = matches!(value.as_bytes(), [h1, h2, b':', m1, m2]
        if h1.is_ascii_digit() && h2.is_ascii_digit()
            && m1.is_ascii_digit() && m2.is_ascii_digit())
        && value[..2].parse::<u8>().is_ok_and(|h| h < 24)
        && value[3..].parse::<u8>().is_ok_and(|m| m < 60);
    if !valid {
        return Err(ApiError::unprocessable(format!(
            "field '{field}' must be an HH:MM time"
        )));
    }
    Ok(())
}

fn optional_positive_number(payload: &Map<String, Value>, field: &str) -> Result<(), ApiError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(value) => {
            let ok = value.as_f64().is_some_and(|n| n > 0.0);
            if ok {
                Ok(())
            } else {
                Err(ApiError::unprocessable(format!(
                    "field '{field}' must be a positive number"
                )))
            }
        }
    }
}

fn require_enum(
    payload: &Map<String, Value>,
    field: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let value = require_str(payload, field)?;
    if !allowed.contains(&value) {
        return Err(ApiError::unprocessable(format!(
            "field '{field}' must be one of {allowed:?}"
        )));
    }
    Ok(())
}

fn optional_enum(
    payload: &Map<String, Value>,
    field: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    match payload.get(field) {
        None | Some(Value::Null) => Ok(()),
        Some(_) => require_enum(payload, field, allowed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn patient_requires_identity_fields() {
        let ok = obj(json!({
            "documentNumber": "44556677",
            "givenNames": "Rosa",
            "familyNames": "Vargas",
            "birthDate": "1988-05-20",
            "sex": "F"
        }));
        assert!(validate(RecordType::Patient, &ok).is_ok());

        let missing = obj(json!({"givenNames": "Rosa", "familyNames": "Vargas"}));
        let err = validate(RecordType::Patient, &missing).unwrap_err();
        assert!(err.message().contains("documentNumber"));

        let blank = obj(json!({
            "documentNumber": "  ",
            "givenNames": "Rosa",
            "familyNames": "Vargas"
        }));
        assert!(validate(RecordType::Patient, &blank).is_err());
    }

    #[test]
    fn patient_rejects_bad_birth_date_and_sex() {
        let bad_date = obj(json!({
            "documentNumber": "1",
            "givenNames": "R",
            "familyNames": "V",
            "birthDate": "20-05-1988"
        }));
        assert!(validate(RecordType::Patient, &bad_date).is_err());

        let bad_sex = obj(json!({
            "documentNumber": "1",
            "givenNames": "R",
            "familyNames": "V",
            "sex": "X"
        }));
        assert!(validate(RecordType::Patient, &bad_sex).is_err());
    }

    #[test]
    fn appointment_checks_date_time_and_state() {
        let ok = obj(json!({
            "patientId": "p-1",
            "date": "2024-04-01",
            "time": "09:30",
            "reason": "control",
            "state": "PENDIENTE"
        }));
        assert!(validate(RecordType::Appointment, &ok).is_ok());

        let bad_time = obj(json!({
            "patientId": "p-1",
            "date": "2024-04-01",
            "time": "25:00",
            "reason": "control"
        }));
        assert!(validate(RecordType::Appointment, &bad_time).is_err());

        let bad_state = obj(json!({
            "patientId": "p-1",
            "date": "2024-04-01",
            "time": "09:30",
            "reason": "control",
            "state": "HECHA"
        }));
        assert!(validate(RecordType::Appointment, &bad_state).is_err());
    }

    #[test]
    fn triage_checks_vitals_are_positive_numbers() {
        let ok = obj(json!({
            "patientId": "p-1",
            "weightKg": 72.5,
            "temperatureC": 37.2,
            "urgency": "MEDIA"
        }));
        assert!(validate(RecordType::Triage, &ok).is_ok());

        let bad = obj(json!({"patientId": "p-1", "weightKg": -3}));
        assert!(validate(RecordType::Triage, &bad).is_err());

        let bad = obj(json!({"patientId": "p-1", "pulseBpm": "setenta"}));
        assert!(validate(RecordType::Triage, &bad).is_err());
    }

    #[test]
    fn diagnosis_checks_cie10_shape() {
        let ok = obj(json!({
            "cie10Code": "J02.9",
            "description": "Faringitis aguda",
            "kind": "DEFINITIVO"
        }));
        assert!(validate(RecordType::Diagnosis, &ok).is_ok());

        let bad = obj(json!({"cie10Code": "FARINGITIS", "description": "x"}));
        assert!(validate(RecordType::Diagnosis, &bad).is_err());
    }

    #[test]
    fn cie10_shapes() {
        assert!(is_valid_cie10("J02"));
        assert!(is_valid_cie10("J02.9"));
        assert!(is_valid_cie10("M54.5"));
        assert!(is_valid_cie10("Z00.00"));
        assert!(!is_valid_cie10("j02"));
        assert!(!is_valid_cie10("J0"));
        assert!(!is_valid_cie10("J02."));
        assert!(!is_valid_cie10("J02.999"));
        assert!(!is_valid_cie10("J02-9"));
        assert!(!is_valid_cie10(""));
    }

    #[test]
    fn user_requires_role_and_company_array() {
        let ok = obj(json!({
            "username": "dsalas",
            "name": "Dra. Salas",
            "role": "MEDICO",
            "companies": ["SEDE01"]
        }));
        assert!(validate(RecordType::User, &ok).is_ok());

        let bad_role = obj(json!({"username": "x", "name": "X", "role": "DOCTOR"}));
        assert!(validate(RecordType::User, &bad_role).is_err());

        let bad_companies = obj(json!({
            "username": "x",
            "name": "X",
            "role": "ADMIN",
            "companies": "SEDE01"
        }));
        assert!(validate(RecordType::User, &bad_companies).is_err());
    }

    #[test]
    fn company_requires_codes() {
        let ok = obj(json!({"code": "SEDE01", "name": "Sede principal", "branchCode": "SUC01"}));
        assert!(validate(RecordType::Company, &ok).is_ok());

        let bad = obj(json!({"code": "SEDE01", "name": "Sede principal"}));
        assert!(validate(RecordType::Company, &bad).is_err());
    }

    #[test]
    fn prescription_requires_posology() {
        let ok = obj(json!({
            "medication": "Paracetamol 500mg",
            "dose": "1 tableta",
            "frequency": "cada 8 horas",
            "duration": "3 días"
        }));
        assert!(validate(RecordType::Prescription, &ok).is_ok());

        let bad = obj(json!({"medication": "Paracetamol 500mg"}));
        assert!(validate(RecordType::Prescription, &bad).is_err());
    }

    #[test]
    fn contraceptive_requires_method_and_start() {
        let ok = obj(json!({
            "patientId": "p-1",
            "method": "ORAL",
            "startDate": "2024-01-10",
            "nextControlDate": "2024-04-10"
        }));
        assert!(validate(RecordType::Contraceptive, &ok).is_ok());

        let bad = obj(json!({"patientId": "p-1", "startDate": "2024-01-10"}));
        assert!(validate(RecordType::Contraceptive, &bad).is_err());
    }
}
