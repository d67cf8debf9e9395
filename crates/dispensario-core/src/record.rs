use crate::error::CoreError;
use crate::time::ClinicalDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Record types managed by the dispensary.
///
/// The set is closed: the schema of a dispensary installation is fixed, so an
/// unknown type in a URL or payload is a client error rather than a custom
/// resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    Patient,
    Appointment,
    Triage,
    Attention,
    Diagnosis,
    Procedure,
    Prescription,
    Contraceptive,
    Activity,
    User,
    Company,
}

impl RecordType {
    pub const ALL: [RecordType; 11] = [
        RecordType::Patient,
        RecordType::Appointment,
        RecordType::Triage,
        RecordType::Attention,
        RecordType::Diagnosis,
        RecordType::Procedure,
        RecordType::Prescription,
        RecordType::Contraceptive,
        RecordType::Activity,
        RecordType::User,
        RecordType::Company,
    ];

    /// Record types whose rows belong to a company and are subject to the
    /// active-companies scope.
    pub fn is_company_scoped(&self) -> bool {
        !matches!(self, RecordType::User | RecordType::Company)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordType::Patient => "Patient",
            RecordType::Appointment => "Appointment",
            RecordType::Triage => "Triage",
            RecordType::Attention => "Attention",
            RecordType::Diagnosis => "Diagnosis",
            RecordType::Procedure => "Procedure",
            RecordType::Prescription => "Prescription",
            RecordType::Contraceptive => "Contraceptive",
            RecordType::Activity => "Activity",
            RecordType::User => "User",
            RecordType::Company => "Company",
        };
        write!(f, "{name}")
    }
}

impl FromStr for RecordType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(RecordType::Patient),
            "Appointment" => Ok(RecordType::Appointment),
            "Triage" => Ok(RecordType::Triage),
            "Attention" => Ok(RecordType::Attention),
            "Diagnosis" => Ok(RecordType::Diagnosis),
            "Procedure" => Ok(RecordType::Procedure),
            "Prescription" => Ok(RecordType::Prescription),
            "Contraceptive" => Ok(RecordType::Contraceptive),
            "Activity" => Ok(RecordType::Activity),
            "User" => Ok(RecordType::User),
            "Company" => Ok(RecordType::Company),
            other => Err(CoreError::invalid_record_type(other)),
        }
    }
}

/// Lifecycle state stored on every record.
///
/// Wire values are the enumerated states the system has always persisted;
/// `Finished` and `Inactive` are terminal, removal of clinical rows is a
/// status change, not a physical delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecordStatus {
    #[default]
    #[serde(rename = "ACTIVO")]
    Active,
    #[serde(rename = "SUSPENDIDO")]
    Suspended,
    #[serde(rename = "FINALIZADO")]
    Finished,
    #[serde(rename = "INACTIVO")]
    Inactive,
}

impl RecordStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, RecordStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordStatus::Finished | RecordStatus::Inactive)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "ACTIVO",
            RecordStatus::Suspended => "SUSPENDIDO",
            RecordStatus::Finished => "FINALIZADO",
            RecordStatus::Inactive => "INACTIVO",
        }
    }
}

impl FromStr for RecordStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVO" => Ok(RecordStatus::Active),
            "SUSPENDIDO" => Ok(RecordStatus::Suspended),
            "FINALIZADO" => Ok(RecordStatus::Finished),
            "INACTIVO" => Ok(RecordStatus::Inactive),
            other => Err(CoreError::invalid_record(format!(
                "unknown status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    #[serde(rename = "createdAt")]
    pub created_at: ClinicalDateTime,
    #[serde(rename = "lastUpdated")]
    pub last_updated: ClinicalDateTime,
}

impl RecordMeta {
    pub fn new() -> Self {
        let now = crate::time::now_utc();
        Self {
            created_at: now.clone(),
            last_updated: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = crate::time::now_utc();
    }
}

impl Default for RecordMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// A dispensary record: typed header plus the flat field map of the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEnvelope {
    pub id: String,
    #[serde(rename = "recordType")]
    pub record_type: RecordType,
    pub status: RecordStatus,
    pub meta: RecordMeta,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl RecordEnvelope {
    pub fn new(id: String, record_type: RecordType) -> Self {
        Self {
            id,
            record_type,
            status: RecordStatus::default(),
            meta: RecordMeta::new(),
            data: Map::new(),
        }
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    pub fn remove_field(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn touch(&mut self) {
        self.meta.touch();
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Company code the row belongs to, when the record type carries one.
    pub fn company(&self) -> Option<&str> {
        self.str_field("company")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_type_roundtrip() {
        for rt in RecordType::ALL {
            let name = rt.to_string();
            assert_eq!(RecordType::from_str(&name).unwrap(), rt);
        }
    }

    #[test]
    fn test_record_type_unknown_is_error() {
        assert!(RecordType::from_str("Warehouse").is_err());
        assert!(RecordType::from_str("patient").is_err());
        assert!(RecordType::from_str("").is_err());
    }

    #[test]
    fn test_record_type_company_scope() {
        assert!(RecordType::Patient.is_company_scoped());
        assert!(RecordType::Attention.is_company_scoped());
        assert!(!RecordType::User.is_company_scoped());
        assert!(!RecordType::Company.is_company_scoped());
    }

    #[test]
    fn test_status_wire_values() {
        assert_eq!(
            serde_json::to_string(&RecordStatus::Active).unwrap(),
            "\"ACTIVO\""
        );
        assert_eq!(
            serde_json::to_string(&RecordStatus::Suspended).unwrap(),
            "\"SUSPENDIDO\""
        );
        assert_eq!(
            serde_json::to_string(&RecordStatus::Finished).unwrap(),
            "\"FINALIZADO\""
        );
        assert_eq!(
            serde_json::to_string(&RecordStatus::Inactive).unwrap(),
            "\"INACTIVO\""
        );
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            RecordStatus::from_str("FINALIZADO").unwrap(),
            RecordStatus::Finished
        );
        assert!(RecordStatus::from_str("finalizado").is_err());
        assert!(RecordStatus::from_str("DELETED").is_err());
    }

    #[test]
    fn test_status_terminality() {
        assert!(RecordStatus::Finished.is_terminal());
        assert!(RecordStatus::Inactive.is_terminal());
        assert!(!RecordStatus::Active.is_terminal());
        assert!(!RecordStatus::Suspended.is_terminal());
    }

    #[test]
    fn test_meta_touch_advances() {
        let mut meta = RecordMeta::new();
        let before = meta.last_updated.clone();
        std::thread::sleep(std::time::Duration::from_millis(1));
        meta.touch();
        assert!(meta.last_updated > before);
        assert!(meta.created_at <= meta.last_updated);
    }

    #[test]
    fn test_envelope_field_operations() {
        let mut env = RecordEnvelope::new("p-1".into(), RecordType::Patient);
        env.set_field("documentNumber", json!("44556677"));
        env.set_field("givenNames", json!("Rosa Elena"));

        assert_eq!(env.str_field("documentNumber"), Some("44556677"));
        assert_eq!(env.field("missing"), None);

        let removed = env.remove_field("givenNames");
        assert_eq!(removed, Some(json!("Rosa Elena")));
        assert!(env.field("givenNames").is_none());
    }

    #[test]
    fn test_envelope_serialization_flattens_data() {
        let mut env = RecordEnvelope::new("p-1".into(), RecordType::Patient);
        env.set_field("documentNumber", json!("44556677"));
        env.set_field("company", json!("SEDE01"));

        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["id"], "p-1");
        assert_eq!(json["recordType"], "Patient");
        assert_eq!(json["status"], "ACTIVO");
        assert_eq!(json["documentNumber"], "44556677");
        assert_eq!(json["company"], "SEDE01");
        assert!(json["meta"]["createdAt"].is_string());
        assert!(json["meta"]["lastUpdated"].is_string());
    }

    #[test]
    fn test_envelope_deserialization() {
        let json = json!({
            "id": "a-9",
            "recordType": "Attention",
            "status": "SUSPENDIDO",
            "meta": {
                "createdAt": "2024-03-15T09:30:00Z",
                "lastUpdated": "2024-03-16T10:00:00Z"
            },
            "patientId": "p-1",
            "reason": "control"
        });

        let env: RecordEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(env.id, "a-9");
        assert_eq!(env.record_type, RecordType::Attention);
        assert_eq!(env.status, RecordStatus::Suspended);
        assert_eq!(env.str_field("patientId"), Some("p-1"));
        assert_eq!(env.str_field("reason"), Some("control"));
    }

    #[test]
    fn test_envelope_company_accessor() {
        let mut env = RecordEnvelope::new("c-1".into(), RecordType::Contraceptive);
        assert_eq!(env.company(), None);
        env.set_field("company", json!("SEDE02"));
        assert_eq!(env.company(), Some("SEDE02"));
    }

    #[test]
    fn test_envelope_status_builder() {
        let env = RecordEnvelope::new("u-1".into(), RecordType::User)
            .with_status(RecordStatus::Inactive);
        assert!(!env.is_active());
        assert!(env.status.is_terminal());
    }
}
