//! CSV writers for administrative reports.
//!
//! The export the administration downloads is one row per attention or
//! activity, ordered by date and then patient so consecutive rows of the same
//! day/patient group together.

use serde_json::Value;

use crate::error::ReportError;

/// CSV output configuration.
#[derive(Debug, Clone)]
pub struct CsvWriter {
    /// Whether to include a header row.
    pub include_header: bool,
    /// Field delimiter (default: comma).
    pub delimiter: u8,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self {
            include_header: true,
            delimiter: b',',
        }
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn build<W: std::io::Write>(&self, output: W) -> csv::Writer<W> {
        csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(output)
    }
}

/// Convert a JSON value to a CSV-appropriate cell.
pub fn json_value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // Arrays join with semicolons so a cell stays a single column
        Value::Array(arr) => arr
            .iter()
            .map(json_value_to_cell)
            .collect::<Vec<_>>()
            .join(";"),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// One row of the attentions report.
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionReportRow {
    pub date: String,
    pub patient_document: String,
    pub patient_name: String,
    pub company: String,
    pub attending: String,
    pub status: String,
    pub diagnoses: Vec<String>,
}

const ATTENTION_HEADER: [&str; 7] = [
    "date",
    "document",
    "patient",
    "company",
    "attending",
    "status",
    "diagnoses",
];

/// Render the attentions report. Rows are sorted by date, then patient
/// document, so the export groups by day and patient.
pub fn attention_report_csv(
    writer: &CsvWriter,
    mut rows: Vec<AttentionReportRow>,
) -> Result<String, ReportError> {
    rows.sort_by(|a, b| {
        (a.date.as_str(), a.patient_document.as_str())
            .cmp(&(b.date.as_str(), b.patient_document.as_str()))
    });

    let mut out = writer.build(Vec::new());
    if writer.include_header {
        out.write_record(ATTENTION_HEADER)?;
    }
    for row in rows {
        out.write_record([
            row.date.as_str(),
            row.patient_document.as_str(),
            row.patient_name.as_str(),
            row.company.as_str(),
            row.attending.as_str(),
            row.status.as_str(),
            row.diagnoses.join(";").as_str(),
        ])?;
    }
    finish(out)
}

/// One row of the activities report.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityReportRow {
    pub date: String,
    pub activity_type: String,
    pub description: String,
    pub responsible: String,
    pub company: String,
}

const ACTIVITY_HEADER: [&str; 5] = ["date", "type", "description", "responsible", "company"];

/// Render the activities report, ordered by date.
pub fn activity_report_csv(
    writer: &CsvWriter,
    mut rows: Vec<ActivityReportRow>,
) -> Result<String, ReportError> {
    rows.sort_by(|a, b| a.date.cmp(&b.date));

    let mut out = writer.build(Vec::new());
    if writer.include_header {
        out.write_record(ACTIVITY_HEADER)?;
    }
    for row in rows {
        out.write_record([
            row.date.as_str(),
            row.activity_type.as_str(),
            row.description.as_str(),
            row.responsible.as_str(),
            row.company.as_str(),
        ])?;
    }
    finish(out)
}

fn finish(out: csv::Writer<Vec<u8>>) -> Result<String, ReportError> {
    let bytes = out
        .into_inner()
        .map_err(|e| ReportError::render(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReportError::render(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(date: &str, document: &str) -> AttentionReportRow {
        AttentionReportRow {
            date: date.into(),
            patient_document: document.into(),
            patient_name: "Rosa Vargas".into(),
            company: "SEDE01".into(),
            attending: "Dra. Salas".into(),
            status: "FINALIZADO".into(),
            diagnoses: vec!["J02.9".into(), "R50.9".into()],
        }
    }

    #[test]
    fn attention_rows_group_by_date_then_patient() {
        let rows = vec![
            row("2024-03-16", "222"),
            row("2024-03-15", "333"),
            row("2024-03-15", "111"),
        ];
        let csv = attention_report_csv(&CsvWriter::new(), rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert!(lines[0].starts_with("date,document"));
        assert!(lines[1].starts_with("2024-03-15,111"));
        assert!(lines[2].starts_with("2024-03-15,333"));
        assert!(lines[3].starts_with("2024-03-16,222"));
    }

    #[test]
    fn diagnoses_join_in_one_cell() {
        let csv = attention_report_csv(&CsvWriter::new(), vec![row("2024-03-15", "111")]).unwrap();
        assert!(csv.contains("J02.9;R50.9"));
    }

    #[test]
    fn header_can_be_suppressed() {
        let csv = attention_report_csv(
            &CsvWriter::new().with_header(false),
            vec![row("2024-03-15", "111")],
        )
        .unwrap();
        assert!(!csv.contains("date,document"));
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn values_with_commas_are_quoted() {
        let mut r = row("2024-03-15", "111");
        r.patient_name = "Vargas, Rosa".into();
        let csv = attention_report_csv(&CsvWriter::new(), vec![r]).unwrap();
        assert!(csv.contains("\"Vargas, Rosa\""));
    }

    #[test]
    fn custom_delimiter() {
        let csv = attention_report_csv(
            &CsvWriter::new().with_delimiter(b';'),
            vec![row("2024-03-15", "111")],
        )
        .unwrap();
        assert!(csv.lines().next().unwrap().contains("date;document"));
    }

    #[test]
    fn activity_rows_order_by_date() {
        let rows = vec![
            ActivityReportRow {
                date: "2024-05-02".into(),
                activity_type: "CAMPANA".into(),
                description: "vacunación".into(),
                responsible: "Lic. Ramos".into(),
                company: "SEDE01".into(),
            },
            ActivityReportRow {
                date: "2024-05-01".into(),
                activity_type: "CHARLA".into(),
                description: "nutrición".into(),
                responsible: "Lic. Ramos".into(),
                company: "SEDE01".into(),
            },
        ];
        let csv = activity_report_csv(&CsvWriter::new(), rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[1].starts_with("2024-05-01"));
        assert!(lines[2].starts_with("2024-05-02"));
    }

    #[test]
    fn json_cell_conversion() {
        assert_eq!(json_value_to_cell(&Value::Null), "");
        assert_eq!(json_value_to_cell(&json!(true)), "true");
        assert_eq!(json_value_to_cell(&json!(37.5)), "37.5");
        assert_eq!(json_value_to_cell(&json!("texto")), "texto");
        assert_eq!(json_value_to_cell(&json!(["a", "b"])), "a;b");
        assert_eq!(json_value_to_cell(&json!({"k": 1})), "{\"k\":1}");
    }
}
