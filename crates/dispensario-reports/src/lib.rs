//! Report output for the dispensary server: CSV exports the administration
//! downloads and printable HTML documents (certificate, prescription sheet).

pub mod csv;
pub mod error;
pub mod html;

pub use crate::csv::{
    ActivityReportRow, AttentionReportRow, CsvWriter, activity_report_csv, attention_report_csv,
    json_value_to_cell,
};
pub use error::ReportError;
pub use html::{
    MedicalCertificate, PrescriptionItem, PrescriptionSheet, escape_html,
};
