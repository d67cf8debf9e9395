//! Printable HTML documents.
//!
//! Server-rendered replacements for the documents the front desk prints:
//! the medical certificate and the prescription sheet. Plain HTML with a
//! print stylesheet; the browser print dialog does the rest.

use std::fmt::Write as _;

/// Shared stylesheet for printable documents.
const SHARED_STYLES: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: "Helvetica Neue", Arial, sans-serif;
    color: #1a1a1a;
    line-height: 1.5;
    padding: 2.5rem 3rem;
}

header {
    border-bottom: 2px solid #1a1a1a;
    padding-bottom: 0.75rem;
    margin-bottom: 1.5rem;
}

header h1 {
    font-size: 1.25rem;
    text-transform: uppercase;
    letter-spacing: 0.06em;
}

header .issuer {
    font-size: 0.85rem;
    color: #444;
}

dl.identity {
    display: grid;
    grid-template-columns: 12rem 1fr;
    row-gap: 0.25rem;
    margin-bottom: 1.5rem;
}

dl.identity dt {
    font-weight: 600;
}

table {
    width: 100%;
    border-collapse: collapse;
    margin-bottom: 1.5rem;
}

th, td {
    border: 1px solid #888;
    padding: 0.4rem 0.6rem;
    text-align: left;
    font-size: 0.9rem;
}

th {
    background: #f0f0f0;
}

.signature {
    margin-top: 4rem;
    width: 18rem;
    border-top: 1px solid #1a1a1a;
    text-align: center;
    font-size: 0.85rem;
}

@media print {
    body { padding: 1rem 1.5rem; }
}
"#;

/// Escape text interpolated into HTML.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{SHARED_STYLES}</style>\n</head>\n\
         <body>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

/// Data for the printable medical certificate.
#[derive(Debug, Clone)]
pub struct MedicalCertificate {
    pub patient_name: String,
    pub patient_document: String,
    pub patient_age: Option<u32>,
    pub attention_date: String,
    pub diagnoses: Vec<String>,
    pub rest_days: Option<u32>,
    pub attending: String,
    pub company: String,
}

impl MedicalCertificate {
    pub fn render(&self) -> String {
        let mut body = String::new();
        let _ = write!(
            body,
            "<header><h1>Certificado médico</h1>\
             <p class=\"issuer\">{}</p></header>",
            escape_html(&self.company)
        );

        let _ = write!(
            body,
            "<dl class=\"identity\">\
             <dt>Paciente</dt><dd>{}</dd>\
             <dt>Documento</dt><dd>{}</dd>",
            escape_html(&self.patient_name),
            escape_html(&self.patient_document),
        );
        if let Some(age) = self.patient_age {
            let _ = write!(body, "<dt>Edad</dt><dd>{age}</dd>");
        }
        let _ = write!(
            body,
            "<dt>Fecha de atención</dt><dd>{}</dd></dl>",
            escape_html(&self.attention_date)
        );

        body.push_str("<table><thead><tr><th>Diagnóstico</th></tr></thead><tbody>");
        for dx in &self.diagnoses {
            let _ = write!(body, "<tr><td>{}</td></tr>", escape_html(dx));
        }
        body.push_str("</tbody></table>");

        if let Some(days) = self.rest_days {
            let _ = write!(
                body,
                "<p>Se indica descanso médico por <strong>{days}</strong> día(s).</p>"
            );
        }

        let _ = write!(
            body,
            "<div class=\"signature\">{}</div>",
            escape_html(&self.attending)
        );

        page("Certificado médico", &body)
    }
}

/// A prescribed medication line.
#[derive(Debug, Clone)]
pub struct PrescriptionItem {
    pub medication: String,
    pub dose: String,
    pub frequency: String,
    pub duration: String,
}

/// Data for the printable prescription sheet.
#[derive(Debug, Clone)]
pub struct PrescriptionSheet {
    pub patient_name: String,
    pub patient_document: String,
    pub date: String,
    /// Warehouse the pharmacy dispenses from, derived from the company branch.
    pub warehouse_code: String,
    pub items: Vec<PrescriptionItem>,
    pub attending: String,
    pub company: String,
}

impl PrescriptionSheet {
    pub fn render(&self) -> String {
        let mut body = String::new();
        let _ = write!(
            body,
            "<header><h1>Receta médica</h1>\
             <p class=\"issuer\">{} — almacén {}</p></header>",
            escape_html(&self.company),
            escape_html(&self.warehouse_code),
        );

        let _ = write!(
            body,
            "<dl class=\"identity\">\
             <dt>Paciente</dt><dd>{}</dd>\
             <dt>Documento</dt><dd>{}</dd>\
             <dt>Fecha</dt><dd>{}</dd></dl>",
            escape_html(&self.patient_name),
            escape_html(&self.patient_document),
            escape_html(&self.date),
        );

        body.push_str(
            "<table><thead><tr><th>Medicamento</th><th>Dosis</th>\
             <th>Frecuencia</th><th>Duración</th></tr></thead><tbody>",
        );
        for item in &self.items {
            let _ = write!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&item.medication),
                escape_html(&item.dose),
                escape_html(&item.frequency),
                escape_html(&item.duration),
            );
        }
        body.push_str("</tbody></table>");

        let _ = write!(
            body,
            "<div class=\"signature\">{}</div>",
            escape_html(&self.attending)
        );

        page("Receta médica", &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn certificate() -> MedicalCertificate {
        MedicalCertificate {
            patient_name: "Rosa Vargas".into(),
            patient_document: "44556677".into(),
            patient_age: Some(35),
            attention_date: "2024-03-15".into(),
            diagnoses: vec!["J02.9 Faringitis aguda".into()],
            rest_days: Some(2),
            attending: "Dra. Salas".into(),
            company: "SEDE01".into(),
        }
    }

    #[test]
    fn certificate_contains_identity_and_diagnoses() {
        let html = certificate().render();
        assert!(html.contains("Certificado médico"));
        assert!(html.contains("Rosa Vargas"));
        assert!(html.contains("44556677"));
        assert!(html.contains("J02.9 Faringitis aguda"));
        assert!(html.contains("<strong>2</strong>"));
        assert!(html.contains("Dra. Salas"));
    }

    #[test]
    fn certificate_omits_optional_sections() {
        let mut cert = certificate();
        cert.patient_age = None;
        cert.rest_days = None;
        let html = cert.render();
        assert!(!html.contains("Edad"));
        assert!(!html.contains("descanso médico"));
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let mut cert = certificate();
        cert.patient_name = "<script>alert(1)</script>".into();
        let html = cert.render();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn prescription_sheet_lists_items_and_warehouse() {
        let sheet = PrescriptionSheet {
            patient_name: "Rosa Vargas".into(),
            patient_document: "44556677".into(),
            date: "2024-03-15".into(),
            warehouse_code: "ALM-SUC01".into(),
            items: vec![
                PrescriptionItem {
                    medication: "Paracetamol 500mg".into(),
                    dose: "1 tableta".into(),
                    frequency: "cada 8 horas".into(),
                    duration: "3 días".into(),
                },
                PrescriptionItem {
                    medication: "Ibuprofeno 400mg".into(),
                    dose: "1 tableta".into(),
                    frequency: "cada 12 horas".into(),
                    duration: "5 días".into(),
                },
            ],
            attending: "Dra. Salas".into(),
            company: "SEDE01".into(),
        };
        let html = sheet.render();
        assert!(html.contains("Receta médica"));
        assert!(html.contains("ALM-SUC01"));
        assert!(html.contains("Paracetamol 500mg"));
        assert!(html.contains("Ibuprofeno 400mg"));
        assert_eq!(html.matches("<tr><td>").count(), 2);
    }

    #[test]
    fn escape_html_covers_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
        assert_eq!(escape_html("sin cambios"), "sin cambios");
    }
}
