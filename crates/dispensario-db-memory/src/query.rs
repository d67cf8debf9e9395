use dispensario_core::{PlainDate, RecordEnvelope, RecordStatus, normalize_company_code};
use dispensario_storage::{FieldFilter, ListParams};
use serde_json::Value;
use std::str::FromStr;

/// Check whether a record matches all filters in the given parameters,
/// including the soft-removal gate.
pub fn matches(record: &RecordEnvelope, params: &ListParams) -> bool {
    if record.status == RecordStatus::Inactive && !params.include_inactive {
        return false;
    }
    params.filters.iter().all(|f| filter_matches(f, record))
}

/// Evaluate a single filter against a record.
pub fn filter_matches(filter: &FieldFilter, record: &RecordEnvelope) -> bool {
    match filter {
        FieldFilter::Exact { field, value } => match_exact(record, field, value),
        FieldFilter::Contains { field, value } => {
            match_string(record, field, value, |s, v| {
                s.to_lowercase().contains(&v.to_lowercase())
            })
        }
        FieldFilter::Prefix { field, value } => match_string(record, field, value, |s, v| {
            s.to_lowercase().starts_with(&v.to_lowercase())
        }),
        FieldFilter::Boolean { field, value } => match_boolean(record, field, *value),
        FieldFilter::DateRange { field, from, to } => {
            match_date_range(record, field, from.as_ref(), to.as_ref())
        }
        FieldFilter::CompanyIn { companies } => match_company(record, companies),
    }
}

fn match_exact(record: &RecordEnvelope, field: &str, value: &str) -> bool {
    // Header fields first, then the row data
    match field {
        "id" => record.id == value,
        "status" => record.status.as_str() == value,
        "recordType" => record.record_type.to_string() == value,
        _ => match record.field(field) {
            Some(Value::String(s)) => s == value,
            Some(Value::Number(n)) => n.to_string() == value,
            Some(Value::Bool(b)) => b.to_string() == value,
            _ => false,
        },
    }
}

fn match_string<F>(record: &RecordEnvelope, field: &str, value: &str, matcher: F) -> bool
where
    F: Fn(&str, &str) -> bool + Copy,
{
    match record.field(field) {
        Some(field_value) => search_value(field_value, value, matcher),
        None => false,
    }
}

/// Recursively search string content inside arrays and objects.
fn search_value<F>(value: &Value, term: &str, matcher: F) -> bool
where
    F: Fn(&str, &str) -> bool + Copy,
{
    match value {
        Value::String(s) => matcher(s, term),
        Value::Array(arr) => arr.iter().any(|v| search_value(v, term, matcher)),
        Value::Object(obj) => obj.values().any(|v| search_value(v, term, matcher)),
        _ => false,
    }
}

fn match_boolean(record: &RecordEnvelope, field: &str, value: bool) -> bool {
    match record.field(field) {
        Some(Value::Bool(b)) => *b == value,
        Some(Value::String(s)) => match s.to_lowercase().as_str() {
            "true" => value,
            "false" => !value,
            _ => false,
        },
        _ => false,
    }
}

fn match_date_range(
    record: &RecordEnvelope,
    field: &str,
    from: Option<&PlainDate>,
    to: Option<&PlainDate>,
) -> bool {
    let date = match record.str_field(field).map(PlainDate::from_str) {
        Some(Ok(date)) => date,
        _ => return false,
    };

    if let Some(from) = from
        && date < *from
    {
        return false;
    }

    if let Some(to) = to
        && date > *to
    {
        return false;
    }

    true
}

fn match_company(record: &RecordEnvelope, companies: &[String]) -> bool {
    // An empty scope sees nothing
    if companies.is_empty() {
        return false;
    }
    match record.company() {
        Some(code) => {
            let code = normalize_company_code(code);
            companies.iter().any(|c| normalize_company_code(c) == code)
        }
        // Rows without a company are shared across scopes
        None => true,
    }
}

/// Sort records in place by a header or data field.
pub fn sort_records(records: &mut [RecordEnvelope], field: &str, descending: bool) {
    records.sort_by(|a, b| {
        let ordering = match field {
            "id" => a.id.cmp(&b.id),
            "lastUpdated" => a.meta.last_updated.cmp(&b.meta.last_updated),
            "createdAt" => a.meta.created_at.cmp(&b.meta.created_at),
            "status" => a.status.as_str().cmp(b.status.as_str()),
            _ => compare_fields(a.field(field), b.field(field)),
        };
        if descending { ordering.reverse() } else { ordering }
    });
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(std::cmp::Ordering::Equal),
        (a, b) => {
            let a = a.and_then(|v| v.as_str()).unwrap_or("");
            let b = b.and_then(|v| v.as_str()).unwrap_or("");
            a.cmp(b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispensario_core::RecordType;
    use serde_json::json;

    fn patient(id: &str, family: &str, company: &str) -> RecordEnvelope {
        let mut r = RecordEnvelope::new(id.to_string(), RecordType::Patient);
        r.set_field("documentNumber", json!("10203040"));
        r.set_field("familyNames", json!(family));
        r.set_field("birthDate", json!("1988-05-20"));
        r.set_field("company", json!(company));
        r
    }

    #[test]
    fn test_exact_on_header_and_data_fields() {
        let r = patient("p-1", "Vargas", "SEDE01");

        assert!(filter_matches(
            &FieldFilter::Exact {
                field: "id".into(),
                value: "p-1".into()
            },
            &r
        ));
        assert!(filter_matches(
            &FieldFilter::Exact {
                field: "status".into(),
                value: "ACTIVO".into()
            },
            &r
        ));
        assert!(filter_matches(
            &FieldFilter::Exact {
                field: "documentNumber".into(),
                value: "10203040".into()
            },
            &r
        ));
        assert!(!filter_matches(
            &FieldFilter::Exact {
                field: "documentNumber".into(),
                value: "999".into()
            },
            &r
        ));
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let r = patient("p-1", "Vargas Llosa", "SEDE01");
        assert!(filter_matches(
            &FieldFilter::Contains {
                field: "familyNames".into(),
                value: "llosa".into()
            },
            &r
        ));
        assert!(!filter_matches(
            &FieldFilter::Contains {
                field: "familyNames".into(),
                value: "quispe".into()
            },
            &r
        ));
    }

    #[test]
    fn test_prefix_filter() {
        let r = patient("p-1", "Vargas", "SEDE01");
        assert!(filter_matches(
            &FieldFilter::Prefix {
                field: "familyNames".into(),
                value: "var".into()
            },
            &r
        ));
        assert!(!filter_matches(
            &FieldFilter::Prefix {
                field: "familyNames".into(),
                value: "argas".into()
            },
            &r
        ));
    }

    #[test]
    fn test_boolean_filter_accepts_string_forms() {
        let mut r = patient("p-1", "Vargas", "SEDE01");
        r.set_field("insured", json!(true));
        assert!(filter_matches(
            &FieldFilter::Boolean {
                field: "insured".into(),
                value: true
            },
            &r
        ));

        r.set_field("insured", json!("false"));
        assert!(filter_matches(
            &FieldFilter::Boolean {
                field: "insured".into(),
                value: false
            },
            &r
        ));
    }

    #[test]
    fn test_date_range_filter() {
        let r = patient("p-1", "Vargas", "SEDE01");
        let filter = FieldFilter::DateRange {
            field: "birthDate".into(),
            from: Some("1988-01-01".parse().unwrap()),
            to: Some("1988-12-31".parse().unwrap()),
        };
        assert!(filter_matches(&filter, &r));

        let filter = FieldFilter::DateRange {
            field: "birthDate".into(),
            from: Some("1989-01-01".parse().unwrap()),
            to: None,
        };
        assert!(!filter_matches(&filter, &r));

        // Missing or malformed field never matches
        let filter = FieldFilter::DateRange {
            field: "missing".into(),
            from: None,
            to: None,
        };
        assert!(!filter_matches(&filter, &r));
    }

    #[test]
    fn test_company_scope_filter() {
        let r = patient("p-1", "Vargas", "sede01");

        assert!(filter_matches(
            &FieldFilter::CompanyIn {
                companies: vec!["SEDE01".into(), "SEDE02".into()]
            },
            &r
        ));
        assert!(!filter_matches(
            &FieldFilter::CompanyIn {
                companies: vec!["SEDE03".into()]
            },
            &r
        ));
        // Empty scope sees nothing
        assert!(!filter_matches(&FieldFilter::CompanyIn { companies: vec![] }, &r));
    }

    #[test]
    fn test_company_scope_shares_unowned_rows() {
        let mut r = patient("p-1", "Vargas", "SEDE01");
        r.remove_field("company");
        assert!(filter_matches(
            &FieldFilter::CompanyIn {
                companies: vec!["SEDE03".into()]
            },
            &r
        ));
    }

    #[test]
    fn test_matches_hides_inactive_by_default() {
        let r = patient("p-1", "Vargas", "SEDE01")
            .with_status(dispensario_core::RecordStatus::Inactive);
        assert!(!matches(&r, &ListParams::new()));
        assert!(matches(&r, &ListParams::new().with_inactive()));
    }

    #[test]
    fn test_matches_requires_all_filters() {
        let r = patient("p-1", "Vargas", "SEDE01");
        let params = ListParams::new()
            .with_filter(FieldFilter::Exact {
                field: "id".into(),
                value: "p-1".into(),
            })
            .with_filter(FieldFilter::Contains {
                field: "familyNames".into(),
                value: "nope".into(),
            });
        assert!(!matches(&r, &params));
    }

    #[test]
    fn test_sort_records_by_data_field() {
        let mut records = vec![
            patient("p-2", "Zapata", "SEDE01"),
            patient("p-1", "Alvarez", "SEDE01"),
        ];
        sort_records(&mut records, "familyNames", false);
        assert_eq!(records[0].str_field("familyNames"), Some("Alvarez"));

        sort_records(&mut records, "familyNames", true);
        assert_eq!(records[0].str_field("familyNames"), Some("Zapata"));
    }

    #[test]
    fn test_sort_records_numeric() {
        let mut a = patient("p-1", "A", "SEDE01");
        a.set_field("weightKg", json!(80.5));
        let mut b = patient("p-2", "B", "SEDE01");
        b.set_field("weightKg", json!(9.3));

        let mut records = vec![a, b];
        sort_records(&mut records, "weightKg", false);
        assert_eq!(records[0].id, "p-2");
    }
}
