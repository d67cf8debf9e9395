//! Data types used by the storage traits.

use dispensario_core::{PlainDate, RecordEnvelope};
use serde::{Deserialize, Serialize};

/// A typed filter over record fields.
///
/// Handlers translate query-string parameters into these; backends decide how
/// to evaluate them (the in-memory backend walks the field map, a relational
/// backend would compile them to WHERE clauses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldFilter {
    /// Exact string match (e.g. `patientId=p-1`, `status=ACTIVO`).
    Exact { field: String, value: String },
    /// Case-insensitive substring match (e.g. `q=rosa` over names).
    Contains { field: String, value: String },
    /// Case-insensitive prefix match.
    Prefix { field: String, value: String },
    /// Boolean field match.
    Boolean { field: String, value: bool },
    /// Inclusive calendar-date range over a `YYYY-MM-DD` field.
    DateRange {
        field: String,
        from: Option<PlainDate>,
        to: Option<PlainDate>,
    },
    /// The record's `company` field must be one of the given codes. An empty
    /// list matches nothing: a user whose scope is empty sees no rows.
    CompanyIn { companies: Vec<String> },
}

/// Parameters for a list/search query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListParams {
    /// All filters must match (AND semantics).
    #[serde(default)]
    pub filters: Vec<FieldFilter>,
    /// Maximum number of results to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Number of results to skip for pagination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Sort specification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortParam>,
    /// Include soft-removed (INACTIVO) records. Default: they are hidden;
    /// active, suspended and finished rows always list.
    #[serde(default)]
    pub include_inactive: bool,
}

impl ListParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn with_sort(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.sort = Some(SortParam::new(field, descending));
        self
    }

    #[must_use]
    pub fn with_inactive(mut self) -> Self {
        self.include_inactive = true;
        self
    }

    #[must_use]
    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty()
    }
}

/// A sort parameter for list results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortParam {
    pub field: String,
    pub descending: bool,
}

impl SortParam {
    #[must_use]
    pub fn new(field: impl Into<String>, descending: bool) -> Self {
        Self {
            field: field.into(),
            descending,
        }
    }

    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, false)
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, true)
    }
}

/// Result of a list/search operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    /// The matching records (one page).
    pub records: Vec<RecordEnvelope>,
    /// Total count of matching records before pagination.
    pub total: u64,
    /// Offset of the first returned record.
    pub offset: u32,
    /// Whether more results exist beyond this page.
    pub has_more: bool,
}

impl SearchResult {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_list_params_builder() {
        let params = ListParams::new()
            .with_filter(FieldFilter::Exact {
                field: "patientId".into(),
                value: "p-1".into(),
            })
            .with_filter(FieldFilter::Contains {
                field: "familyNames".into(),
                value: "var".into(),
            })
            .with_count(25)
            .with_offset(50)
            .with_sort("date", true);

        assert_eq!(params.filters.len(), 2);
        assert_eq!(params.count, Some(25));
        assert_eq!(params.offset, Some(50));
        assert!(params.sort.as_ref().unwrap().descending);
        assert!(!params.include_inactive);
    }

    #[test]
    fn test_sort_param_helpers() {
        assert!(!SortParam::asc("date").descending);
        assert!(SortParam::desc("date").descending);
    }

    #[test]
    fn test_date_range_filter_serde() {
        let filter = FieldFilter::DateRange {
            field: "date".into(),
            from: Some(PlainDate::from_str("2024-01-01").unwrap()),
            to: None,
        };
        let json = serde_json::to_string(&filter).unwrap();
        let back: FieldFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(filter, back);
    }

    #[test]
    fn test_search_result_empty() {
        let result = SearchResult::empty();
        assert!(result.is_empty());
        assert_eq!(result.total, 0);
        assert!(!result.has_more);
    }
}
