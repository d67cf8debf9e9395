//! Administrative report downloads (CSV).

use axum::{
    Extension,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};

use dispensario_api::{ApiError, ListQuery};
use dispensario_auth::AuthContext;
use dispensario_core::RecordType;
use dispensario_storage::{FieldFilter, ListParams, RecordStorage};
use dispensario_reports::{
    ActivityReportRow, AttentionReportRow, CsvWriter, activity_report_csv, attention_report_csv,
};

use crate::routes::attentions::{children_of, parse_date_param, patient_identity, read_patient_lenient};
use crate::routes::{scope_filter, user_display_name};
use crate::state::AppState;

fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

fn report_params(ctx: &AuthContext, query: &ListQuery, date_field: &str) -> Result<ListParams, ApiError> {
    let mut params = ListParams::new().with_filter(scope_filter(ctx));
    if query.from.is_some() || query.to.is_some() {
        params = params.with_filter(FieldFilter::DateRange {
            field: date_field.into(),
            from: parse_date_param(query.from.as_deref())?,
            to: parse_date_param(query.to.as_deref())?,
        });
    }
    Ok(params)
}

/// One row per attention in range, with patient identity and diagnosis codes.
pub async fn attentions(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let params = report_params(&ctx, &query, "date")?;
    let result = state.storage.search(RecordType::Attention, &params).await?;

    let mut rows = Vec::with_capacity(result.len());
    for attention in &result.records {
        let patient = read_patient_lenient(&state, attention.str_field("patientId")).await;
        let (patient_name, patient_document, _) = patient_identity(patient.as_ref());

        let diagnoses = state
            .storage
            .search(RecordType::Diagnosis, &children_of("attentionId", &attention.id))
            .await?
            .records
            .iter()
            .filter_map(|d| d.str_field("cie10Code").map(str::to_string))
            .collect();

        rows.push(AttentionReportRow {
            date: attention.str_field("date").unwrap_or_default().to_string(),
            patient_document,
            patient_name,
            company: attention.company().unwrap_or_default().to_string(),
            attending: user_display_name(
                &state,
                attention.str_field("attendingId").unwrap_or_default(),
            )
            .await,
            status: attention.status.to_string(),
            diagnoses,
        });
    }

    let csv = attention_report_csv(&CsvWriter::new(), rows)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    tracing::info!(rows = result.len(), "attentions report generated");
    Ok(csv_response("attentions-report.csv", csv))
}

/// One row per activity in range.
pub async fn activities(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let params = report_params(&ctx, &query, "date")?;
    let result = state.storage.search(RecordType::Activity, &params).await?;

    let mut rows = Vec::with_capacity(result.len());
    for activity in &result.records {
        rows.push(ActivityReportRow {
            date: activity.str_field("date").unwrap_or_default().to_string(),
            activity_type: activity
                .str_field("activityType")
                .unwrap_or_default()
                .to_string(),
            description: activity
                .str_field("description")
                .unwrap_or_default()
                .to_string(),
            responsible: user_display_name(
                &state,
                activity.str_field("responsibleId").unwrap_or_default(),
            )
            .await,
            company: activity.company().unwrap_or_default().to_string(),
        });
    }

    let csv = activity_report_csv(&CsvWriter::new(), rows)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(csv_response("activities-report.csv", csv))
}
