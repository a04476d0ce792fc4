use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use bebaby_types::api::CreateReportRequest;

use crate::error::ApiError;
use crate::extract::{ActiveUser, ApiJson};
use crate::state::{AppState, run_db};
use crate::validate;

const MAX_REASON_LEN: usize = 2000;

/// POST /reports
pub async fn create_report(
    State(state): State<AppState>,
    user: ActiveUser,
    ApiJson(req): ApiJson<CreateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let reported_id = validate::required("reportedId", &req.reported_id)?.to_string();
    let reason = validate::max_len("reason", &req.reason, MAX_REASON_LEN)?.to_string();
    if reported_id == user.id().to_string() {
        return Err(ApiError::validation("Cannot report yourself"));
    }

    let reporter = user.id();
    let report = run_db(&state, move |db| db.create_report(reporter, &reported_id, &reason)).await?;

    info!(report_id = %report.id, reporter_id = %reporter, "report filed");
    Ok((StatusCode::CREATED, Json(report)))
}
