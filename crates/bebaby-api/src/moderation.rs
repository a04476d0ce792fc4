use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use bebaby_types::api::{
    DeleteReportRequest, ManageReportRequest, ManageReportResponse, ModerateContentRequest,
    ModerateContentResponse, StatusFilter,
};
use bebaby_types::models::{ContentType, ReportStatus, UserStatus};
use bebaby_types::moderation::{ContentAction, ReportAction};

use crate::error::ApiError;
use crate::extract::{AdminGuard, ApiJson};
use crate::state::{AppState, run_db};
use crate::validate;

const LIST_LIMIT: u32 = 200;

/// PUT /admin/manage-report
///
/// The action is parsed before anything touches storage, so an unknown
/// action is a 400 with no side effects.
pub async fn manage_report(
    State(state): State<AppState>,
    admin: AdminGuard,
    ApiJson(req): ApiJson<ManageReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report_id = validate::required("reportId", &req.report_id)?.to_string();
    let action: ReportAction = req
        .action
        .parse()
        .map_err(|_| ApiError::validation("Invalid action"))?;
    let notes = req.admin_notes;
    let admin_id = admin.admin_id();

    let (report, user_status) = run_db(&state, move |db| {
        db.apply_report_action(&report_id, action, notes.as_deref(), admin_id)
    })
    .await?;

    // A banned or removed admin loses their live sessions too.
    if matches!(user_status, Some(UserStatus::Banned | UserStatus::Inactive)) {
        state.sessions.revoke_admin(report.reported_id);
    }

    info!(
        admin_id = %admin_id,
        report_id = %report.id,
        action = action.as_str(),
        "report managed"
    );
    Ok(Json(ManageReportResponse {
        report,
        user_status,
    }))
}

/// DELETE /admin/manage-report. Purges the report row only.
pub async fn delete_report(
    State(state): State<AppState>,
    admin: AdminGuard,
    ApiJson(req): ApiJson<DeleteReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report_id = validate::required("reportId", &req.report_id)?.to_string();
    let id = report_id.clone();
    run_db(&state, move |db| db.delete_report(&id)).await?;

    info!(admin_id = %admin.admin_id(), report_id = %report_id, "report deleted");
    Ok(Json(json!({ "success": true })))
}

/// PUT /admin/moderate-content
pub async fn moderate_content(
    State(state): State<AppState>,
    admin: AdminGuard,
    ApiJson(req): ApiJson<ModerateContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content_id = validate::required("contentId", &req.content_id)?.to_string();
    let content_type: ContentType = req
        .content_type
        .parse()
        .map_err(|_| ApiError::validation("Invalid content type"))?;
    let action: ContentAction = req
        .action
        .parse()
        .map_err(|_| ApiError::validation("Invalid action"))?;
    let admin_id = admin.admin_id();

    let content = run_db(&state, move |db| {
        db.moderate_content(content_type, &content_id, action, admin_id)
    })
    .await?;

    Ok(Json(ModerateContentResponse { content }))
}

pub async fn list_reports(
    State(state): State<AppState>,
    _admin: AdminGuard,
    Query(filter): Query<StatusFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<ReportStatus>)
        .transpose()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let reports = run_db(&state, move |db| db.list_reports(status, LIST_LIMIT)).await?;
    Ok(Json(reports))
}

pub async fn pending_content(
    State(state): State<AppState>,
    _admin: AdminGuard,
) -> Result<impl IntoResponse, ApiError> {
    let items = run_db(&state, |db| db.list_pending_content(LIST_LIMIT)).await?;
    Ok(Json(items))
}
