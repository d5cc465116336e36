use crate::auth::auth::Caller;
use crate::error::AppError;
use crate::service::attendance::AttendanceQueryService;
use crate::table::columns::ColumnDescription;
use crate::table::request::{TableQueryDoc, TableRequest};
use crate::table::shell;
use actix_web::{HttpRequest, HttpResponse, http::header::ContentType, web};
use tracing::Instrument;
use uuid::Uuid;

/// Data requests from the table client are sent as XHR.
fn is_data_request(req: &HttpRequest) -> bool {
    req.headers()
        .get("X-Requested-With")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
}

/// Attendance table endpoint
///
/// XHR requests get a JSON page of rows; plain page loads get the table shell.
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(
        TableQueryDoc,
        ("X-Requested-With" = Option<String>, Header, description = "`XMLHttpRequest` selects the JSON data mode")
    ),
    responses(
        (status = 200, description = "JSON page (data mode) or HTML page shell", body = crate::service::attendance::AttendancePage),
        (status = 400, description = "Invalid date, date range or table parameters", body = Object, example = json!({
            "error": { "code": "INVALID_RANGE", "message": "dateFrom 2024-02-01 is after dateTo 2024-01-01" }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Inconsistent attendance data", body = Object, example = json!({
            "error": { "code": "DATA_INTEGRITY", "message": "Attendance 3 has inconsistent related data: worker 7 has no shift" }
        })),
        (status = 503, description = "Record store unavailable")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_index(
    req: HttpRequest,
    caller: Caller,
    service: web::Data<AttendanceQueryService>,
    query: web::Query<Vec<(String, String)>>,
) -> Result<HttpResponse, AppError> {
    if !is_data_request(&req) {
        let html = shell::render_page(req.path()).map_err(|e| {
            tracing::error!(error = ?e, "Failed to render attendance page");
            e
        })?;
        return Ok(HttpResponse::Ok()
            .content_type(ContentType::html())
            .body(html));
    }

    let request = TableRequest::from_pairs(query.into_inner())?;
    let span = tracing::info_span!("attendance_list", request_id = %Uuid::new_v4(), caller_id = caller.id);

    async move {
        let page = service.list_attendance(&caller, &request).await.map_err(|e| {
            match &e {
                AppError::StoreUnavailable(cause) => {
                    tracing::error!(error = %cause, "Attendance store query failed")
                }
                AppError::DataIntegrity { .. } => tracing::error!(error = %e, "Attendance data integrity"),
                _ => tracing::debug!(error = %e, "Attendance request rejected"),
            }
            e
        })?;

        Ok::<_, AppError>(HttpResponse::Ok().json(page))
    }
    .instrument(span)
    .await
}

/// Column metadata for the attendance table
#[utoipa::path(
    get,
    path = "/api/attendance/columns",
    responses(
        (status = 200, description = "Static column definitions", body = Vec<ColumnDescription>),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn attendance_columns(_caller: Caller) -> HttpResponse {
    let columns: Vec<ColumnDescription> = AttendanceQueryService::describe_columns()
        .iter()
        .map(ColumnDescription::from)
        .collect();

    HttpResponse::Ok().json(columns)
}
