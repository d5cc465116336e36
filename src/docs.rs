use crate::service::attendance::AttendancePage;
use crate::table::columns::{ColumnDescription, DisplayRow, RowFlags};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Board API",
        version = "1.0.0",
        description = r#"
## Attendance Board

Server-side data for the attendance table of the administrative dashboard.

### 🔹 Features
- **Attendance table**
  - Check-in/out dates and times, work hours, overtime, lateness, early-out and locations
  - Date range filter, free-text search, ordering and pagination
- **Role scoping**
  - Staff and admin callers only see their own records

### 🔐 Security
Endpoints are protected using **JWT Bearer authentication**.

### 📦 Response Format
- `X-Requested-With: XMLHttpRequest` returns `{draw, recordsTotal, recordsFiltered, data}`
- Plain page loads return the HTML table shell

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::attendance_index,
        crate::api::attendance::attendance_columns
    ),
    components(
        schemas(
            AttendancePage,
            DisplayRow,
            RowFlags,
            ColumnDescription
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance table APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
