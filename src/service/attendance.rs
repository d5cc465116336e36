use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::auth::auth::Caller;
use crate::config::Config;
use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, AttendanceWithRelations};
use crate::model::role::Role;
use crate::model::shift::Shift;
use crate::model::user::User;
use crate::store::{AttendanceQuery, AttendanceStore, DateRange, RowScope, SortKey};
use crate::table::columns::{COLUMNS, ColumnDef, DEFAULT_ORDER, DisplayRow, column, format_row};
use crate::table::request::{SortDirection, TableRequest};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "draw": 1,
    "recordsTotal": 2,
    "recordsFiltered": 1,
    "data": [{
        "id": 11,
        "DT_RowIndex": 1,
        "name": "<span style=\"color: #1e90ff\" class=\"badge badge-secondary\">Alice</span>",
        "date": "2024-01-01",
        "in_time": "08:10:00",
        "date_out": "2024-01-01",
        "out_time": "17:00:00",
        "work_hour": "08:50:00",
        "over_time": "00:00:00",
        "late_time": "<span style=\"color: red\"><b>00:10:00</b></span>",
        "early_out_time": "00:00:00",
        "in_location_id": "Head Office",
        "out_location_id": "",
        "flags": {
            "worker_id": 3,
            "worker_name": "Alice",
            "shift_color": "#1e90ff",
            "is_late": true,
            "is_overtime": false,
            "is_early_out": false,
            "in_location": "Head Office",
            "out_location": null
        }
    }]
}))]
pub struct AttendancePage {
    pub draw: u64,
    /// Rows after scope and date filters
    pub records_total: u64,
    /// Rows after search as well
    pub records_filtered: u64,
    pub data: Vec<DisplayRow>,
}

/// Lists attendance rows for the dashboard table.
///
/// Stateless: every call reads from the store and formats the page. The
/// caller is always passed in, never looked up.
pub struct AttendanceQueryService {
    store: Arc<dyn AttendanceStore>,
    self_scoped_roles: Vec<Role>,
    validate_date_range: bool,
    max_page_length: u64,
}

impl AttendanceQueryService {
    pub fn new(store: Arc<dyn AttendanceStore>, config: &Config) -> Self {
        Self {
            store,
            self_scoped_roles: config.self_scoped_roles.clone(),
            validate_date_range: config.validate_date_range,
            max_page_length: config.max_page_length,
        }
    }

    /// Static column metadata; does not depend on any request.
    pub fn describe_columns() -> &'static [ColumnDef] {
        &COLUMNS
    }

    /// Callers holding a self-scoped role (by default staff and admin) see
    /// only their own rows. Everyone else sees every worker.
    pub fn resolve_scope(&self, caller: &Caller) -> RowScope {
        if caller.has_any_role(&self.self_scoped_roles) {
            RowScope::Own(caller.id)
        } else {
            RowScope::All
        }
    }

    /// Both bounds are needed for a filter; a missing one means full history.
    pub fn resolve_date_range(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Option<DateRange>, AppError> {
        let (Some(from), Some(to)) = (from, to) else {
            return Ok(None);
        };

        let from = parse_date(from)?;
        let to = parse_date(to)?;
        if self.validate_date_range && from > to {
            return Err(AppError::InvalidRange { from, to });
        }

        Ok(Some(DateRange { from, to }))
    }

    /// Requested order, dropping unknown and non-orderable columns.
    pub fn resolve_order(request: &TableRequest) -> Vec<SortKey> {
        let order: Vec<SortKey> = request
            .order
            .iter()
            .filter_map(|o| {
                column(o.column)
                    .filter(|c| c.orderable)
                    .map(|c| SortKey { column: c, dir: o.dir })
            })
            .collect();

        if !order.is_empty() {
            return order;
        }

        DEFAULT_ORDER
            .iter()
            .filter_map(|i| column(*i))
            .map(|c| SortKey {
                column: c,
                dir: SortDirection::Desc,
            })
            .collect()
    }

    pub fn build_query(&self, caller: &Caller, request: &TableRequest) -> Result<AttendanceQuery, AppError> {
        let scope = self.resolve_scope(caller);
        debug!(caller_id = caller.id, scope = ?scope, "Resolved attendance scope");

        Ok(AttendanceQuery {
            scope,
            date_range: self.resolve_date_range(request.date_from.as_deref(), request.date_to.as_deref())?,
            search: request.search.clone(),
            order: Self::resolve_order(request),
            offset: request.start,
            limit: request.page_length().map(|len| len.min(self.max_page_length)),
        })
    }

    pub async fn list_attendance(
        &self,
        caller: &Caller,
        request: &TableRequest,
    ) -> Result<AttendancePage, AppError> {
        let query = self.build_query(caller, request)?;

        let records_total = self.store.count(&query, false).await?;
        let records_filtered = if query.search.is_some() {
            self.store.count(&query, true).await?
        } else {
            records_total
        };

        let records = self.store.fetch_page(&query).await?;
        let entries = self.load_relations(records).await?;

        let data = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| format_row(entry, query.offset + i as u64 + 1))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            caller_id = caller.id,
            draw = request.draw,
            records_total,
            records_filtered,
            returned = data.len(),
            "Attendance page served"
        );

        Ok(AttendancePage {
            draw: request.draw,
            records_total,
            records_filtered,
            data,
        })
    }

    /// Attaches users and their shifts with one batched lookup for the page.
    async fn load_relations(
        &self,
        records: Vec<AttendanceRecord>,
    ) -> Result<Vec<AttendanceWithRelations>, AppError> {
        let mut worker_ids: Vec<u64> = records.iter().map(|r| r.worker_id).collect();
        worker_ids.sort_unstable();
        worker_ids.dedup();

        let shifts: HashMap<u64, Vec<Shift>> = self.store.shifts_for(&worker_ids).await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let user = record.worker_name.clone().map(|name| User {
                    id: record.worker_id,
                    name,
                    shifts: shifts.get(&record.worker_id).cloned().unwrap_or_default(),
                });
                AttendanceWithRelations::new(record, user)
            })
            .collect())
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryAttendanceStore;
    use crate::table::columns::fixtures::{record, shift};
    use crate::table::columns::{CellValue, ROW_INDEX_KEY};
    use crate::table::request::OrderRequest;

    const WORKER_A: u64 = 1;
    const WORKER_B: u64 = 2;

    fn store() -> MemoryAttendanceStore {
        let mut a = record(10, WORKER_A, "2024-01-01");
        a.late_time = "00:10:00".to_string();
        let b = record(20, WORKER_B, "2024-01-02");

        MemoryAttendanceStore::new(
            vec![a, b],
            vec![shift(WORKER_A, "#1e90ff"), shift(WORKER_B, "#ff8c00")],
        )
    }

    fn service(store: MemoryAttendanceStore) -> AttendanceQueryService {
        AttendanceQueryService::new(Arc::new(store), &Config::default())
    }

    fn january() -> TableRequest {
        TableRequest {
            date_from: Some("2024-01-01".to_string()),
            date_to: Some("2024-01-31".to_string()),
            ..TableRequest::default()
        }
    }

    fn text<'a>(row: &'a DisplayRow, key: &str) -> &'a str {
        row.cells[key].as_text().unwrap()
    }

    #[actix_web::test]
    async fn staff_caller_sees_only_own_late_record() {
        let svc = service(store());
        let caller = Caller::new(WORKER_A, "a", [Role::Staff]);

        let page = svc.list_attendance(&caller, &january()).await.unwrap();

        assert_eq!(page.records_total, 1);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, 10);
        assert!(page.data[0].flags.is_late);
        assert!(text(&page.data[0], "late_time").contains("<b>00:10:00</b>"));
    }

    #[actix_web::test]
    async fn manager_sees_every_worker() {
        let svc = service(store());
        let caller = Caller::new(99, "m", [Role::Manager]);

        let page = svc.list_attendance(&caller, &january()).await.unwrap();

        assert_eq!(page.records_total, 2);
        // default order is newest date first
        let ids: Vec<u64> = page.data.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![20, 10]);
        assert_eq!(text(&page.data[0], "late_time"), "00:00:00");
        assert!(!page.data[0].flags.is_late);
    }

    #[actix_web::test]
    async fn admin_is_scoped_to_self_by_default() {
        let svc = service(store());
        let caller = Caller::new(WORKER_B, "b", [Role::Admin]);

        let page = svc.list_attendance(&caller, &TableRequest::default()).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].flags.worker_id, WORKER_B);
    }

    #[actix_web::test]
    async fn self_scoped_roles_are_configurable() {
        let config = Config {
            self_scoped_roles: vec![Role::Staff],
            ..Config::default()
        };
        let svc = AttendanceQueryService::new(Arc::new(store()), &config);
        let caller = Caller::new(WORKER_B, "b", [Role::Admin]);

        let page = svc.list_attendance(&caller, &TableRequest::default()).await.unwrap();
        assert_eq!(page.data.len(), 2);
    }

    #[actix_web::test]
    async fn date_range_is_inclusive_and_optional() {
        let svc = service(store());
        let caller = Caller::new(99, "m", [Role::Manager]);

        let only_first = TableRequest {
            date_from: Some("2024-01-01".to_string()),
            date_to: Some("2024-01-01".to_string()),
            ..TableRequest::default()
        };
        let page = svc.list_attendance(&caller, &only_first).await.unwrap();
        assert_eq!(page.data.iter().map(|r| r.id).collect::<Vec<_>>(), vec![10]);

        let open_ended = TableRequest {
            date_from: Some("2024-01-02".to_string()),
            ..TableRequest::default()
        };
        let page = svc.list_attendance(&caller, &open_ended).await.unwrap();
        assert_eq!(page.records_total, 2);
    }

    #[actix_web::test]
    async fn inverted_or_malformed_range_is_rejected() {
        let svc = service(store());
        let caller = Caller::new(99, "m", [Role::Manager]);

        let inverted = TableRequest {
            date_from: Some("2024-02-01".to_string()),
            date_to: Some("2024-01-01".to_string()),
            ..TableRequest::default()
        };
        let err = svc.list_attendance(&caller, &inverted).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_RANGE");

        let malformed = TableRequest {
            date_from: Some("01/02/2024".to_string()),
            date_to: Some("2024-01-01".to_string()),
            ..TableRequest::default()
        };
        let err = svc.list_attendance(&caller, &malformed).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATE");
    }

    #[actix_web::test]
    async fn inverted_range_without_validation_is_empty() {
        let config = Config {
            validate_date_range: false,
            ..Config::default()
        };
        let svc = AttendanceQueryService::new(Arc::new(store()), &config);
        let inverted = TableRequest {
            date_from: Some("2024-02-01".to_string()),
            date_to: Some("2024-01-01".to_string()),
            ..TableRequest::default()
        };

        let page = svc
            .list_attendance(&Caller::new(99, "m", [Role::Manager]), &inverted)
            .await
            .unwrap();
        assert_eq!(page.records_total, 0);
        assert!(page.data.is_empty());
    }

    #[actix_web::test]
    async fn row_numbers_follow_page_offset() {
        let records = (1..=25)
            .map(|i| record(i, WORKER_A, &format!("2024-01-{:02}", i)))
            .collect();
        let svc = service(MemoryAttendanceStore::new(records, vec![shift(WORKER_A, "red")]));
        let caller = Caller::new(99, "m", [Role::Manager]);

        // page p = 2 with n = 10
        let request = TableRequest {
            start: 20,
            length: 10,
            ..TableRequest::default()
        };
        let page = svc.list_attendance(&caller, &request).await.unwrap();

        assert_eq!(page.data.len(), 5);
        for (i, row) in page.data.iter().enumerate() {
            assert_eq!(row.cells[ROW_INDEX_KEY], CellValue::Number(2 * 10 + i as u64 + 1));
        }
    }

    #[actix_web::test]
    async fn all_rows_sentinel_returns_everything() {
        let records = (1..=15)
            .map(|i| record(i, WORKER_A, &format!("2024-01-{:02}", i)))
            .collect();
        let svc = service(MemoryAttendanceStore::new(records, vec![shift(WORKER_A, "red")]));

        let request = TableRequest {
            length: -1,
            ..TableRequest::default()
        };
        let page = svc.list_attendance(&Caller::new(99, "m", [Role::Manager]), &request).await.unwrap();
        assert_eq!(page.data.len(), 15);
    }

    #[actix_web::test]
    async fn search_narrows_filtered_count_only() {
        let svc = service(store());
        let request = TableRequest {
            search: Some("worker 2".to_string()),
            ..TableRequest::default()
        };

        let page = svc.list_attendance(&Caller::new(99, "m", [Role::Manager]), &request).await.unwrap();
        assert_eq!(page.records_total, 2);
        assert_eq!(page.records_filtered, 1);
        assert_eq!(page.data[0].id, 20);
    }

    #[actix_web::test]
    async fn missing_shift_fails_the_page() {
        let mut store = store();
        store.shifts.retain(|s| s.user_id != WORKER_B);
        let svc = service(store);

        let err = svc
            .list_attendance(&Caller::new(99, "m", [Role::Manager]), &TableRequest::default())
            .await
            .unwrap_err();
        match err {
            AppError::DataIntegrity { record_id, .. } => assert_eq!(record_id, 20),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[actix_web::test]
    async fn store_failure_propagates() {
        let mut store = store();
        store.fail = true;
        let svc = service(store);

        let err = svc
            .list_attendance(&Caller::new(99, "m", [Role::Manager]), &TableRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
    }

    #[actix_web::test]
    async fn shifts_are_loaded_once_per_page() {
        let store = Arc::new(store());
        let svc = AttendanceQueryService::new(store.clone(), &Config::default());

        svc.list_attendance(&Caller::new(99, "m", [Role::Manager]), &TableRequest::default())
            .await
            .unwrap();

        let lookups = store.shift_lookups.lock().unwrap();
        assert_eq!(*lookups, vec![vec![WORKER_A, WORKER_B]]);
    }

    #[test]
    fn order_resolution_skips_unorderable_columns() {
        let request = TableRequest {
            order: vec![
                OrderRequest { column: 0, dir: SortDirection::Asc },
                OrderRequest { column: 42, dir: SortDirection::Asc },
            ],
            ..TableRequest::default()
        };
        let order = AttendanceQueryService::resolve_order(&request);
        let names: Vec<_> = order.iter().map(|k| (k.column.data, k.dir)).collect();
        assert_eq!(
            names,
            vec![("date", SortDirection::Desc), ("date_out", SortDirection::Desc)]
        );

        let request = TableRequest {
            order: vec![OrderRequest { column: 1, dir: SortDirection::Asc }],
            ..TableRequest::default()
        };
        let order = AttendanceQueryService::resolve_order(&request);
        assert_eq!(order.len(), 1);
        assert_eq!(order[0].column.data, "name");
    }

    #[test]
    fn describe_columns_is_static() {
        let first = AttendanceQueryService::describe_columns();
        let second = AttendanceQueryService::describe_columns();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.len(), 12);
    }

    #[test]
    fn page_length_is_capped() {
        let svc = service(store());
        let request = TableRequest {
            length: 50_000,
            ..TableRequest::default()
        };
        let query = svc.build_query(&Caller::new(1, "a", [Role::Manager]), &request).unwrap();
        assert_eq!(query.limit, Some(1000));
    }
}
