use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::{debug, error};

use super::{AttendanceQuery, AttendanceStore, RowScope};
use crate::error::AppError;
use crate::model::attendance::AttendanceRecord;
use crate::model::shift::Shift;
use crate::table::columns::searchable_sources;
use crate::utils::db_utils::{SqlValue, SqlWhere, bind_as, bind_scalar};

const FROM_JOINED: &str = r#"
        FROM attendances a
        LEFT JOIN users u ON u.id = a.worker_id
        LEFT JOIN locations area_in ON area_in.id = a.in_location_id
        LEFT JOIN locations area_out ON area_out.id = a.out_location_id"#;

const SELECT_COLUMNS: &str = r#"
        SELECT
            a.id,
            a.worker_id,
            a.date,
            a.in_time,
            a.date_out,
            a.out_time,
            IFNULL(TIME_FORMAT(a.work_hour, '%H:%i:%s'), '00:00:00') AS work_hour,
            IFNULL(TIME_FORMAT(a.over_time, '%H:%i:%s'), '00:00:00') AS over_time,
            IFNULL(TIME_FORMAT(a.late_time, '%H:%i:%s'), '00:00:00') AS late_time,
            IFNULL(TIME_FORMAT(a.early_out_time, '%H:%i:%s'), '00:00:00') AS early_out_time,
            a.in_location_id,
            a.out_location_id,
            u.name AS worker_name,
            area_in.name AS area_in_name,
            area_out.name AS area_out_name"#;

/// MySQL LIMIT has no "unbounded" form; this is the documented idiom.
const NO_LIMIT: u64 = u64::MAX;

pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn build_where(query: &AttendanceQuery, with_search: bool) -> SqlWhere {
    let mut w = SqlWhere::new();

    if let RowScope::Own(worker_id) = query.scope {
        w.and_eq("a.worker_id", SqlValue::U64(worker_id));
    }

    if let Some(range) = query.date_range {
        w.and_between("a.date", SqlValue::Date(range.from), SqlValue::Date(range.to));
    }

    if with_search {
        if let Some(term) = query.search.as_deref() {
            w.and_any_like(searchable_sources(), term);
        }
    }

    w
}

fn order_by(query: &AttendanceQuery) -> String {
    let mut keys: Vec<String> = query
        .order
        .iter()
        .filter_map(|k| k.column.source.map(|src| format!("{} {}", src, k.dir.as_sql())))
        .collect();
    // stable paging across equal sort values
    keys.push("a.id DESC".to_string());
    format!(" ORDER BY {}", keys.join(", "))
}

fn limit(query: &AttendanceQuery) -> (String, Vec<SqlValue>) {
    match (query.limit, query.offset) {
        (Some(limit), offset) => (
            " LIMIT ? OFFSET ?".to_string(),
            vec![SqlValue::U64(limit), SqlValue::U64(offset)],
        ),
        (None, 0) => (String::new(), Vec::new()),
        (None, offset) => (
            " LIMIT ? OFFSET ?".to_string(),
            vec![SqlValue::U64(NO_LIMIT), SqlValue::U64(offset)],
        ),
    }
}

fn page_sql(query: &AttendanceQuery) -> (String, Vec<SqlValue>) {
    let w = build_where(query, true);
    let (limit_sql, limit_values) = limit(query);
    let sql = format!(
        "{}{}{}{}{}",
        SELECT_COLUMNS,
        FROM_JOINED,
        w.to_sql(),
        order_by(query),
        limit_sql
    );

    let mut values = w.values;
    values.extend(limit_values);
    (sql, values)
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn count(&self, query: &AttendanceQuery, with_search: bool) -> Result<u64, AppError> {
        let w = build_where(query, with_search);
        let sql = format!("SELECT COUNT(*){}{}", FROM_JOINED, w.to_sql());
        debug!(sql = %sql, bindings = ?w.values, "Counting attendances");

        let total = bind_scalar(sqlx::query_scalar::<_, i64>(&sql), &w.values)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, sql = %sql, "Failed to count attendances");
                AppError::from(e)
            })?;

        Ok(total.max(0) as u64)
    }

    async fn fetch_page(&self, query: &AttendanceQuery) -> Result<Vec<AttendanceRecord>, AppError> {
        let (sql, values) = page_sql(query);
        debug!(sql = %sql, bindings = ?values, "Fetching attendance page");

        bind_as(sqlx::query_as::<_, AttendanceRecord>(&sql), &values)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, sql = %sql, "Failed to fetch attendance page");
                AppError::from(e)
            })
    }

    async fn shifts_for(&self, worker_ids: &[u64]) -> Result<HashMap<u64, Vec<Shift>>, AppError> {
        let mut grouped: HashMap<u64, Vec<Shift>> = HashMap::new();
        if worker_ids.is_empty() {
            return Ok(grouped);
        }

        let mut w = SqlWhere::new();
        w.and_in("su.user_id", worker_ids.iter().map(|id| SqlValue::U64(*id)));
        let sql = format!(
            r#"
        SELECT s.id, su.user_id, s.name, s.color
        FROM shift_user su
        JOIN shifts s ON s.id = su.shift_id{}
        ORDER BY su.user_id, su.id"#,
            w.to_sql()
        );

        let shifts = bind_as(sqlx::query_as::<_, Shift>(&sql), &w.values)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, workers = worker_ids.len(), "Failed to fetch worker shifts");
                AppError::from(e)
            })?;

        for shift in shifts {
            grouped.entry(shift.user_id).or_default().push(shift);
        }

        Ok(grouped)
    }
}
