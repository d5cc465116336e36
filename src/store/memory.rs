//! In-memory store used by service and handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{AttendanceQuery, AttendanceStore, RowScope};
use crate::error::AppError;
use crate::model::attendance::AttendanceRecord;
use crate::model::shift::Shift;
use crate::table::columns::{COLUMNS, ColumnKind, DurationField, LocationSide, PlainField};
use crate::table::request::SortDirection;

#[derive(Default)]
pub struct MemoryAttendanceStore {
    pub records: Vec<AttendanceRecord>,
    pub shifts: Vec<Shift>,
    /// When set, every call fails as an unreachable database would.
    pub fail: bool,
    /// Worker ids passed to each `shifts_for` call.
    pub shift_lookups: Mutex<Vec<Vec<u64>>>,
}

impl MemoryAttendanceStore {
    pub fn new(records: Vec<AttendanceRecord>, shifts: Vec<Shift>) -> Self {
        Self {
            records,
            shifts,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), AppError> {
        if self.fail {
            Err(AppError::from(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    fn matching(&self, query: &AttendanceQuery, with_search: bool) -> Vec<&AttendanceRecord> {
        self.records
            .iter()
            .filter(|r| match query.scope {
                RowScope::All => true,
                RowScope::Own(id) => r.worker_id == id,
            })
            .filter(|r| query.date_range.is_none_or(|range| range.contains(r.date)))
            .filter(|r| {
                !with_search
                    || query
                        .search
                        .as_deref()
                        .is_none_or(|term| searchable_text(r).contains(&term.to_lowercase()))
            })
            .collect()
    }
}

fn sort_value(record: &AttendanceRecord, kind: ColumnKind) -> String {
    match kind {
        ColumnKind::RowNumber => String::new(),
        ColumnKind::NameBadge => record.worker_name.clone().unwrap_or_default(),
        ColumnKind::Plain(PlainField::Date) => record.date.to_string(),
        ColumnKind::Plain(PlainField::InTime) => record.in_time.map(|t| t.to_string()).unwrap_or_default(),
        ColumnKind::Plain(PlainField::DateOut) => record.date_out.map(|d| d.to_string()).unwrap_or_default(),
        ColumnKind::Plain(PlainField::OutTime) => record.out_time.map(|t| t.to_string()).unwrap_or_default(),
        ColumnKind::Plain(PlainField::WorkHour) => record.work_hour.clone(),
        ColumnKind::Duration { field, .. } => match field {
            DurationField::OverTime => record.over_time.clone(),
            DurationField::LateTime => record.late_time.clone(),
            DurationField::EarlyOutTime => record.early_out_time.clone(),
        },
        ColumnKind::Location(LocationSide::In) => record.area_in_name.clone().unwrap_or_default(),
        ColumnKind::Location(LocationSide::Out) => record.area_out_name.clone().unwrap_or_default(),
    }
}

fn searchable_text(record: &AttendanceRecord) -> String {
    COLUMNS
        .iter()
        .filter(|c| c.searchable)
        .map(|c| sort_value(record, c.kind))
        .collect::<Vec<_>>()
        .join("\u{1f}")
        .to_lowercase()
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn count(&self, query: &AttendanceQuery, with_search: bool) -> Result<u64, AppError> {
        self.check()?;
        Ok(self.matching(query, with_search).len() as u64)
    }

    async fn fetch_page(&self, query: &AttendanceQuery) -> Result<Vec<AttendanceRecord>, AppError> {
        self.check()?;
        let mut rows = self.matching(query, true);

        rows.sort_by(|a, b| {
            query
                .order
                .iter()
                .map(|k| {
                    let ord = sort_value(a, k.column.kind).cmp(&sort_value(b, k.column.kind));
                    match k.dir {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                })
                .find(|o| o.is_ne())
                .unwrap_or_else(|| b.id.cmp(&a.id))
        });

        let rows = rows.into_iter().skip(query.offset as usize);
        let rows: Vec<_> = match query.limit {
            Some(limit) => rows.take(limit as usize).cloned().collect(),
            None => rows.cloned().collect(),
        };
        Ok(rows)
    }

    async fn shifts_for(&self, worker_ids: &[u64]) -> Result<HashMap<u64, Vec<Shift>>, AppError> {
        self.check()?;
        self.shift_lookups.lock().unwrap().push(worker_ids.to_vec());

        let mut grouped: HashMap<u64, Vec<Shift>> = HashMap::new();
        for shift in self.shifts.iter().filter(|s| worker_ids.contains(&s.user_id)) {
            grouped.entry(shift.user_id).or_default().push(shift.clone());
        }
        Ok(grouped)
    }
}
