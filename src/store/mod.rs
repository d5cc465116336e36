//! Read port to the attendance record store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AppError;
use crate::model::attendance::AttendanceRecord;
use crate::model::shift::Shift;
use crate::table::columns::ColumnDef;
use crate::table::request::SortDirection;

#[cfg(test)]
pub mod memory;
pub mod mysql;

/// Which workers' rows a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowScope {
    All,
    Own(u64),
}

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[cfg(test)]
impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SortKey {
    pub column: &'static ColumnDef,
    pub dir: SortDirection,
}

#[derive(Debug, Clone)]
pub struct AttendanceQuery {
    pub scope: RowScope,
    pub date_range: Option<DateRange>,
    pub search: Option<String>,
    /// Resolved against the column table; never empty once built by the service.
    pub order: Vec<SortKey>,
    pub offset: u64,
    /// `None` returns every row from `offset`.
    pub limit: Option<u64>,
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Rows matching scope and date range, plus the search term when `with_search`.
    async fn count(&self, query: &AttendanceQuery, with_search: bool) -> Result<u64, AppError>;

    /// One ordered page, with user and location names joined in.
    async fn fetch_page(&self, query: &AttendanceQuery) -> Result<Vec<AttendanceRecord>, AppError>;

    /// Shifts of each given worker in assignment order. Workers without shifts are absent.
    async fn shifts_for(&self, worker_ids: &[u64]) -> Result<HashMap<u64, Vec<Shift>>, AppError>;
}
