//! Static column table for the attendance grid and the per-cell formatter.
//!
//! Every column the client can show is declared once in [`COLUMNS`]. The
//! declaration drives the page shell, the search and sort SQL, and the
//! formatting of each JSON row, so the three can never drift apart.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::attendance::{AttendanceWithRelations, EMPTY_DURATION};

/// Key the client reads the row number from.
pub const ROW_INDEX_KEY: &str = "DT_RowIndex";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlainField {
    Date,
    InTime,
    DateOut,
    OutTime,
    WorkHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationField {
    OverTime,
    LateTime,
    EarlyOutTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSide {
    In,
    Out,
}

/// How a column turns a record into a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// `start + index + 1`, never stored
    RowNumber,
    Plain(PlainField),
    /// Highlighted in `color` when above the zero sentinel.
    Duration {
        field: DurationField,
        color: &'static str,
    },
    /// Joined location name, empty when the id is null.
    Location(LocationSide),
    /// Worker name badge colored by the first shift.
    NameBadge,
}

#[derive(Debug)]
pub struct ColumnDef {
    /// Key of the cell in each JSON row.
    pub data: &'static str,
    pub title: &'static str,
    /// SQL expression used to search and order; `None` for computed columns.
    pub source: Option<&'static str>,
    pub orderable: bool,
    pub searchable: bool,
    pub kind: ColumnKind,
}

impl ColumnDef {
    const fn plain(data: &'static str, title: &'static str, source: &'static str, field: PlainField) -> Self {
        ColumnDef {
            data,
            title,
            source: Some(source),
            orderable: true,
            searchable: true,
            kind: ColumnKind::Plain(field),
        }
    }

    const fn duration(
        data: &'static str,
        title: &'static str,
        source: &'static str,
        field: DurationField,
        color: &'static str,
    ) -> Self {
        ColumnDef {
            data,
            title,
            source: Some(source),
            orderable: true,
            searchable: true,
            kind: ColumnKind::Duration { field, color },
        }
    }

    /// Name the client sends back for joined columns, e.g. `user.name`.
    pub fn client_name(&self) -> &'static str {
        match self.kind {
            ColumnKind::NameBadge => "user.name",
            ColumnKind::Location(LocationSide::In) => "areaIn.name",
            ColumnKind::Location(LocationSide::Out) => "areaOut.name",
            _ => self.data,
        }
    }
}

pub static COLUMNS: [ColumnDef; 12] = [
    ColumnDef {
        data: ROW_INDEX_KEY,
        title: "No.",
        source: None,
        orderable: false,
        searchable: false,
        kind: ColumnKind::RowNumber,
    },
    ColumnDef {
        data: "name",
        title: "Name",
        source: Some("u.name"),
        orderable: true,
        searchable: true,
        kind: ColumnKind::NameBadge,
    },
    ColumnDef::plain("date", "In Date", "a.date", PlainField::Date),
    ColumnDef::plain("in_time", "In Time", "a.in_time", PlainField::InTime),
    ColumnDef::plain("date_out", "Out Date", "a.date_out", PlainField::DateOut),
    ColumnDef::plain("out_time", "Out Time", "a.out_time", PlainField::OutTime),
    ColumnDef::plain("work_hour", "Work Hour", "a.work_hour", PlainField::WorkHour),
    ColumnDef::duration("over_time", "Over Time", "a.over_time", DurationField::OverTime, "green"),
    ColumnDef::duration("late_time", "Late Time", "a.late_time", DurationField::LateTime, "red"),
    ColumnDef::duration(
        "early_out_time",
        "Early Out Time",
        "a.early_out_time",
        DurationField::EarlyOutTime,
        "red",
    ),
    ColumnDef {
        data: "in_location_id",
        title: "In Location",
        source: Some("area_in.name"),
        orderable: true,
        searchable: true,
        kind: ColumnKind::Location(LocationSide::In),
    },
    ColumnDef {
        data: "out_location_id",
        title: "Out Location",
        source: Some("area_out.name"),
        orderable: true,
        searchable: true,
        kind: ColumnKind::Location(LocationSide::Out),
    },
];

/// Index of `date` and `date_out`, the default sort when the client sends none.
pub const DEFAULT_ORDER: [usize; 2] = [2, 4];

pub fn column(index: usize) -> Option<&'static ColumnDef> {
    COLUMNS.get(index)
}

pub fn searchable_sources() -> impl Iterator<Item = &'static str> {
    COLUMNS
        .iter()
        .filter(|c| c.searchable)
        .filter_map(|c| c.source)
}

/// Column metadata as handed to the presentation layer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ColumnDescription {
    #[schema(example = "in_location_id")]
    pub data: String,
    #[schema(example = "areaIn.name")]
    pub name: String,
    #[schema(example = "In Location")]
    pub title: String,
    pub orderable: bool,
    pub searchable: bool,
}

impl From<&ColumnDef> for ColumnDescription {
    fn from(c: &ColumnDef) -> Self {
        ColumnDescription {
            data: c.data.to_string(),
            name: c.client_name().to_string(),
            title: c.title.to_string(),
            orderable: c.orderable,
            searchable: c.searchable,
        }
    }
}

/// A rendered cell: text (possibly with markup) or the row number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(u64),
    Text(String),
}

#[cfg(test)]
impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            CellValue::Number(_) => None,
        }
    }
}

/// Semantic view of the highlighted cells, for clients that render themselves.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RowFlags {
    pub worker_id: u64,
    pub worker_name: Option<String>,
    pub shift_color: Option<String>,
    pub is_late: bool,
    pub is_overtime: bool,
    pub is_early_out: bool,
    pub in_location: Option<String>,
    pub out_location: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DisplayRow {
    /// Attendance record id
    pub id: u64,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub cells: BTreeMap<&'static str, CellValue>,
    pub flags: RowFlags,
}

/// Parses `[-]H+:MM:SS` into seconds.
pub fn duration_secs(value: &str) -> Option<i64> {
    let (sign, body) = match value.trim().strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.trim()),
    };

    let mut parts = body.split(':');
    let h: i64 = parts.next()?.parse().ok()?;
    let m: i64 = parts.next()?.parse().ok()?;
    // fractional seconds are ignored
    let s: i64 = parts.next()?.split('.').next()?.parse().ok()?;
    if parts.next().is_some() || m > 59 || s > 59 {
        return None;
    }

    Some(sign * (h * 3600 + m * 60 + s))
}

/// True when the duration is above the `00:00:00` sentinel.
pub fn is_positive_duration(value: &str) -> bool {
    match duration_secs(value) {
        Some(secs) => secs > 0,
        None => value > EMPTY_DURATION,
    }
}

fn escape(value: &str) -> String {
    tera::escape_html(value)
}

fn highlight(value: &str, color: &str) -> String {
    if is_positive_duration(value) {
        format!(r#"<span style="color: {}"><b>{}</b></span>"#, color, escape(value))
    } else {
        escape(value)
    }
}

fn plain_value(entry: &AttendanceWithRelations, field: PlainField) -> String {
    let r = &entry.record;
    match field {
        PlainField::Date => r.date.format("%Y-%m-%d").to_string(),
        PlainField::InTime => r.in_time.map(|t| t.format("%H:%M:%S").to_string()).unwrap_or_default(),
        PlainField::DateOut => r.date_out.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        PlainField::OutTime => r.out_time.map(|t| t.format("%H:%M:%S").to_string()).unwrap_or_default(),
        PlainField::WorkHour => r.work_hour.clone(),
    }
}

fn duration_value(entry: &AttendanceWithRelations, field: DurationField) -> &str {
    let r = &entry.record;
    match field {
        DurationField::OverTime => &r.over_time,
        DurationField::LateTime => &r.late_time,
        DurationField::EarlyOutTime => &r.early_out_time,
    }
}

/// The joined location name, or `None` when the id is null.
fn location_name(entry: &AttendanceWithRelations, side: LocationSide) -> Result<Option<&str>, AppError> {
    let (id, area) = match side {
        LocationSide::In => (entry.record.in_location_id, &entry.area_in),
        LocationSide::Out => (entry.record.out_location_id, &entry.area_out),
    };

    match (id, area) {
        (None, _) => Ok(None),
        (Some(_), Some(location)) => Ok(Some(location.name.as_str())),
        (Some(id), None) => Err(AppError::DataIntegrity {
            record_id: entry.record.id,
            reason: format!("location {id} does not exist"),
        }),
    }
}

/// Worker name and the color of their first shift.
fn name_badge(entry: &AttendanceWithRelations) -> Result<(&str, &str), AppError> {
    let user = entry.user.as_ref().ok_or_else(|| AppError::DataIntegrity {
        record_id: entry.record.id,
        reason: format!("worker {} does not exist", entry.record.worker_id),
    })?;

    let shift = user.shifts.first().ok_or_else(|| AppError::DataIntegrity {
        record_id: entry.record.id,
        reason: format!("worker {} has no shift", user.id),
    })?;

    Ok((user.name.as_str(), shift.color.as_str()))
}

/// Formats one cell. Pure: reads only the record and its loaded relations.
pub fn format_cell(
    column: &ColumnDef,
    entry: &AttendanceWithRelations,
    row_number: u64,
) -> Result<CellValue, AppError> {
    let cell = match column.kind {
        ColumnKind::RowNumber => CellValue::Number(row_number),
        ColumnKind::Plain(field) => CellValue::Text(escape(&plain_value(entry, field))),
        ColumnKind::Duration { field, color } => {
            CellValue::Text(highlight(duration_value(entry, field), color))
        }
        ColumnKind::Location(side) => {
            CellValue::Text(location_name(entry, side)?.map(escape).unwrap_or_default())
        }
        ColumnKind::NameBadge => {
            let (name, color) = name_badge(entry)?;
            CellValue::Text(format!(
                r#"<span style="color: {}" class="badge badge-secondary">{}</span>"#,
                escape(color),
                escape(name)
            ))
        }
    };

    Ok(cell)
}

/// Formats a whole row; `row_number` is its 1-based position in the full result.
pub fn format_row(entry: &AttendanceWithRelations, row_number: u64) -> Result<DisplayRow, AppError> {
    let cells = COLUMNS
        .iter()
        .map(|c| format_cell(c, entry, row_number).map(|v| (c.data, v)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let r = &entry.record;
    let flags = RowFlags {
        worker_id: r.worker_id,
        worker_name: entry.user.as_ref().map(|u| u.name.clone()),
        shift_color: entry
            .user
            .as_ref()
            .and_then(|u| u.shifts.first())
            .map(|s| s.color.clone()),
        is_late: is_positive_duration(&r.late_time),
        is_overtime: is_positive_duration(&r.over_time),
        is_early_out: is_positive_duration(&r.early_out_time),
        in_location: location_name(entry, LocationSide::In)?.map(str::to_string),
        out_location: location_name(entry, LocationSide::Out)?.map(str::to_string),
    };

    Ok(DisplayRow {
        id: r.id,
        cells,
        flags,
    })
}
