use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::location::Location;
use super::user::User;

/// Duration value meaning "no time recorded".
pub const EMPTY_DURATION: &str = "00:00:00";

/// One attendance row joined with the user and location names.
///
/// Durations are read as `HH:MM:SS` text so values above 24h survive.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: u64,
    pub worker_id: u64,
    pub date: NaiveDate,
    pub in_time: Option<NaiveTime>,
    pub date_out: Option<NaiveDate>,
    pub out_time: Option<NaiveTime>,
    pub work_hour: String,
    pub over_time: String,
    pub late_time: String,
    pub early_out_time: String,
    pub in_location_id: Option<u64>,
    pub out_location_id: Option<u64>,

    // joined
    pub worker_name: Option<String>,
    pub area_in_name: Option<String>,
    pub area_out_name: Option<String>,
}

/// A record with its eager-loaded relations, ready for display.
#[derive(Debug, Clone)]
pub struct AttendanceWithRelations {
    pub record: AttendanceRecord,
    pub user: Option<User>,
    pub area_in: Option<Location>,
    pub area_out: Option<Location>,
}

impl AttendanceWithRelations {
    pub fn new(record: AttendanceRecord, user: Option<User>) -> Self {
        let area_in = Location::joined(record.in_location_id, record.area_in_name.as_deref());
        let area_out = Location::joined(record.out_location_id, record.area_out_name.as_deref());

        Self {
            record,
            user,
            area_in,
            area_out,
        }
    }
}
