use serde::{Deserialize, Serialize};

/// A shift assigned to a user, read through the `shift_user` pivot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shift {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    /// CSS color used for the worker's name badge.
    pub color: String,
}
