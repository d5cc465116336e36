use serde::{Deserialize, Serialize};

use super::shift::Shift;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    /// Ordered by assignment; the first one colors the name badge.
    pub shifts: Vec<Shift>,
}
