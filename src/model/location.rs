use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: u64,
    pub name: String,
}

impl Location {
    /// Builds the related location from a nullable id and its joined name.
    pub fn joined(id: Option<u64>, name: Option<&str>) -> Option<Self> {
        match (id, name) {
            (Some(id), Some(name)) => Some(Location {
                id,
                name: name.to_string(),
            }),
            _ => None,
        }
    }
}
