use std::str::FromStr;

use strum_macros::EnumString;

/// Caller role as carried in the access token.
///
/// Names are matched case-insensitively; anything unrecognised is kept
/// verbatim in `Other` and grants nothing.
#[derive(Debug, Clone, Eq, PartialEq, Hash, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    Admin,
    Hr,
    Staff,
    Manager,
    System,
    ApiUser,
    #[strum(default)]
    Other(String),
}

impl Role {
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Role::from_str(&name).unwrap_or(Role::Other(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles_case_insensitively() {
        assert_eq!(Role::parse("STAFF"), Role::Staff);
        assert_eq!(Role::parse(" Admin "), Role::Admin);
        assert_eq!(Role::parse("api_user"), Role::ApiUser);
    }

    #[test]
    fn unknown_role_is_kept() {
        assert_eq!(Role::parse("Auditor"), Role::Other("auditor".to_string()));
        assert_ne!(Role::parse("auditor"), Role::Admin);
    }
}
