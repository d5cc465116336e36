use std::collections::HashSet;

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::AppError;
use crate::model::role::Role;
use crate::models::Claims;

/// The authenticated requester, passed explicitly into every service call.
#[derive(Debug, Clone)]
pub struct Caller {
    pub id: u64,
    pub username: String,
    pub roles: HashSet<Role>,
}

impl Caller {
    pub fn new(id: u64, username: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id,
            username: username.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn from_claims(claims: Claims) -> Self {
        Self::new(
            claims.user_id,
            claims.sub,
            claims.roles.iter().map(|r| Role::parse(r)),
        )
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }
}

/// Pulls the caller the auth middleware attached to the request.
impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Caller>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Missing caller identity".to_string())),
        )
    }
}
