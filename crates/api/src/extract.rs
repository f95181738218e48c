//! Request identity.
//!
//! Authentication happens upstream; by the time a request reaches this
//! service it carries the caller's user id and role as headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use domain::{Actor, Role, UserId};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller, built from [`USER_ID_HEADER`] and
/// [`USER_ROLE_HEADER`]. Rejects with 401 when either is missing or invalid.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER)?
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthenticated(format!("invalid {USER_ID_HEADER} header")))?;
        let role = header(parts, USER_ROLE_HEADER)?
            .parse::<Role>()
            .map_err(|e| ApiError::Unauthenticated(format!("invalid {USER_ROLE_HEADER} header: {e}")))?;

        Ok(Identity(Actor::new(user_id, role)))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated(format!("missing {name} header")))
}
