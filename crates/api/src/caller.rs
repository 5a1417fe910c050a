//! Caller identity taken from headers set by the upstream auth gateway.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::{Role, UserId};
use saga::Caller;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor for the authenticated [`Caller`].
///
/// `X-User-Id` is required. `X-User-Role` defaults to `user`. `X-User-Email`
/// may be absent; handlers that notify the caller check it themselves.
#[derive(Debug, Clone)]
pub struct CurrentCaller(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for CurrentCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        caller_from_headers(&parts.headers).map(CurrentCaller)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map(str::trim)
                .map_err(|_| ApiError::Unauthorized(format!("{name} is not valid text")))
        })
        .transpose()
}

fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let raw_id = header(headers, USER_ID_HEADER)?
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;
    let user_id: i64 = raw_id
        .parse()
        .map_err(|_| ApiError::Unauthorized(format!("invalid user id {raw_id}")))?;

    let email = header(headers, USER_EMAIL_HEADER)?.unwrap_or_default();

    let role = match header(headers, USER_ROLE_HEADER)? {
        Some(raw) if !raw.is_empty() => Role::parse(raw)
            .ok_or_else(|| ApiError::Unauthorized(format!("unknown role {raw}")))?,
        _ => Role::User,
    };

    Ok(Caller {
        user_id: UserId::new(user_id),
        email: email.to_string(),
        role,
    })
}
