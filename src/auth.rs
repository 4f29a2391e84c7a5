//! Caller identity for comment writes.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user id in the `x-user-id` header.

use axum::{
    extract::FromRequestParts,
    http::{HeaderName, request::Parts},
};

use crate::error::AppError;

pub const USER_ID: HeaderName = HeaderName::from_static("x-user-id");

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(&USER_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| CurrentUser { user_id: v.to_string() })
            .ok_or(AppError::Unauthorized)
    }
}
