use axum::Json;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::request::Parts;
use serde_json::json;

use crate::db::models::UserId;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity taken from the `x-user-id` header. Authentication itself
/// is handled upstream of this service; handlers only need the resolved id.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub UserId);

#[derive(Debug)]
pub struct IdentityRejection;

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing or malformed user identity" })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok())
            .ok_or(IdentityRejection)?;

        Ok(Identity(UserId(id)))
    }
}
