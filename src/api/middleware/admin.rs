use std::sync::Arc;

use axum::Json;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http::header::AUTHORIZATION;
use http::request::Parts;
use serde_json::json;

use crate::api::server::AppState;
use crate::api::middleware::constant_time_cmp;
use crate::db::store::Store;

/// Proof that the request carried the shared administrator token in its
/// `Authorization` header. Guards the create routes for challenges, goals
/// and recycling centers.
#[derive(Debug, Clone, Copy)]
pub struct AdminIdent;

#[derive(Debug)]
pub struct AdminRejection(StatusCode);

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        (
            self.0,
            Json(json!({ "error": "invalid authorization header" })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<Arc<AppState<S>>> for AdminIdent
where
    S: Store,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AdminRejection(StatusCode::UNAUTHORIZED))?
            .to_str()
            .map_err(|_| AdminRejection(StatusCode::BAD_REQUEST))?;

        if constant_time_cmp(header, &state.config.admin_token) {
            Ok(AdminIdent)
        } else {
            Err(AdminRejection(StatusCode::UNAUTHORIZED))
        }
    }
}
