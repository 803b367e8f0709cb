//! HTTP handler for the identify API
//!
//! - POST /api/identify — resolve an (email, phoneNumber) observation

use crate::contacts::resolver::IdentityResolver;
use crate::contacts::types::*;
use crate::error::Error;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;

/// Shared state for contact handlers
#[derive(Clone)]
pub struct ContactsState {
    pub resolver: Arc<IdentityResolver>,
}

/// Create the contacts router
pub fn contacts_router(state: ContactsState) -> Router {
    Router::new()
        .route("/api/identify", post(identify))
        .with_state(state)
}

/// POST /api/identify
async fn identify(
    State(state): State<ContactsState>,
    Json(request): Json<IdentifyRequest>,
) -> Response {
    let observation = Observation::from(request);
    if let Err(e) = observation.validate() {
        return error_response(e);
    }

    match state.resolver.identify(&observation).await {
        Ok(contact) => (StatusCode::OK, Json(IdentifyResponse { contact })).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: Error) -> Response {
    let (status, body) = match &err {
        Error::InvalidInput(message) => (StatusCode::BAD_REQUEST, ApiError::bad_request(message)),
        Error::Integrity { .. } => {
            tracing::error!("Identify failed on corrupt cluster: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::integrity(err.to_string()),
            )
        }
        _ => {
            tracing::error!("Identify failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal(err.to_string()),
            )
        }
    };
    (status, Json(body)).into_response()
}
