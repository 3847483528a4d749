use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::error;

use super::directory::ProfileLookup;
use super::domain::{CallerIdentity, EmployeeSubmission};
use super::pipeline::RegistrationPipeline;
use super::profile::{ProfileError, ProfileResult, ProfileService};
use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallerIdentityError {
    #[error("No token was provided.")]
    Missing,
    #[error("Invalid authorization format. Use 'Bearer <token>'.")]
    Malformed,
}

impl CallerIdentity {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, CallerIdentityError> {
        let value = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(CallerIdentityError::Missing)?;
        let token = value
            .strip_prefix(BEARER_PREFIX)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(CallerIdentityError::Malformed)?;
        Ok(Self::new(token))
    }
}

#[derive(Clone)]
pub struct RegistrationState {
    pub pipeline: Arc<RegistrationPipeline>,
    pub profiles: Arc<ProfileService>,
}

/// Router exposing employee submission and profile lookup.
pub fn registration_router(
    pipeline: Arc<RegistrationPipeline>,
    profiles: Arc<ProfileService>,
) -> Router {
    Router::new()
        .route("/api/v1/employees", post(submit_handler))
        .route("/api/v1/employees/profile", get(profile_handler))
        .with_state(RegistrationState { pipeline, profiles })
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    let payload = json!({
        "error": message.to_string(),
    });
    (status, Json(payload)).into_response()
}

pub(crate) async fn submit_handler(
    State(state): State<RegistrationState>,
    headers: HeaderMap,
    Json(submission): Json<EmployeeSubmission>,
) -> Response {
    let caller = match CallerIdentity::from_headers(&headers) {
        Ok(caller) => caller,
        Err(err) => return error_response(StatusCode::UNAUTHORIZED, err),
    };

    let pipeline = Arc::clone(&state.pipeline);
    match tokio::task::spawn_blocking(move || pipeline.submit(submission, &caller)).await {
        Ok(result) => {
            let status = StatusCode::from_u16(result.status_code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(result)).into_response()
        }
        Err(err) => {
            error!(error = %err, "registration task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "registration task failed")
        }
    }
}

pub(crate) async fn profile_handler(
    State(state): State<RegistrationState>,
    Query(lookup): Query<ProfileLookup>,
) -> Result<Response, AppError> {
    let profiles = Arc::clone(&state.profiles);
    let fetched = tokio::task::spawn_blocking(move || profiles.fetch(&lookup))
        .await
        .map_err(|err| {
            error!(error = %err, "profile task failed");
            AppError::Server(axum::Error::new(err))
        })?;

    match fetched {
        Ok(Some(profile)) => {
            Ok((StatusCode::OK, Json(ProfileResult::found(profile))).into_response())
        }
        Ok(None) => Ok(error_response(StatusCode::NOT_FOUND, "employee not found")),
        Err(err @ ProfileError::MissingCriteria) => Err(err.into()),
        Err(other) => {
            error!(error = %other, "profile lookup failed");
            Err(other.into())
        }
    }
}
