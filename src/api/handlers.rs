use axum::{
    Json,
    extract::{
        Form, Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::matcher::{MatchError, PhotoMatcher};
use crate::store::EmbeddingStore;

use super::models::{ErrorBody, FindForm, FindParams, FindResponse};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        let status = match &err {
            MatchError::StudentNotFound => StatusCode::NOT_FOUND,
            MatchError::MissingEmbedding => StatusCode::BAD_REQUEST,
            MatchError::Store(e) => {
                log::error!("find failed: {:#}", e);
                return ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database error: {}", e),
                );
            }
        };
        ApiError::new(status, err.to_string())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody::new(self.detail))).into_response()
    }
}

pub async fn find_handler<S: EmbeddingStore>(
    State(matcher): State<Arc<PhotoMatcher<S>>>,
    params: Result<Query<FindParams>, QueryRejection>,
    form: Result<Form<FindForm>, FormRejection>,
) -> Result<Json<FindResponse>, ApiError> {
    let start = Instant::now();
    let Query(params) = params?;
    let Form(form) = form?;

    let student_id = form.student_id.trim();
    if student_id.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "student_id cannot be empty",
        ));
    }

    let found = matcher.find_matches(student_id, params.threshold).await?;

    log::info!(
        "find for student {} returned {} matches in {}ms",
        student_id,
        found.matches.len(),
        start.elapsed().as_millis()
    );

    Ok(Json(found.into()))
}
