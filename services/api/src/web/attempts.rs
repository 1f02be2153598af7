//! services/api/src/web/attempts.rs

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ErrorBody, HttpError};
use crate::web::rest::{required, TestAttemptResponse};
use crate::web::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptsQuery {
    pub student_id: Option<Uuid>,
}

/// A student's attempts, most recently started first.
#[utoipa::path(
    get,
    path = "/api/student-test-attempts",
    params(("studentId" = Uuid, Query, description = "Student id")),
    responses(
        (status = 200, description = "Attempts", body = Vec<TestAttemptResponse>),
        (status = 400, description = "Missing student id", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_student_attempts_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AttemptsQuery>, QueryRejection>,
) -> Result<Json<Vec<TestAttemptResponse>>, HttpError> {
    let Query(query) = query?;
    let student_id = required(query.student_id, "studentId")?;
    let attempts = state
        .db
        .list_attempts_for_student(student_id)
        .await
        .map_err(|e| HttpError::port(e, "fetch student attempts"))?;
    Ok(Json(
        attempts.into_iter().map(TestAttemptResponse::from).collect(),
    ))
}
