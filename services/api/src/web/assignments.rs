//! services/api/src/web/assignments.rs
//!
//! Handlers for `/api/student-exams`: which tests a student is assigned, and
//! assigning or unassigning them.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use sat_prep_core::assignments::{
    assign_exams, order_by_assignment, unassign_exam, AssignmentOutcome, AssignmentResult,
};
use sat_prep_core::ports::AssignmentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ErrorBody, HttpError};
use crate::web::rest::{required, SatTestResponse, SuccessResponse};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentExamQuery {
    pub student_id: Option<Uuid>,
    pub exam_id: Option<Uuid>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignExamsRequest {
    pub student_ids: Option<Vec<Uuid>>,
    pub exam_ids: Option<Vec<Uuid>>,
}

/// The outcome of a bulk assignment for one student.
#[derive(Serialize, ToSchema)]
pub struct AssignmentResultResponse {
    pub student_id: Uuid,
    /// `assigned`, `not_found`, `conflict` or `failed`.
    pub outcome: String,
    /// The student's full assignment list after the update, when assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_exams: Option<Vec<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<AssignmentResult> for AssignmentResultResponse {
    fn from(result: AssignmentResult) -> Self {
        let (outcome, student_exams, error) = match result.outcome {
            AssignmentOutcome::Assigned { student_exams } => ("assigned", Some(student_exams), None),
            AssignmentOutcome::NotFound => ("not_found", None, Some("Student not found")),
            AssignmentOutcome::Conflict => {
                ("conflict", None, Some("Concurrent update, try again"))
            }
            // The reason has already been logged.
            AssignmentOutcome::Failed { .. } => ("failed", None, Some("Failed to assign exams")),
        };
        Self {
            student_id: result.student_id,
            outcome: outcome.to_string(),
            student_exams,
            error: error.map(str::to_string),
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// The tests assigned to a student, in assignment order.
#[utoipa::path(
    get,
    path = "/api/student-exams",
    params(("studentId" = Uuid, Query, description = "Student id")),
    responses(
        (status = 200, description = "Assigned tests", body = Vec<SatTestResponse>),
        (status = 400, description = "Missing student id", body = ErrorBody),
        (status = 404, description = "No such student", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_student_exams_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StudentExamQuery>, QueryRejection>,
) -> Result<Json<Vec<SatTestResponse>>, HttpError> {
    let Query(query) = query?;
    let student_id = required(query.student_id, "studentId")?;

    let exam_ids = state
        .db
        .get_student_exams(student_id)
        .await
        .map_err(|e| HttpError::port(e, "fetch student exams"))?;
    if exam_ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let tests = state
        .db
        .get_sat_tests_by_ids(&exam_ids)
        .await
        .map_err(|e| HttpError::port(e, "fetch exam details"))?;
    let tests = order_by_assignment(tests, &exam_ids);
    Ok(Json(tests.into_iter().map(SatTestResponse::from).collect()))
}

/// Assign tests to students. Each student is updated independently.
#[utoipa::path(
    post,
    path = "/api/student-exams",
    request_body = AssignExamsRequest,
    responses(
        (status = 200, description = "One result per student, in request order", body = Vec<AssignmentResultResponse>),
        (status = 400, description = "Missing student or exam ids", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn assign_exams_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AssignExamsRequest>, JsonRejection>,
) -> Result<Json<Vec<AssignmentResultResponse>>, HttpError> {
    let Json(req) = payload?;
    let student_ids = req.student_ids.unwrap_or_default();
    let exam_ids = req.exam_ids.unwrap_or_default();
    if student_ids.is_empty() || exam_ids.is_empty() {
        return Err(HttpError::BadRequest(
            "Student IDs and Exam IDs are required".to_string(),
        ));
    }

    let results = assign_exams(state.db.as_ref(), &student_ids, &exam_ids).await;
    let assigned = results
        .iter()
        .filter(|r| matches!(r.outcome, AssignmentOutcome::Assigned { .. }))
        .count();
    info!(
        students = student_ids.len(),
        assigned,
        exams = exam_ids.len(),
        "Assigned exams"
    );
    Ok(Json(
        results
            .into_iter()
            .map(AssignmentResultResponse::from)
            .collect(),
    ))
}

/// Remove one test from a student's assignments. Removing an absent id succeeds.
#[utoipa::path(
    delete,
    path = "/api/student-exams",
    params(
        ("studentId" = Uuid, Query, description = "Student id"),
        ("examId" = Uuid, Query, description = "Test id to remove")
    ),
    responses(
        (status = 200, description = "Unassigned", body = SuccessResponse),
        (status = 400, description = "Missing ids", body = ErrorBody),
        (status = 404, description = "No such student", body = ErrorBody),
        (status = 409, description = "Concurrent updates kept winning", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn unassign_exam_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StudentExamQuery>, QueryRejection>,
) -> Result<Json<SuccessResponse>, HttpError> {
    let Query(query) = query?;
    let (Some(student_id), Some(exam_id)) = (query.student_id, query.exam_id) else {
        return Err(HttpError::BadRequest(
            "Student ID and Exam ID are required".to_string(),
        ));
    };

    unassign_exam(state.db.as_ref(), student_id, exam_id)
        .await
        .map_err(|e| HttpError::port(e, "unassign exam"))?;
    info!(%student_id, %exam_id, "Unassigned exam");
    Ok(Json(SuccessResponse::ok()))
}
