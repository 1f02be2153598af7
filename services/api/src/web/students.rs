//! services/api/src/web/students.rs
//!
//! Handlers for the instructor's student roster.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use sat_prep_core::domain::StudentDetails;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ErrorBody, HttpError};
use crate::web::rest::{required_text, StudentResponse};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct StudentPayload {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl StudentPayload {
    fn into_details(self) -> Result<StudentDetails, HttpError> {
        if self.name.is_none() || self.email.is_none() {
            return Err(HttpError::BadRequest(
                "Name and email are required".to_string(),
            ));
        }
        Ok(StudentDetails {
            name: required_text(self.name, "name")?,
            email: required_text(self.email, "email")?,
        })
    }
}

/// List all students, newest first.
#[utoipa::path(
    get,
    path = "/api/students",
    responses(
        (status = 200, description = "All students", body = Vec<StudentResponse>),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_students_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StudentResponse>>, HttpError> {
    let students = state
        .db
        .list_students()
        .await
        .map_err(|e| HttpError::port(e, "fetch students"))?;
    Ok(Json(students.into_iter().map(StudentResponse::from).collect()))
}

/// Add a student to the roster.
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = StudentPayload,
    responses(
        (status = 200, description = "The created student", body = StudentResponse),
        (status = 400, description = "Missing name or email", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn create_student_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StudentPayload>, JsonRejection>,
) -> Result<Json<StudentResponse>, HttpError> {
    let Json(payload) = payload?;
    let details = payload.into_details()?;
    let student = state
        .db
        .create_student(&details)
        .await
        .map_err(|e| HttpError::port(e, "add student"))?;
    info!(student_id = %student.id, "Added student");
    Ok(Json(student.into()))
}

/// Change a student's name and email.
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student id")),
    request_body = StudentPayload,
    responses(
        (status = 200, description = "The updated student", body = StudentResponse),
        (status = 400, description = "Missing name or email", body = ErrorBody),
        (status = 404, description = "No such student", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn update_student_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<StudentPayload>, JsonRejection>,
) -> Result<Json<StudentResponse>, HttpError> {
    let Path(id) = path?;
    let Json(payload) = payload?;
    let details = payload.into_details()?;
    let student = state
        .db
        .update_student(id, &details)
        .await
        .map_err(|e| HttpError::port(e, "update student"))?;
    info!(student_id = %id, "Updated student");
    Ok(Json(student.into()))
}
