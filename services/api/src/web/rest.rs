//! services/api/src/web/rest.rs
//!
//! Contains the response payloads shared by the REST handlers, small input
//! validation helpers, and the master definition for the OpenAPI specification.

use crate::error::{ErrorBody, HttpError};
use crate::web::{assignments, attempts, auth, sat_tests, students};
use chrono::{DateTime, Utc};
use sat_prep_core::domain::{SatTest, Student, TestAttempt};
use serde::Serialize;
use serde_json::Value;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::sign_in_handler,
        auth::session_handler,
        auth::select_role_handler,
        auth::logout_handler,
        sat_tests::list_sat_tests_handler,
        sat_tests::get_sat_test_handler,
        sat_tests::create_sat_test_handler,
        sat_tests::update_sat_test_handler,
        sat_tests::delete_sat_test_handler,
        assignments::list_student_exams_handler,
        assignments::assign_exams_handler,
        assignments::unassign_exam_handler,
        students::list_students_handler,
        students::create_student_handler,
        students::update_student_handler,
        attempts::list_student_attempts_handler,
    ),
    components(
        schemas(
            ErrorBody,
            SuccessResponse,
            SatTestResponse,
            StudentResponse,
            TestAttemptResponse,
            auth::SignInRequest,
            auth::SelectRoleRequest,
            auth::SessionResponse,
            sat_tests::SatTestPayload,
            students::StudentPayload,
            assignments::AssignExamsRequest,
            assignments::AssignmentResultResponse,
        )
    ),
    tags(
        (name = "SAT Prep API", description = "Practice test authoring, assignment and review.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SatTestResponse {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = Object)]
    pub questions: Value,
    /// `published` or `unpublished`.
    pub status: String,
    #[schema(value_type = Object)]
    pub sections: Value,
    /// Minutes.
    pub total_time: i32,
    pub created_at: DateTime<Utc>,
    pub share_id: Option<String>,
}

impl From<SatTest> for SatTestResponse {
    fn from(test: SatTest) -> Self {
        Self {
            id: test.id,
            name: test.name,
            questions: test.questions,
            status: test.status.as_str().to_string(),
            sections: test.sections,
            total_time: test.total_time,
            created_at: test.created_at,
            share_id: test.share_id,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudentResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub student_exams: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Student> for StudentResponse {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            email: student.email,
            student_exams: student.student_exams,
            created_at: student.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TestAttemptResponse {
    pub id: Uuid,
    pub test_id: Uuid,
    pub student_id: Uuid,
    pub score: Option<i32>,
    pub status: String,
    pub start_time: DateTime<Utc>,
}

impl From<TestAttempt> for TestAttemptResponse {
    fn from(attempt: TestAttempt) -> Self {
        Self {
            id: attempt.id,
            test_id: attempt.test_id,
            student_id: attempt.student_id,
            score: attempt.score,
            status: attempt.status,
            start_time: attempt.start_time,
        }
    }
}

//=========================================================================================
// Input Helpers
//=========================================================================================

/// Takes a required text field as sent; missing or blank is a 400.
pub(crate) fn required_text(value: Option<String>, field: &str) -> Result<String, HttpError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| HttpError::BadRequest(format!("{} is required", field)))
}

pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T, HttpError> {
    value.ok_or_else(|| HttpError::BadRequest(format!("{} is required", field)))
}
