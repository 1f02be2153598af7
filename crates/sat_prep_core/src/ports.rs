//! crates/sat_prep_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The store is the only port: every operation maps onto one round trip to it.

use crate::domain::{
    AuthSession, Role, SatTest, SatTestDraft, Student, StudentDetails, TestAttempt, User,
};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from the backing store.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflicting concurrent update: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Store Port
//=========================================================================================

/// The slice of the store that assignment bookkeeping needs.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn get_student_exams(&self, student_id: Uuid) -> PortResult<Vec<Uuid>>;

    /// Compare-and-set of a student's assignment list.
    ///
    /// Writes `updated` only if the stored list still equals `expected` and
    /// returns whether the write happened. `NotFound` if the student is absent.
    async fn replace_student_exams(
        &self,
        student_id: Uuid,
        expected: &[Uuid],
        updated: &[Uuid],
    ) -> PortResult<bool>;
}

#[async_trait]
pub trait DatabaseService: AssignmentStore {
    // --- Users ---

    /// Inserts a user by email, or refreshes the name of the existing row.
    /// A `None` name never clears a stored one.
    async fn upsert_user(&self, email: &str, name: Option<&str>) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<User>;

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> PortResult<User>;

    // --- Auth Sessions ---

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()>;

    /// Returns the user behind an unexpired session, `NotFound` otherwise.
    async fn resolve_auth_session(&self, session_id: &str) -> PortResult<User>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- SAT Tests ---

    /// All tests, newest first.
    async fn list_sat_tests(&self) -> PortResult<Vec<SatTest>>;

    async fn get_sat_test(&self, id: Uuid) -> PortResult<SatTest>;

    /// The subset of `ids` that exist, in no particular order.
    async fn get_sat_tests_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<SatTest>>;

    async fn create_sat_test(&self, draft: &SatTestDraft) -> PortResult<SatTest>;

    async fn update_sat_test(&self, id: Uuid, draft: &SatTestDraft) -> PortResult<SatTest>;

    /// Deleting an id that does not exist is not an error.
    async fn delete_sat_test(&self, id: Uuid) -> PortResult<()>;

    // --- Students ---

    /// All students, newest first.
    async fn list_students(&self) -> PortResult<Vec<Student>>;

    async fn create_student(&self, details: &StudentDetails) -> PortResult<Student>;

    async fn update_student(&self, id: Uuid, details: &StudentDetails) -> PortResult<Student>;

    // --- Attempts ---

    /// A student's attempts, most recently started first.
    async fn list_attempts_for_student(&self, student_id: Uuid) -> PortResult<Vec<TestAttempt>>;
}
