//! crates/sat_prep_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct ParseVariantError {
    pub kind: &'static str,
    pub value: String,
}

//=========================================================================================
// Identity
//=========================================================================================

/// The role a signed-in user acts under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Instructor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Instructor => "instructor",
            Role::Student => "student",
        }
    }
}

impl FromStr for Role {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instructor" => Ok(Role::Instructor),
            "student" => Ok(Role::Student),
            other => Err(ParseVariantError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user known to the identity bridge. Created on first sign-in, keyed by email.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    /// `None` until the user goes through role selection.
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

//=========================================================================================
// Tests and Students
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Published,
    Unpublished,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Published => "published",
            TestStatus::Unpublished => "unpublished",
        }
    }
}

impl FromStr for TestStatus {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "published" => Ok(TestStatus::Published),
            "unpublished" => Ok(TestStatus::Unpublished),
            other => Err(ParseVariantError {
                kind: "test status",
                value: other.to_string(),
            }),
        }
    }
}

/// A practice test authored by an instructor.
///
/// `questions` and `sections` are structured content owned by the authoring UI;
/// the service stores and returns them untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SatTest {
    pub id: Uuid,
    pub name: String,
    pub questions: Value,
    pub status: TestStatus,
    pub sections: Value,
    /// Total time budget in minutes.
    pub total_time: i32,
    pub created_at: DateTime<Utc>,
    pub share_id: Option<String>,
}

/// The instructor-editable fields of a test, used for both create and full update.
#[derive(Debug, Clone, PartialEq)]
pub struct SatTestDraft {
    pub name: String,
    pub questions: Value,
    pub status: TestStatus,
    pub sections: Value,
    pub total_time: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Assigned test ids, in order of first assignment, without duplicates.
    pub student_exams: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentDetails {
    pub name: String,
    pub email: String,
}

/// A student's single run through an assigned test. Read-only for this service.
#[derive(Debug, Clone, PartialEq)]
pub struct TestAttempt {
    pub id: Uuid,
    pub test_id: Uuid,
    pub student_id: Uuid,
    pub score: Option<i32>,
    pub status: String,
    pub start_time: DateTime<Utc>,
}
