//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the store ports from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sat_prep_core::domain::{
    AuthSession, Role, SatTest, SatTestDraft, Student, StudentDetails, TestAttempt, TestStatus, User,
};
use sat_prep_core::ports::{AssignmentStore, DatabaseService, PortError, PortResult};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const USER_COLUMNS: &str = r#"id, email, name, "type" AS role, created_at"#;
const SAT_TEST_COLUMNS: &str =
    "id, name, questions, status, sections, total_time, created_at, share_id";
const STUDENT_COLUMNS: &str = "id, name, email, student_exams, created_at";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    name: Option<String>,
    role: Option<String>,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = self
            .role
            .map(|r| r.parse::<Role>())
            .transpose()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(User {
            id: self.id,
            email: self.email,
            name: self.name,
            role,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct SatTestRecord {
    id: Uuid,
    name: String,
    questions: Value,
    status: String,
    sections: Value,
    total_time: i32,
    created_at: DateTime<Utc>,
    share_id: Option<String>,
}
impl SatTestRecord {
    fn to_domain(self) -> PortResult<SatTest> {
        let status = self
            .status
            .parse::<TestStatus>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(SatTest {
            id: self.id,
            name: self.name,
            questions: self.questions,
            status,
            sections: self.sections,
            total_time: self.total_time,
            created_at: self.created_at,
            share_id: self.share_id,
        })
    }
}

#[derive(FromRow)]
struct StudentRecord {
    id: Uuid,
    name: String,
    email: String,
    student_exams: Vec<Uuid>,
    created_at: DateTime<Utc>,
}
impl StudentRecord {
    fn to_domain(self) -> Student {
        Student {
            id: self.id,
            name: self.name,
            email: self.email,
            student_exams: self.student_exams,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct TestAttemptRecord {
    id: Uuid,
    test_id: Uuid,
    student_id: Uuid,
    score: Option<i32>,
    status: String,
    start_time: DateTime<Utc>,
}
impl TestAttemptRecord {
    fn to_domain(self) -> TestAttempt {
        TestAttempt {
            id: self.id,
            test_id: self.test_id,
            student_id: self.student_id,
            score: self.score,
            status: self.status,
            start_time: self.start_time,
        }
    }
}

fn tests_to_domain(records: Vec<SatTestRecord>) -> PortResult<Vec<SatTest>> {
    records.into_iter().map(SatTestRecord::to_domain).collect()
}

//=========================================================================================
// `AssignmentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssignmentStore for DbAdapter {
    async fn get_student_exams(&self, student_id: Uuid) -> PortResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Vec<Uuid>>("SELECT student_exams FROM students WHERE id = $1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Student {}", student_id)))
    }

    async fn replace_student_exams(
        &self,
        student_id: Uuid,
        expected: &[Uuid],
        updated: &[Uuid],
    ) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE students SET student_exams = $3 WHERE id = $1 AND student_exams = $2",
        )
        .bind(student_id)
        .bind(expected)
        .bind(updated)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        // Zero rows: either the list moved on, or the student is gone.
        self.get_student_exams(student_id).await?;
        Ok(false)
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn upsert_user(&self, email: &str, name: Option<&str>) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, name) VALUES ($1, $2, $3) \
             ON CONFLICT (email) DO UPDATE SET name = COALESCE(EXCLUDED.name, users.name) \
             RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {}", email)))?
            .to_domain()
    }

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> PortResult<User> {
        let sql = format!(
            r#"UPDATE users SET "type" = $1 WHERE id = $2 RETURNING {}"#,
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(role.as_str())
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("User {}", user_id)))?
            .to_domain()
    }

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.id)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn resolve_auth_session(&self, session_id: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"SELECT u.id, u.email, u.name, u."type" AS role, u.created_at
               FROM auth_sessions s JOIN users u ON u.id = s.user_id
               WHERE s.id = $1 AND s.expires_at > now()"#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound("Session".to_string()))?;
        record.to_domain()
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_sat_tests(&self) -> PortResult<Vec<SatTest>> {
        let sql = format!(
            "SELECT {} FROM sat_tests ORDER BY created_at DESC",
            SAT_TEST_COLUMNS
        );
        let records = sqlx::query_as::<_, SatTestRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        tests_to_domain(records)
    }

    async fn get_sat_test(&self, id: Uuid) -> PortResult<SatTest> {
        let sql = format!("SELECT {} FROM sat_tests WHERE id = $1", SAT_TEST_COLUMNS);
        sqlx::query_as::<_, SatTestRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("SAT test {}", id)))?
            .to_domain()
    }

    async fn get_sat_tests_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<SatTest>> {
        let sql = format!(
            "SELECT {} FROM sat_tests WHERE id = ANY($1)",
            SAT_TEST_COLUMNS
        );
        let records = sqlx::query_as::<_, SatTestRecord>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        tests_to_domain(records)
    }

    async fn create_sat_test(&self, draft: &SatTestDraft) -> PortResult<SatTest> {
        let sql = format!(
            "INSERT INTO sat_tests (id, name, questions, status, sections, total_time) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            SAT_TEST_COLUMNS
        );
        sqlx::query_as::<_, SatTestRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&draft.name)
            .bind(&draft.questions)
            .bind(draft.status.as_str())
            .bind(&draft.sections)
            .bind(draft.total_time)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn update_sat_test(&self, id: Uuid, draft: &SatTestDraft) -> PortResult<SatTest> {
        let sql = format!(
            "UPDATE sat_tests SET name = $2, questions = $3, status = $4, sections = $5, \
             total_time = $6 WHERE id = $1 RETURNING {}",
            SAT_TEST_COLUMNS
        );
        sqlx::query_as::<_, SatTestRecord>(&sql)
            .bind(id)
            .bind(&draft.name)
            .bind(&draft.questions)
            .bind(draft.status.as_str())
            .bind(&draft.sections)
            .bind(draft.total_time)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("SAT test {}", id)))?
            .to_domain()
    }

    async fn delete_sat_test(&self, id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM sat_tests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_students(&self) -> PortResult<Vec<Student>> {
        let sql = format!(
            "SELECT {} FROM students ORDER BY created_at DESC",
            STUDENT_COLUMNS
        );
        let records = sqlx::query_as::<_, StudentRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_student(&self, details: &StudentDetails) -> PortResult<Student> {
        let sql = format!(
            "INSERT INTO students (id, name, email) VALUES ($1, $2, $3) RETURNING {}",
            STUDENT_COLUMNS
        );
        let record = sqlx::query_as::<_, StudentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&details.name)
            .bind(&details.email)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn update_student(&self, id: Uuid, details: &StudentDetails) -> PortResult<Student> {
        let sql = format!(
            "UPDATE students SET name = $2, email = $3 WHERE id = $1 RETURNING {}",
            STUDENT_COLUMNS
        );
        let record = sqlx::query_as::<_, StudentRecord>(&sql)
            .bind(id)
            .bind(&details.name)
            .bind(&details.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(unexpected)?
            .ok_or_else(|| PortError::NotFound(format!("Student {}", id)))?;
        Ok(record.to_domain())
    }

    async fn list_attempts_for_student(&self, student_id: Uuid) -> PortResult<Vec<TestAttempt>> {
        let records = sqlx::query_as::<_, TestAttemptRecord>(
            "SELECT id, test_id, student_id, score, status, start_time \
             FROM test_attempts WHERE student_id = $1 ORDER BY start_time DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let attempts = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(attempts)
    }
}
