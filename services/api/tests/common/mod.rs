//! Shared fixtures for the API integration tests: an in-memory store that
//! implements the store ports, and helpers that drive the router directly.

#![allow(dead_code)]

use api_lib::config::{Config, SignInFailurePolicy};
use api_lib::web::{self, state::AppState};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use sat_prep_core::domain::{
    AuthSession, Role, SatTest, SatTestDraft, Student, StudentDetails, TestAttempt, User,
};
use sat_prep_core::ports::{AssignmentStore, DatabaseService, PortError, PortResult};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "test-bridge-secret";

//=========================================================================================
// In-memory store
//=========================================================================================

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: HashMap<String, AuthSession>,
    tests: Vec<SatTest>,
    students: Vec<Student>,
    attempts: Vec<TestAttempt>,
    ticks: i64,
}

impl Tables {
    /// Strictly increasing timestamps so "newest first" is deterministic.
    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        Utc::now() + Duration::milliseconds(self.ticks)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// When set, `upsert_user` fails as if the database were unreachable.
    pub fail_upserts: AtomicBool,
    /// When set, every SAT test, student, assignment and attempt call fails.
    /// Users and auth sessions keep working so requests get past the middleware.
    pub fail_queries: AtomicBool,
    /// Students whose assignment list cannot be read.
    pub broken_students: Mutex<HashSet<Uuid>>,
    /// When set, every assignment compare-and-set loses, as if another writer
    /// always got in first.
    pub contend_assignments: AtomicBool,
    /// When set, `list_sat_tests` panics.
    pub panic_on_list: AtomicBool,
}

pub const STORE_DETAIL: &str = "could not connect to server: Connection refused (10.0.0.5:5432)";

impl MemoryStore {
    fn check(&self) -> PortResult<()> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected(STORE_DETAIL.to_string()));
        }
        Ok(())
    }

    pub fn break_student(&self, id: Uuid) {
        self.broken_students.lock().unwrap().insert(id);
    }

    pub fn user_count(&self) -> usize {
        self.tables.lock().unwrap().users.len()
    }

    pub fn student(&self, id: Uuid) -> Student {
        let tables = self.tables.lock().unwrap();
        tables
            .students
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .expect("student exists")
    }

    pub fn insert_attempt(&self, test_id: Uuid, student_id: Uuid, score: Option<i32>, status: &str) -> Uuid {
        let mut tables = self.tables.lock().unwrap();
        let start_time = tables.now();
        let id = Uuid::new_v4();
        tables.attempts.push(TestAttempt {
            id,
            test_id,
            student_id,
            score,
            status: status.to_string(),
            start_time,
        });
        id
    }
}

#[async_trait]
impl AssignmentStore for MemoryStore {
    async fn get_student_exams(&self, student_id: Uuid) -> PortResult<Vec<Uuid>> {
        self.check()?;
        if self.broken_students.lock().unwrap().contains(&student_id) {
            return Err(PortError::Unexpected(STORE_DETAIL.to_string()));
        }
        let tables = self.tables.lock().unwrap();
        tables
            .students
            .iter()
            .find(|s| s.id == student_id)
            .map(|s| s.student_exams.clone())
            .ok_or_else(|| PortError::NotFound(format!("Student {}", student_id)))
    }

    async fn replace_student_exams(
        &self,
        student_id: Uuid,
        expected: &[Uuid],
        updated: &[Uuid],
    ) -> PortResult<bool> {
        self.check()?;
        if self.contend_assignments.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let mut tables = self.tables.lock().unwrap();
        let student = tables
            .students
            .iter_mut()
            .find(|s| s.id == student_id)
            .ok_or_else(|| PortError::NotFound(format!("Student {}", student_id)))?;
        if student.student_exams != expected {
            return Ok(false);
        }
        student.student_exams = updated.to_vec();
        Ok(true)
    }
}

#[async_trait]
impl DatabaseService for MemoryStore {
    async fn upsert_user(&self, email: &str, name: Option<&str>) -> PortResult<User> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection refused".to_string()));
        }
        let mut tables = self.tables.lock().unwrap();
        if let Some(user) = tables.users.iter_mut().find(|u| u.email == email) {
            if let Some(name) = name {
                user.name = Some(name.to_string());
            }
            return Ok(user.clone());
        }
        let created_at = tables.now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.map(str::to_string),
            role: None,
            created_at,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<User> {
        let tables = self.tables.lock().unwrap();
        tables
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("User {}", email)))
    }

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> PortResult<User> {
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {}", user_id)))?;
        user.role = Some(role);
        Ok(user.clone())
    }

    async fn create_auth_session(&self, session: &AuthSession) -> PortResult<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn resolve_auth_session(&self, session_id: &str) -> PortResult<User> {
        let tables = self.tables.lock().unwrap();
        let session = tables
            .sessions
            .get(session_id)
            .filter(|s| s.expires_at > Utc::now())
            .ok_or_else(|| PortError::NotFound("Session".to_string()))?;
        tables
            .users
            .iter()
            .find(|u| u.id == session.user_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Session".to_string()))
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.lock().unwrap().sessions.remove(session_id);
        Ok(())
    }

    async fn list_sat_tests(&self) -> PortResult<Vec<SatTest>> {
        if self.panic_on_list.load(Ordering::SeqCst) {
            panic!("sat_tests row failed to decode");
        }
        self.check()?;
        let mut tests = self.tables.lock().unwrap().tests.clone();
        tests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tests)
    }

    async fn get_sat_test(&self, id: Uuid) -> PortResult<SatTest> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        tables
            .tests
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("SAT test {}", id)))
    }

    async fn get_sat_tests_by_ids(&self, ids: &[Uuid]) -> PortResult<Vec<SatTest>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        // Reverse insertion order, so callers cannot rely on it.
        Ok(tables
            .tests
            .iter()
            .rev()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn create_sat_test(&self, draft: &SatTestDraft) -> PortResult<SatTest> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let created_at = tables.now();
        let test = SatTest {
            id: Uuid::new_v4(),
            name: draft.name.clone(),
            questions: draft.questions.clone(),
            status: draft.status,
            sections: draft.sections.clone(),
            total_time: draft.total_time,
            created_at,
            share_id: None,
        };
        tables.tests.push(test.clone());
        Ok(test)
    }

    async fn update_sat_test(&self, id: Uuid, draft: &SatTestDraft) -> PortResult<SatTest> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let test = tables
            .tests
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| PortError::NotFound(format!("SAT test {}", id)))?;
        test.name = draft.name.clone();
        test.questions = draft.questions.clone();
        test.status = draft.status;
        test.sections = draft.sections.clone();
        test.total_time = draft.total_time;
        Ok(test.clone())
    }

    async fn delete_sat_test(&self, id: Uuid) -> PortResult<()> {
        self.check()?;
        self.tables.lock().unwrap().tests.retain(|t| t.id != id);
        Ok(())
    }

    async fn list_students(&self) -> PortResult<Vec<Student>> {
        self.check()?;
        let mut students = self.tables.lock().unwrap().students.clone();
        students.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(students)
    }

    async fn create_student(&self, details: &StudentDetails) -> PortResult<Student> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let created_at = tables.now();
        let student = Student {
            id: Uuid::new_v4(),
            name: details.name.clone(),
            email: details.email.clone(),
            student_exams: Vec::new(),
            created_at,
        };
        tables.students.push(student.clone());
        Ok(student)
    }

    async fn update_student(&self, id: Uuid, details: &StudentDetails) -> PortResult<Student> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let student = tables
            .students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Student {}", id)))?;
        student.name = details.name.clone();
        student.email = details.email.clone();
        Ok(student.clone())
    }

    async fn list_attempts_for_student(&self, student_id: Uuid) -> PortResult<Vec<TestAttempt>> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        let mut attempts: Vec<TestAttempt> = tables
            .attempts
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(attempts)
    }
}

//=========================================================================================
// Router harness
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn test_config(policy: SignInFailurePolicy) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        log_level: tracing::Level::INFO,
        db_max_connections: 1,
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        identity_bridge_secret: SECRET.to_string(),
        signin_failure_policy: policy,
        session_ttl_days: 30,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(SignInFailurePolicy::Reject)
}

pub fn test_app_with(policy: SignInFailurePolicy) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let state = Arc::new(AppState {
        db: store.clone(),
        config: Arc::new(test_config(policy)),
    });
    TestApp {
        router: web::router(state),
        store,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookie: Option<String>,
    pub body: Value,
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            set_cookie,
            body,
        }
    }

    /// Signs in through the identity bridge and returns the `Cookie` header value.
    pub async fn sign_in(&self, email: &str) -> String {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/sign-in")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-identity-secret", SECRET)
            .body(Body::from(
                serde_json::json!({ "email": email, "name": "Test User" }).to_string(),
            ))
            .unwrap();
        let response = self.send(request).await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        let set_cookie = response.set_cookie.expect("sign-in sets a cookie");
        set_cookie
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    /// Signs in and selects `role`, returning the `Cookie` header value.
    pub async fn sign_in_as(&self, email: &str, role: &str) -> String {
        let cookie = self.sign_in(email).await;
        let response = self
            .request(
                "POST",
                "/api/auth/role",
                Some(&cookie),
                Some(serde_json::json!({ "type": role })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        cookie
    }

    pub async fn instructor(&self) -> String {
        self.sign_in_as("instructor@example.com", "instructor").await
    }
}
