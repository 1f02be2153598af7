pub mod assignments;
pub mod attempts;
pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod students;

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::error::HttpError;
use crate::web::middleware::{require_auth, require_instructor, require_role};
use crate::web::state::AppState;

/// Builds the API router (everything except the Swagger UI).
pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(app_state.config.cors_origin.clone())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(auth::IDENTITY_SECRET_HEADER),
        ]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/auth/sign-in", post(auth::sign_in_handler))
        .route("/api/auth/session", get(auth::session_handler));

    // Signed in, role not required
    let session_routes = Router::new()
        .route("/api/auth/role", post(auth::select_role_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Any role
    let reader_routes = Router::new()
        .route("/api/sat-tests", get(sat_tests::list_sat_tests_handler))
        .route("/api/sat-tests/{id}", get(sat_tests::get_sat_test_handler))
        .route(
            "/api/student-exams",
            get(assignments::list_student_exams_handler),
        )
        .route_layer(axum_middleware::from_fn(require_role))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Instructors only
    let instructor_routes = Router::new()
        .route("/api/sat-tests", post(sat_tests::create_sat_test_handler))
        .route(
            "/api/sat-tests/{id}",
            put(sat_tests::update_sat_test_handler).delete(sat_tests::delete_sat_test_handler),
        )
        .route(
            "/api/student-exams",
            post(assignments::assign_exams_handler).delete(assignments::unassign_exam_handler),
        )
        .route(
            "/api/students",
            get(students::list_students_handler).post(students::create_student_handler),
        )
        .route("/api/students/{id}", put(students::update_student_handler))
        .route(
            "/api/student-test-attempts",
            get(attempts::list_student_attempts_handler),
        )
        .route_layer(axum_middleware::from_fn(require_instructor))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(reader_routes)
        .merge(instructor_routes)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Turns a handler panic into the generic 500 body.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);
    HttpError::Internal.into_response()
}
