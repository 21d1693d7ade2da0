// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, credential, exam},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, exam, credentials, admin).
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let exam_routes = Router::new()
        .route("/sessions", post(exam::open_session))
        .route(
            "/sessions/{id}",
            get(exam::get_session).delete(exam::abandon_session),
        )
        .route("/sessions/{id}/acknowledge", post(exam::acknowledge))
        .route("/sessions/{id}/start", post(exam::start))
        .route("/sessions/{id}/page", put(exam::goto_page))
        .route("/sessions/{id}/answers", put(exam::answer))
        .route("/sessions/{id}/permit", put(exam::set_permit_number))
        .route("/sessions/{id}/submit", post(exam::submit))
        .route("/sessions/{id}/restart", post(exam::restart))
        .route("/sessions/{id}/accept", post(exam::accept))
        .route("/history", get(exam::history))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let credential_routes = Router::new()
        .route("/{user_id}/verify", get(credential::verify))
        // Protected
        .merge(
            Router::new()
                .route("/me", get(credential::my_credential))
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        );

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route(
            "/thresholds",
            get(admin::list_thresholds).put(admin::set_threshold),
        )
        .route("/exam-records", get(admin::list_exam_records))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/exam", exam_routes)
        .nest("/api/credentials", credential_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
