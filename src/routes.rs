// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, certificate, forum, module, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Public reads (modules, quizzes, topics, certificate verification).
/// * Signed-in actions behind `auth_middleware` (quiz submission, own
///   certificates, forum writes).
/// * Admin console behind `auth_middleware` + `admin_middleware`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let require_auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/session", get(auth::session))
                .layer(require_auth.clone()),
        );

    let module_routes = Router::new()
        .route("/", get(module::list_modules))
        .route("/{id}", get(module::get_module))
        .route("/{id}/quiz", get(quiz::get_quiz))
        .merge(
            Router::new()
                .route("/{id}/quiz/submit", post(quiz::submit_quiz))
                .route("/{id}/certificate", get(certificate::get_my_certificate))
                .layer(require_auth.clone()),
        );

    let certificate_routes = Router::new()
        .route("/verify/{number}", get(certificate::verify_certificate))
        .merge(
            Router::new()
                .route("/", get(certificate::list_my_certificates))
                .layer(require_auth.clone()),
        );

    // Reads are public, writes need a session: layer only the write methods.
    let topic_routes = Router::new()
        .route(
            "/",
            get(forum::list_topics).merge(post(forum::create_topic).layer(require_auth.clone())),
        )
        .route(
            "/{id}",
            get(forum::get_topic).merge(
                put(forum::update_topic)
                    .delete(forum::delete_topic)
                    .layer(require_auth.clone()),
            ),
        )
        .route(
            "/{id}/comments",
            get(forum::list_comments)
                .merge(post(forum::create_comment).layer(require_auth.clone())),
        );

    let comment_routes = Router::new()
        .route(
            "/{id}",
            put(forum::update_comment).delete(forum::delete_comment),
        )
        .layer(require_auth.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            put(admin::update_user_role).delete(admin::delete_user),
        )
        .route("/modules", post(admin::create_module))
        .route(
            "/modules/{id}",
            put(admin::update_module).delete(admin::delete_module),
        )
        .route(
            "/modules/{id}/quiz",
            get(admin::get_quiz)
                .put(admin::upsert_quiz)
                .delete(admin::delete_quiz),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(require_auth);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/modules", module_routes)
        .nest("/api/certificates", certificate_routes)
        .nest("/api/topics", topic_routes)
        .nest("/api/comments", comment_routes)
        .nest("/api/admin", admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
