/// Application state and router builder
///
/// Defines the shared application state and builds the Axum router with all
/// routes and middleware. State is constructed explicitly in `main` and
/// passed in; there is no global mutable state anywhere in the server.
///
/// # Example
///
/// ```no_run
/// use tasksphere_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{rate_limit, security::security_headers_layer},
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tasksphere_shared::{
    auth::{
        jwt,
        middleware::{AuthError, CurrentUser},
    },
    models::user::User,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; internals
/// are cheap to clone (pool handle and Arcs).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Login rate limiter
    pub login_limiter: Arc<rate_limit::LoginRateLimiter>,

    /// Process start time, for the health endpoint's uptime
    pub started_at: Instant,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            login_limiter: Arc::new(rate_limit::LoginRateLimiter::default()),
            started_at: Instant::now(),
        }
    }

    /// Gets the JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router
///
/// # Route Map
///
/// ```text
/// /api
/// ├── /health                      GET    liveness + uptime (public)
/// ├── /users
/// │   ├── /                        POST   register (public)
/// │   ├── /login                   POST   login (public, rate-limited)
/// │   ├── /forgot-password         POST   issue reset token (public)
/// │   ├── /reset-password          POST   redeem reset token (public)
/// │   ├── /                        GET    list users (admin)
/// │   ├── /me                      GET    current profile
/// │   ├── /update-profile          PUT    partial profile update
/// │   └── /upload-avatar           POST   multipart avatar upload
/// ├── /tasks
/// │   ├── /                        POST   create, GET list (admin)
/// │   ├── /my                      GET    own tasks (creator or assignee)
/// │   ├── /bulk-create             POST   batch create
/// │   ├── /bulk-delete             DELETE batch delete
/// │   ├── /:id                     GET / PUT / DELETE
/// │   ├── /:id/in-progress         PATCH  status transition
/// │   ├── /:id/complete            PATCH  status transition
/// │   ├── /:id/attachments         POST   multipart upload
/// │   ├── /:id/comments            POST   add comment
/// │   └── /:task_id/comments/:comment_id  DELETE
/// ├── /notifications               GET, PATCH /:id/read
/// ├── /dashboard/stats             GET    (admin)
/// └── /logs                        GET    (admin)
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Public routes: no auth
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_user_routes = Router::new()
        .route("/", post(routes::users::register))
        .route(
            "/login",
            post(routes::users::login).layer(axum::middleware::from_fn_with_state(
                state.clone(),
                rate_limit::login_rate_limit_layer,
            )),
        )
        .route("/forgot-password", post(routes::users::forgot_password))
        .route("/reset-password", post(routes::users::reset_password));

    // Authenticated routes
    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/me", get(routes::users::me))
        .route("/update-profile", put(routes::users::update_profile))
        .route("/upload-avatar", post(routes::users::upload_avatar));

    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task).get(routes::tasks::list_tasks),
        )
        .route("/my", get(routes::tasks::my_tasks))
        .route("/bulk-create", post(routes::tasks::bulk_create_tasks))
        .route("/bulk-delete", delete(routes::tasks::bulk_delete_tasks))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/in-progress", patch(routes::tasks::mark_in_progress))
        .route("/:id/complete", patch(routes::tasks::mark_complete))
        .route("/:id/attachments", post(routes::tasks::upload_attachment))
        .route("/:id/comments", post(routes::tasks::add_comment))
        .route(
            "/:task_id/comments/:comment_id",
            delete(routes::tasks::delete_comment),
        );

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route(
            "/:id/read",
            patch(routes::notifications::mark_notification_read),
        );

    let dashboard_routes =
        Router::new().route("/stats", get(routes::dashboard::dashboard_stats));

    let log_routes = Router::new().route("/", get(routes::logs::list_logs));

    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/tasks", task_routes)
        .nest("/notifications", notification_routes)
        .nest("/dashboard", dashboard_routes)
        .nest("/logs", log_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    let api = Router::new()
        .merge(health_routes)
        .nest("/users", public_user_routes)
        .merge(protected);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .nest("/api", api)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers_layer))
        .with_state(state)
}

/// Bearer-token authentication middleware
///
/// Validates the `Authorization: Bearer <token>` header, resolves the acting
/// user from the database, and injects [`CurrentUser`] into request
/// extensions. The password hash never enters the request context.
async fn auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_token(token, state.jwt_secret()).map_err(|e| match e {
        jwt::JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        _ => AuthError::InvalidToken("Not authorized, token failed".to_string()),
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;

    req.extensions_mut().insert(CurrentUser::from(user));

    Ok(next.run(req).await)
}
