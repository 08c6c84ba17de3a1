use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{auth::LEGACY_TOKEN_HEADER, jwt_auth_middleware};
use crate::state::AppState;

/// The full HTTP surface: `/`, `/health` and everything under `/api`.
pub fn app(state: AppState, security: &SecurityConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api_routes(&state))
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(security) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

fn api_routes(state: &AppState) -> Router<AppState> {
    let auth = || from_fn_with_state(state.clone(), jwt_auth_middleware);

    let public_routes = Router::new()
        .route("/users", post(public::users::register))
        .route("/profile/user/:user_id", get(public::profiles::by_user))
        .route("/profile/github/:username", get(public::profiles::github_repos));

    let protected_routes = Router::new()
        .route("/profile/me", get(protected::profile::me))
        .route("/profile/experience", put(protected::profile::add_experience))
        .route("/profile/experience/:exp_id", delete(protected::profile::remove_experience))
        .route("/profile/education", put(protected::profile::add_education))
        .route("/profile/education/:edu_id", delete(protected::profile::remove_education))
        .route("/posts", post(protected::posts::create).get(protected::posts::list))
        .route("/posts/:id", get(protected::posts::get).delete(protected::posts::delete))
        .route("/posts/like/:id", put(protected::posts::like))
        .route("/posts/unlike/:id", put(protected::posts::unlike))
        .route("/posts/comment/:id", post(protected::posts::add_comment))
        .route("/posts/comment/:id/:comment_id", delete(protected::posts::remove_comment))
        .route_layer(auth());

    // Paths shared by a public and a protected method; the layer only wraps
    // the methods added before it
    let mixed_routes = Router::new()
        .route(
            "/auth",
            get(protected::session::whoami)
                .route_layer(auth())
                .post(public::session::login),
        )
        .route(
            "/profile",
            post(protected::profile::upsert)
                .delete(protected::profile::delete_account)
                .route_layer(auth())
                .get(public::profiles::list),
        );

    public_routes.merge(protected_routes).merge(mixed_routes)
}

/// `None` when CORS is disabled. A `*` entry allows any origin.
pub fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }

    let allow_origin = if security.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = security
            .cors_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                HeaderName::from_static(LEGACY_TOKEN_HEADER),
            ])
            .expose_headers(Any),
    )
}

async fn root() -> Json<serde_json::Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "DevConnect API",
            "version": version,
            "endpoints": {
                "users": "/api/users (public - registration)",
                "auth": "/api/auth (POST public - login, GET protected - current user)",
                "profile": "/api/profile[/me|/user/:user_id|/github/:username|/experience|/education] (mixed)",
                "posts": "/api/posts[/:id|/like/:id|/unlike/:id|/comment/:id[/:comment_id]] (protected)",
                "health": "/health (public)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "errors": [],
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
