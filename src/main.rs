use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, patch, post, put},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use netzwaechter_portal::config::{config, AppConfig};
use netzwaechter_portal::database::manager::DatabaseManager;
use netzwaechter_portal::handlers;
use netzwaechter_portal::middleware::session_auth_middleware;
use netzwaechter_portal::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SUPERADMIN_*, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("netzwaechter_portal=info,tower_http=info")),
        )
        .init();

    let config = config();
    tracing::info!("Starting Netzwächter portal in {:?} mode", config.environment);

    if config.database.run_migrations {
        // A missing database must not keep the portal from serving superadmin logins
        if let Err(e) = DatabaseManager::run_migrations().await {
            tracing::error!("Skipping migrations: {}", e);
        }
    }

    let state = AppState::from_config(config)?;
    spawn_purge_task(state.clone(), Duration::from_secs(config.session.purge_interval_secs.max(1)));

    let app = app(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Netzwächter portal listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close_all().await;
    Ok(())
}

fn app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Session-protected API
        .merge(protected_routes().route_layer(from_fn_with_state(state.clone(), session_auth_middleware)))
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.security.cors_origins))
                .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes)),
        )
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use handlers::public::auth;

    Router::new()
        .route("/api/auth/login", post(auth::login_post))
        .route("/api/auth/superadmin-login", post(auth::superadmin_login_post))
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(object_routes())
        .merge(settings_routes())
        .merge(user_routes())
        .merge(admin_routes())
        .merge(monitoring_routes())
}

fn auth_routes() -> Router<AppState> {
    use handlers::protected::auth;

    Router::new()
        .route("/api/auth/me", get(auth::me_get))
        .route("/api/auth/heartbeat", post(auth::heartbeat_post))
        .route("/api/auth/logout", post(auth::logout_post))
}

fn object_routes() -> Router<AppState> {
    use handlers::protected::objects;

    Router::new()
        .route("/api/objects", get(objects::objects_get).post(objects::object_post))
        .route(
            "/api/objects/:id",
            get(objects::object_get)
                .put(objects::object_put)
                .delete(objects::object_delete),
        )
        .route("/api/objects/:id/children", get(objects::object_children_get))
        .route("/api/objects/:id/coordinates", patch(objects::object_coordinates_patch))
        .route("/api/objects/:id/meter", patch(objects::object_meter_patch))
        .route("/api/objects/by-objectid/:objectid", get(objects::object_by_objectid_get))
        .route("/api/objects/meter/:objectid", get(objects::object_meter_get))
        .route("/api/objects/hierarchy/:mandant_id", get(objects::object_hierarchy_get))
}

fn settings_routes() -> Router<AppState> {
    use handlers::protected::settings;

    Router::new()
        .route("/api/settings", get(settings::settings_get).post(settings::setting_post))
        .route("/api/settings/by-key", get(settings::setting_by_key_get))
        .route("/api/settings/thresholds", get(settings::thresholds_get))
        .route("/api/settings/clear", axum::routing::delete(settings::settings_clear_delete))
        .route("/api/settings/export", post(settings::settings_export_post))
        .route("/api/settings/import", post(settings::settings_import_post))
        .route(
            "/api/settings/:id",
            get(settings::setting_get)
                .put(settings::setting_put)
                .delete(settings::setting_delete),
        )
}

fn user_routes() -> Router<AppState> {
    use handlers::protected::users;

    Router::new()
        .route("/api/users", get(users::users_get).post(users::user_post))
        .route(
            "/api/users/:id",
            get(users::user_get)
                .patch(users::user_patch)
                .delete(users::user_delete),
        )
        .route("/api/users/:id/change-password", post(users::change_password_post))
        .route("/api/users/profiles/list", get(users::profiles_get))
        .route("/api/users/profiles", post(users::profile_post))
        .route(
            "/api/users/profiles/:id",
            put(users::profile_put).delete(users::profile_delete),
        )
}

fn admin_routes() -> Router<AppState> {
    use handlers::protected::{mandants, object_groups};

    Router::new()
        .route("/api/mandants", get(mandants::mandants_get).post(mandants::mandant_post))
        .route(
            "/api/mandants/:id",
            patch(mandants::mandant_patch).delete(mandants::mandant_delete),
        )
        .route(
            "/api/object-groups",
            get(object_groups::object_groups_get).post(object_groups::object_group_post),
        )
        .route(
            "/api/object-groups/:id",
            patch(object_groups::object_group_patch).delete(object_groups::object_group_delete),
        )
}

fn monitoring_routes() -> Router<AppState> {
    use handlers::protected::{grafana, monitoring};

    Router::new()
        .route("/api/temperature-analysis", get(monitoring::temperature_analysis_get))
        .route(
            "/api/temperature-analysis/:object_id",
            get(monitoring::temperature_analysis_object_get),
        )
        .route("/api/monitoring/dashboard", get(monitoring::dashboard_get))
        .route("/api/grafana/config", get(grafana::grafana_config_get))
        .route("/api/grafana/url", get(grafana::grafana_url_get))
}

/// Credentialed CORS: configured origins, or mirror the caller when none are set
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origin = if origins.is_empty() {
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn spawn_purge_task(state: AppState, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            match state.sessions.purge_expired(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!("Purged {} expired sessions", purged),
                Err(e) => tracing::warn!("Session purge failed: {}", e),
            }
            state.limiter.prune().await;
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Netzwächter portal",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "public_auth": "/api/auth/login, /api/auth/superadmin-login",
                "auth": "/api/auth/me, /api/auth/heartbeat, /api/auth/logout",
                "objects": "/api/objects[/:id]",
                "settings": "/api/settings[/:id]",
                "users": "/api/users[/:id], /api/users/profiles",
                "mandants": "/api/mandants[/:id]",
                "object_groups": "/api/object-groups[/:id]",
                "monitoring": "/api/temperature-analysis[/:objectId], /api/monitoring/dashboard",
                "grafana": "/api/grafana/config, /api/grafana/url",
            }
        }
    }))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
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
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
