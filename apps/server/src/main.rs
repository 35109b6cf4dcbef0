mod auth;
mod availability;
mod booking;
mod db;
mod handlers;
mod models;
mod rate_limit;
mod store;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rate_limit::{
    rate_limit_auth, rate_limit_barber, rate_limit_booking, rate_limit_public, RateLimitConfig,
    RateLimiter,
};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub jwt_secret: String,
    pub started_at: Instant,
}

/// Rate limit cleanup interval (seconds).
const RATE_LIMIT_CLEANUP_SECS: u64 = 300;
/// Elapsed-appointment sweep interval (seconds).
const APPOINTMENT_SWEEP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // ── Required env vars ──
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:navalha.db?mode=rwc".into());
    let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");

    // ── Tracing: console + daily-rolled file log ──
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".into());
    let file_appender = tracing_appender::rolling::daily(&log_dir, "navalha.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();

    // ── Optional env vars ──
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let cors_origin = std::env::var("CORS_ORIGIN").unwrap_or_default();

    // ── Database ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    db::run_migrations(&pool).await?;

    let state = Arc::new(AppState {
        db: pool,
        jwt_secret,
        started_at: Instant::now(),
    });

    // ── Background task: mark elapsed appointments completed ──
    let sweep_db = state.db.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(APPOINTMENT_SWEEP_SECS));
        loop {
            interval.tick().await;
            let now = chrono::Local::now().naive_local();
            match store::complete_elapsed_appointments(&sweep_db, now).await {
                Ok(0) => {}
                Ok(n) => tracing::info!("marked {} appointments completed", n),
                Err(e) => tracing::error!("appointment sweep failed: {}", e),
            }
        }
    });

    // ── Rate limiter ──
    let rate_limiter = RateLimiter::new();
    rate_limiter.add_tier(
        "public",
        RateLimitConfig {
            max_requests: 60,
            window: Duration::from_secs(60),
        },
    );
    rate_limiter.add_tier(
        "auth",
        RateLimitConfig {
            max_requests: 30,
            window: Duration::from_secs(60),
        },
    );
    rate_limiter.add_tier(
        "booking",
        RateLimitConfig {
            max_requests: 5,
            window: Duration::from_secs(300),
        },
    );
    rate_limiter.add_tier(
        "barber",
        RateLimitConfig {
            max_requests: 120,
            window: Duration::from_secs(60),
        },
    );

    // ── Background task: cleanup stale rate limit entries ──
    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    // ── CORS: whitelist CORS_ORIGIN when configured, otherwise allow any ──
    let cors = if !cors_origin.is_empty() {
        let origins: Vec<axum::http::HeaderValue> = vec![
            cors_origin.parse().expect("CORS_ORIGIN must be a valid origin"),
            "http://localhost:5173".parse().unwrap(), // Vite dev server
        ];
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // ── Router (5 groups with per-group rate limits) ──

    // 1. No-limit: health checks
    let no_limit_routes = Router::new().route("/api/health", get(handlers::health::health));

    // 2. Public: read-only browse/search endpoints (no auth, 60 req/min)
    let public_routes = Router::new()
        .route(
            "/api/barber_profiles",
            get(handlers::public::list_barber_profiles),
        )
        .route(
            "/api/establishments/{id}",
            get(handlers::public::establishment_details),
        )
        .route(
            "/api/establishments/{id}/services",
            get(handlers::public::list_services),
        )
        .route(
            "/api/establishments/{id}/slots",
            get(handlers::public::list_slots),
        )
        .route(
            "/api/appointments",
            get(handlers::public::appointments_in_range),
        )
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_public));

    // 3. Booking submission: strictest limit (5 req/5min)
    let booking_routes = Router::new()
        .route(
            "/api/appointments",
            post(handlers::booking::create_appointment),
        )
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_booking));

    // 4. Auth: login + authenticated client endpoints (30 req/min)
    let auth_routes = Router::new()
        .route("/api/login", post(handlers::public::login))
        .route(
            "/api/appointments/my",
            get(handlers::booking::my_appointments),
        )
        .route(
            "/api/appointments/{id}",
            delete(handlers::booking::cancel_appointment),
        )
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_auth));

    // 5. Barber-side management (120 req/min)
    let barber_routes = Router::new()
        .route(
            "/api/barber_profiles/me",
            get(handlers::barber::get_my_profile)
                .post(handlers::barber::create_profile)
                .put(handlers::barber::update_profile),
        )
        .route(
            "/api/establishments/me",
            get(handlers::barber::get_my_establishment)
                .put(handlers::barber::upsert_establishment),
        )
        .route(
            "/api/services",
            get(handlers::barber::list_my_services).post(handlers::barber::create_service),
        )
        .route(
            "/api/services/{id}",
            put(handlers::barber::update_service).delete(handlers::barber::delete_service),
        )
        .route(
            "/api/employees",
            get(handlers::barber::list_employees).post(handlers::barber::create_employee),
        )
        .route(
            "/api/employees/{id}",
            delete(handlers::barber::delete_employee),
        )
        .route("/api/appointments/agenda", get(handlers::booking::agenda))
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_barber));

    let app = Router::new()
        .merge(no_limit_routes)
        .merge(public_routes)
        .merge(booking_routes)
        .merge(auth_routes)
        .merge(barber_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Navalha server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
