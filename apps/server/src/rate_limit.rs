use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ApiResponse;

type TierMap = DashMap<&'static str, (RateLimitConfig, DashMap<IpAddr, Vec<Instant>>)>;

/// Configuration for a single rate limit tier.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed within the sliding window.
    pub max_requests: u32,
    /// Duration of the sliding window.
    pub window: Duration,
}

/// In-memory per-IP rate limiter using sliding window counters.
///
/// Each tier ("public", "auth", "booking", "barber") has its own config
/// and tracking map; keys are client IPs, values are request timestamps.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tiers: Arc<TierMap>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            tiers: Arc::new(DashMap::new()),
        }
    }

    /// Register a named tier with its configuration.
    pub fn add_tier(&self, name: &'static str, config: RateLimitConfig) {
        self.tiers.insert(name, (config, DashMap::new()));
    }

    /// Check whether a request from `ip` is allowed under `tier`.
    ///
    /// Returns `Ok(())` if allowed, `Err(retry_after_secs)` otherwise.
    pub fn check(&self, tier: &'static str, ip: IpAddr) -> Result<(), u64> {
        let tier_entry = self.tiers.get(tier).expect("unknown rate limit tier");
        let (config, ip_map) = tier_entry.value();
        let now = Instant::now();
        let window_start = now - config.window;

        let mut entry = ip_map.entry(ip).or_insert_with(Vec::new);
        entry.retain(|t| *t > window_start);

        if entry.len() >= config.max_requests as usize {
            // Time until the oldest request falls out of the window
            let oldest = entry[0];
            let retry_after = (oldest + config.window)
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        entry.push(now);
        Ok(())
    }

    /// Remove entries older than 2× the tier window. Called periodically
    /// from a background task.
    pub fn cleanup(&self) {
        let now = Instant::now();
        for tier_entry in self.tiers.iter() {
            let (config, ip_map) = tier_entry.value();
            let cutoff = config.window * 2;
            ip_map.retain(|_ip, timestamps| {
                timestamps.retain(|t| now.duration_since(*t) < cutoff);
                !timestamps.is_empty()
            });
        }
    }
}

/// Client IP from X-Forwarded-For (reverse proxy) or ConnectInfo.
pub fn extract_client_ip(req: &Request) -> IpAddr {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first_ip) = forwarded.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

fn too_many_requests(retry_after: u64) -> Response {
    let body = ApiResponse::<()>::error(format!(
        "Too many requests. Try again in {} seconds",
        retry_after
    ));
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", retry_after.to_string())],
        Json(body),
    )
        .into_response()
}

// ── Middleware functions (one per tier) ──

/// Public read-only endpoints (60 req/min).
pub async fn rate_limit_public(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check("public", ip).map_err(too_many_requests)?;
    Ok(next.run(req).await)
}

/// Authenticated client endpoints (30 req/min).
pub async fn rate_limit_auth(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check("auth", ip).map_err(too_many_requests)?;
    Ok(next.run(req).await)
}

/// Booking submission (5 req/5min — strictest).
pub async fn rate_limit_booking(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check("booking", ip).map_err(too_many_requests)?;
    Ok(next.run(req).await)
}

/// Barber-side management endpoints (120 req/min).
pub async fn rate_limit_barber(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check("barber", ip).map_err(too_many_requests)?;
    Ok(next.run(req).await)
}

// ── Tests ──
