use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ApiResponse;

type TierMap = DashMap<Tier, (RateLimitConfig, DashMap<IpAddr, Vec<Instant>>)>;

// ── Configuration ──

/// Route groups with their own request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Read-only customer endpoints.
    Public,
    /// Appointment creation.
    Booking,
    /// Staff password login.
    Login,
    /// Staff endpoints behind the session token.
    Admin,
}

impl Tier {
    fn default_config(self) -> RateLimitConfig {
        let (max_requests, secs) = match self {
            Tier::Public => (60, 60),
            Tier::Booking => (5, 300),
            Tier::Login => (10, 300),
            Tier::Admin => (120, 60),
        };
        RateLimitConfig {
            max_requests,
            window: Duration::from_secs(secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed within the sliding window.
    pub max_requests: u32,
    pub window: Duration,
}

// ── Core Rate Limiter ──

/// In-memory per-IP rate limiter using sliding window counters.
///
/// Each tier has its own config and tracking map. Keys are client IP
/// addresses; values are the timestamps of recent requests.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    tiers: Arc<TierMap>,
}

impl RateLimiter {
    /// An empty limiter; tiers without a config are not limited.
    pub fn new() -> Self {
        Self {
            tiers: Arc::new(DashMap::new()),
        }
    }

    /// Public 60/min, booking 5/5min, login 10/5min, admin 120/min.
    pub fn with_default_tiers() -> Self {
        let limiter = Self::new();
        for tier in [Tier::Public, Tier::Booking, Tier::Login, Tier::Admin] {
            limiter.add_tier(tier, tier.default_config());
        }
        limiter
    }

    pub fn add_tier(&self, tier: Tier, config: RateLimitConfig) {
        self.tiers.insert(tier, (config, DashMap::new()));
    }

    /// Returns `Ok(())` if allowed, `Err(retry_after_secs)` if rate limited.
    pub fn check(&self, tier: Tier, ip: IpAddr) -> Result<(), u64> {
        let Some(tier_entry) = self.tiers.get(&tier) else {
            return Ok(());
        };
        let (config, ip_map) = tier_entry.value();
        let now = Instant::now();

        let mut entry = ip_map.entry(ip).or_default();
        entry.retain(|t| now.duration_since(*t) < config.window);

        if entry.len() >= config.max_requests as usize {
            // Time until the oldest request leaves the window
            let retry_after = entry
                .first()
                .map(|oldest| (*oldest + config.window).saturating_duration_since(now))
                .unwrap_or(config.window)
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        entry.push(now);
        Ok(())
    }

    /// Remove stale entries (older than 2× window) from all tiers.
    /// Call periodically from a background task.
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

// ── IP Extraction ──

/// Client IP from X-Forwarded-For (reverse proxy) or the socket address.
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
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

// ── 429 Response Builder ──

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

async fn limit(limiter: &RateLimiter, tier: Tier, req: Request, next: Next) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check(tier, ip).map_err(|retry_after| {
        tracing::warn!("rate limited {:?} request from {}", tier, ip);
        too_many_requests(retry_after)
    })?;
    Ok(next.run(req).await)
}

// ── Middleware Functions (one per tier) ──

pub async fn rate_limit_public(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    limit(&limiter, Tier::Public, req, next).await
}

pub async fn rate_limit_booking(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    limit(&limiter, Tier::Booking, req, next).await
}

pub async fn rate_limit_login(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    limit(&limiter, Tier::Login, req, next).await
}

pub async fn rate_limit_admin(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    limit(&limiter, Tier::Admin, req, next).await
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn test_ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn test_allows_requests_under_limit() {
        let limiter = RateLimiter::new();
        limiter.add_tier(
            Tier::Booking,
            RateLimitConfig {
                max_requests: 3,
                window: Duration::from_secs(60),
            },
        );
        let ip = test_ip(1);
        assert!(limiter.check(Tier::Booking, ip).is_ok());
        assert!(limiter.check(Tier::Booking, ip).is_ok());
        assert!(limiter.check(Tier::Booking, ip).is_ok());
    }

    #[test]
    fn test_rejects_over_limit() {
        let limiter = RateLimiter::new();
        limiter.add_tier(
            Tier::Booking,
            RateLimitConfig {
                max_requests: 2,
                window: Duration::from_secs(60),
            },
        );
        let ip = test_ip(1);
        assert!(limiter.check(Tier::Booking, ip).is_ok());
        assert!(limiter.check(Tier::Booking, ip).is_ok());
        assert!(limiter.check(Tier::Booking, ip).is_err());
    }

    #[test]
    fn test_returns_retry_after() {
        let limiter = RateLimiter::new();
        limiter.add_tier(
            Tier::Booking,
            RateLimitConfig {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
        );
        let ip = test_ip(1);
        limiter.check(Tier::Booking, ip).unwrap();
        let retry_after = limiter.check(Tier::Booking, ip).unwrap_err();
        assert!(retry_after >= 1 && retry_after <= 60);
    }

    #[test]
    fn test_different_ips_independent() {
        let limiter = RateLimiter::new();
        limiter.add_tier(
            Tier::Booking,
            RateLimitConfig {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
        );
        let ip1 = test_ip(1);
        let ip2 = test_ip(2);
        assert!(limiter.check(Tier::Booking, ip1).is_ok());
        assert!(limiter.check(Tier::Booking, ip1).is_err()); // exhausted
        assert!(limiter.check(Tier::Booking, ip2).is_ok()); // other client
    }

    #[test]
    fn test_different_tiers_independent() {
        let limiter = RateLimiter::new();
        limiter.add_tier(
            Tier::Public,
            RateLimitConfig {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
        );
        limiter.add_tier(
            Tier::Admin,
            RateLimitConfig {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
        );
        let ip = test_ip(1);
        assert!(limiter.check(Tier::Public, ip).is_ok());
        assert!(limiter.check(Tier::Public, ip).is_err());
        assert!(limiter.check(Tier::Admin, ip).is_ok()); // separate budget
    }

    #[test]
    fn test_window_expiry_allows_again() {
        let limiter = RateLimiter::new();
        limiter.add_tier(
            Tier::Booking,
            RateLimitConfig {
                max_requests: 1,
                window: Duration::from_millis(100),
            },
        );
        let ip = test_ip(1);
        assert!(limiter.check(Tier::Booking, ip).is_ok());
        assert!(limiter.check(Tier::Booking, ip).is_err());

        sleep(Duration::from_millis(150));

        assert!(limiter.check(Tier::Booking, ip).is_ok()); // window expired
    }

    #[test]
    fn test_cleanup_removes_stale_entries() {
        let limiter = RateLimiter::new();
        limiter.add_tier(
            Tier::Booking,
            RateLimitConfig {
                max_requests: 10,
                window: Duration::from_millis(50),
            },
        );
        let ip = test_ip(1);
        limiter.check(Tier::Booking, ip).unwrap();

        sleep(Duration::from_millis(120)); // > 2× window

        limiter.cleanup();

        // Entry should be gone; new request creates fresh entry
        assert!(limiter.check(Tier::Booking, ip).is_ok());
    }

    #[test]
    fn test_cleanup_preserves_active_entries() {
        let limiter = RateLimiter::new();
        limiter.add_tier(
            Tier::Booking,
            RateLimitConfig {
                max_requests: 2,
                window: Duration::from_secs(60),
            },
        );
        let ip = test_ip(1);
        limiter.check(Tier::Booking, ip).unwrap();

        limiter.cleanup(); // should NOT remove active entries

        limiter.check(Tier::Booking, ip).unwrap();
        assert!(limiter.check(Tier::Booking, ip).is_err()); // limit is 2, both still count
    }

    #[test]
    fn test_unconfigured_tier_not_limited() {
        let limiter = RateLimiter::new();
        let ip = test_ip(1);
        for _ in 0..500 {
            assert!(limiter.check(Tier::Public, ip).is_ok());
        }
    }

    #[test]
    fn test_default_booking_tier() {
        let limiter = RateLimiter::with_default_tiers();
        let ip = test_ip(7);
        for _ in 0..5 {
            assert!(limiter.check(Tier::Booking, ip).is_ok());
        }
        let retry_after = limiter.check(Tier::Booking, ip).unwrap_err();
        assert!(retry_after > 60 && retry_after <= 300);
        assert!(limiter.check(Tier::Login, ip).is_ok());
    }

    #[test]
    fn test_forwarded_for_wins() {
        let req = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&req), "203.0.113.9".parse::<IpAddr>().unwrap());

        let bare = axum::http::Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(extract_client_ip(&bare), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
}
