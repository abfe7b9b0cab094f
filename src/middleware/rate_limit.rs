use actix_web::{
    Error, HttpResponse, ResponseError, Result,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::LocalBoxFuture;
use std::{
    collections::HashMap,
    net::IpAddr,
    rc::Rc,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::config::Config;
use crate::error::{AppError, AuthFailure};

/// Tracked addresses before stale windows are pruned
const CLEANUP_THRESHOLD: usize = 1024;

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window duration in seconds
    pub window_seconds: i64,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_seconds: i64) -> Self {
        Self {
            max_requests,
            window_seconds,
        }
    }

    /// Limits for the credential endpoints (signup and login)
    pub fn for_auth(config: &Config) -> Self {
        Self::new(
            config.auth_rate_limit_max_requests,
            config.auth_rate_limit_window_seconds,
        )
    }
}

#[derive(Debug, Clone)]
struct RequestTracker {
    count: u32,
    window_start: DateTime<Utc>,
}

impl RequestTracker {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Utc::now(),
        }
    }

    fn is_expired(&self, window_seconds: i64) -> bool {
        let window_duration =
            Duration::try_seconds(window_seconds).unwrap_or(Duration::seconds(60));
        Utc::now() > self.window_start + window_duration
    }

    fn increment(&mut self) {
        self.count += 1;
    }

    fn reset(&mut self) {
        self.count = 1;
        self.window_start = Utc::now();
    }
}

/// Per-IP request counters, shared by every worker
#[derive(Clone, Default)]
pub struct RateLimitStore {
    ip_trackers: Arc<Mutex<HashMap<IpAddr, RequestTracker>>>,
}

impl RateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn trackers(&self) -> MutexGuard<'_, HashMap<IpAddr, RequestTracker>> {
        // A poisoned lock only means another request panicked mid-update
        self.ip_trackers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_and_update_ip(&self, ip: IpAddr, config: &RateLimitConfig) -> bool {
        if self.trackers().len() >= CLEANUP_THRESHOLD {
            self.cleanup_expired(config.window_seconds);
        }

        let mut trackers = self.trackers();

        let tracker = trackers.entry(ip).or_insert_with(RequestTracker::new);

        if tracker.is_expired(config.window_seconds) {
            tracker.reset();
            true
        } else if tracker.count >= config.max_requests {
            false
        } else {
            tracker.increment();
            true
        }
    }

    pub fn cleanup_expired(&self, window_seconds: i64) {
        self.trackers()
            .retain(|_, tracker| !tracker.is_expired(window_seconds));
    }
}

/// Limits requests per client IP; over-limit requests get a 429 with the
/// `rate_limited` error code
pub struct RateLimitMiddleware {
    store: RateLimitStore,
    config: RateLimitConfig,
}

impl RateLimitMiddleware {
    pub fn with_store(config: RateLimitConfig, store: RateLimitStore) -> Self {
        Self { store, config }
    }

    pub fn auth(config: &Config, store: RateLimitStore) -> Self {
        Self::with_store(RateLimitConfig::for_auth(config), store)
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitService<S>;
    type InitError = ();
    type Future = futures_util::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures_util::future::ready(Ok(RateLimitService {
            service: Rc::new(service),
            store: self.store.clone(),
            config: self.config.clone(),
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    store: RateLimitStore,
    config: RateLimitConfig,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let store = self.store.clone();
        let config = self.config.clone();

        Box::pin(async move {
            let client_ip = req.peer_addr().map(|addr| addr.ip());

            if let Some(ip) = client_ip {
                if !store.check_and_update_ip(ip, &config) {
                    log::warn!("Rate limit exceeded for IP: {}", ip);
                    let response: HttpResponse =
                        AppError::Auth(AuthFailure::RateLimited).error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_request_tracker() {
        let mut tracker = RequestTracker::new();
        assert_eq!(tracker.count, 0);

        tracker.increment();
        assert_eq!(tracker.count, 1);

        tracker.reset();
        assert_eq!(tracker.count, 1);
        assert!(tracker.window_start <= Utc::now());
    }

    #[test]
    fn test_rate_limit_store() {
        let store = RateLimitStore::new();
        let config = RateLimitConfig::new(2, 60);
        let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        assert!(store.check_and_update_ip(ip, &config));
        assert!(store.check_and_update_ip(ip, &config));
        assert!(!store.check_and_update_ip(ip, &config));

        // Counters are per address
        assert!(store.check_and_update_ip(other, &config));
    }

    #[test]
    fn test_cleanup_expired() {
        let store = RateLimitStore::new();
        let config = RateLimitConfig::new(1, 1);
        let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));

        assert!(store.check_and_update_ip(ip, &config));
        assert_eq!(store.trackers().len(), 1);

        store.cleanup_expired(-1);
        assert_eq!(store.trackers().len(), 0);
    }
}
