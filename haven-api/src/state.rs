use std::sync::Arc;
use std::time::Duration;
use haven_booking::{BookingTransactor, ProjectionService, RetryPolicy, SlotScheduler};
use haven_core::SlotStore;
use haven_shared::models::SlotAvailabilityEvent;
use haven_store::app_config::BookingConfig;
use haven_store::RedisClient;
use tokio::sync::broadcast;
use crate::metrics::ApiMetrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct RateLimit {
    pub redis: Arc<RedisClient>,
    pub per_minute: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SlotStore>,
    pub transactor: BookingTransactor,
    pub scheduler: SlotScheduler,
    pub projections: ProjectionService,
    /// Absent means no rate limiting.
    pub rate_limit: Option<RateLimit>,
    pub sse_tx: broadcast::Sender<SlotAvailabilityEvent>,
    pub auth: AuthConfig,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SlotStore>,
        booking: &BookingConfig,
        auth: AuthConfig,
        metrics: ApiMetrics,
    ) -> Self {
        let policy = RetryPolicy::new(booking.max_attempts, Duration::from_millis(booking.retry_backoff_ms));
        let (sse_tx, _) = broadcast::channel(100);

        Self {
            transactor: BookingTransactor::new(store.clone(), policy),
            scheduler: SlotScheduler::new(store.clone()),
            projections: ProjectionService::new(store.clone()),
            store,
            rate_limit: None,
            sse_tx,
            auth,
            metrics: Arc::new(metrics),
        }
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, per_minute: i64) -> Self {
        self.rate_limit = Some(RateLimit { redis, per_minute });
        self
    }
}
