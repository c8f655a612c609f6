//! Application state shared by the top-level handlers.

use coursegate_api_purchases::PurchasesState;
use coursegate_db::DbPool;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// State of the purchase routes, merged in by the router.
    pub purchases: PurchasesState,
    pub startup_time: Arc<Instant>,
}

impl AppState {
    pub fn new(db: DbPool, purchases: PurchasesState) -> Self {
        Self {
            db,
            purchases,
            startup_time: Arc::new(Instant::now()),
        }
    }

    #[must_use]
    pub fn uptime_seconds(&self) -> u64 {
        self.startup_time.elapsed().as_secs()
    }
}
