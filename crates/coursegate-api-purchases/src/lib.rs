//! HTTP surface of the purchase engine.
//!
//! - `POST|GET /webhooks/{tenant_slug}/{platform}`: provider deliveries
//! - `POST /sync-purchases`: reconcile the caller's purchases now
//! - `POST /sessions/login`: login hook, schedules a background sweep
//! - `/admin/webhook-logs[...]`: operator listing, inspection and replay
//!
//! Session routes expect an HS256 bearer token (see [`session`]).

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod session;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use router::{purchases_router, PurchasesState};
pub use session::{AdminSession, Session, SessionClaims, SessionKeys, ADMIN_ROLE};
