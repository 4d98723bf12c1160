//! HTTP gateway for the libris library backend.
//!
//! A thin axum surface over the service clients: CRUD handlers forward a
//! single RPC each, list reads go through the read batcher, and the global
//! middleware stack adds permissive CORS plus a per-IP fixed-window rate
//! limiter.

pub mod http;
pub mod middleware;
pub mod observability;
pub mod state;

pub use state::AppState;
