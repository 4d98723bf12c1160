//! HTTP surface: envelope, query parsing, handlers and router assembly.

pub mod envelope;
pub mod handlers;
pub mod params;
pub mod routes;

pub use envelope::{ApiFailure, HttpResponse};
pub use routes::create_router;
