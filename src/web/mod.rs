//! HTTP API for hemostore.
//!
//! Exposes multipart uploads for media and reports, the retrieval route for
//! stored files, and health/OpenAPI endpoints.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
