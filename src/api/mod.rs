//! API Module
//!
//! HTTP handlers and routing for the proxy REST API.
//!
//! # Endpoints
//! - `GET /documents/:id` - Cached lookup by document id
//! - `GET /documents/:type/:field/:value` - Cached lookup by field value
//! - `POST /search` - Uncached search
//! - `POST /refresh` - Re-read the master ref now
//! - `DELETE /cache` - Drop every cached entry
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
