//! API Module
//!
//! HTTP handlers and routing for the admin surface.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Statistics of both caches
//! - `POST /invalidate` - Drop cached data of one file
//! - `DELETE /cache` - Clear both caches

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
