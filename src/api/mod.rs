//! HTTP surface of the assertion service.
//!
//! Routes are split into public (`/`, `/health`) and protected (prediction,
//! model info, metrics) groups. Protected routes require an API key whenever
//! keys are configured.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::build_router;
pub use server::{serve, start_server, ServerHandle};
pub use types::ApiContext;
