//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Audit logger, sees the final status of every request
//! 2. Rate limiter, rejects early
//! 3. API-key auth (protected routes only)

pub mod audit;
pub mod auth;
pub mod rate;
