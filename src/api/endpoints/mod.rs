//! API endpoint handlers.

pub mod health;
pub mod model;
pub mod predict;
