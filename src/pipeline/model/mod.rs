//! The statistical model collaborator.
//!
//! Inference itself lives outside this crate (a text-classification server).
//! This module defines the seam the API layer calls through and an HTTP client
//! for that server.

pub mod types;
pub mod client;

pub use types::*;
pub use client::*;

use thiserror::Error;

use crate::pipeline::assertion::InvalidScore;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model is not loaded")]
    NotReady,

    #[error("Inference server is not reachable at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Inference server returned error (status {status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Unknown model label: {0}")]
    UnknownLabel(String),

    #[error(transparent)]
    InvalidScore(#[from] InvalidScore),

    #[error("Model returned {received} predictions for {expected} sentences")]
    CountMismatch { expected: usize, received: usize },
}
