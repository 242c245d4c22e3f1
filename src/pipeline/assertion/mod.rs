//! Hybrid assertion decision layer.
//!
//! The statistical model labels each sentence; this layer inspects the sentence
//! for lexical cues the model is known to mishandle and, when one fires, forces
//! the rule's label.
//!
//! ```text
//! raw sentence → sanitize → (model) → match_sentence → resolve → AssertionResult
//! ```
//!
//! Everything here is pure and synchronous. The only shared state is the
//! read-only trigger lexicon.

pub mod types;
pub mod sanitize;
pub mod redact;
pub mod lexicon;
pub mod matcher;
pub mod resolve;
pub mod orchestrator;

pub use types::*;
pub use sanitize::{sanitize, sanitize_sentence, DEFAULT_MAX_SENTENCE_LENGTH};
pub use redact::mask_identifiers;
pub use lexicon::{builtin_rules, TriggerLexicon};
pub use matcher::{match_builtin, match_sentence};
pub use resolve::resolve;
pub use orchestrator::{apply_pipeline, AssertionPipeline};
