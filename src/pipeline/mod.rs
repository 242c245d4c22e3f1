pub mod assertion; // Rule layer: sanitize, trigger lexicon, matcher, resolver, batch orchestrator
pub mod model; // Statistical model collaborator (inference server client)
