// Evaluation pass: score every unscored answer of a session against a
// generated reference answer, then mark the session analyzed.

pub mod analyze;
pub mod handlers;
pub mod reference_cache;
pub mod scoring;
