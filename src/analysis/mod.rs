//! The three-stage analysis core.
//!
//! - [`overview`]: stage 1, one call over all headlines
//! - [`extract`]: key events pulled from the overview
//! - [`deep_dive`]: stage 2, concurrent per-event analyses
//! - [`synthesis`]: stage 3, retried and degradable final report
//! - [`pipeline`]: sequences the stages
//! - [`prompts`]: prompt templates and fallback texts

pub mod deep_dive;
pub mod extract;
pub mod overview;
pub mod pipeline;
pub mod prompts;
pub mod synthesis;
