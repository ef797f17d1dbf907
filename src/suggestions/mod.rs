//! Agent suggestions for the dashboard.

pub mod engine;
pub mod model;

pub use engine::{ApplyToken, SuggestionEngine};
pub use model::{Suggestion, SuggestionAction, SuggestionKey};
