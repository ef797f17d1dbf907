//! Cycle planner: client orchestrator for a cycle-aware scheduling
//! assistant.

pub mod api;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod navigation;
pub mod planning;
pub mod profile;
pub mod resume;
pub mod shell;
pub mod store;
pub mod suggestions;
pub mod timestamp;
pub mod wizard;
