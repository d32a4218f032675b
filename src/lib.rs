//! CS Grader - grading gateway for pseudocode submissions
//!
//! Converts uploaded questions and answers to text, translates pseudocode to
//! Python with generated pytest cases, grades the logic against stored
//! reference solutions, and runs code in throwaway Docker containers.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use config::Settings;
pub use routes::{configure_routes, AppState};
