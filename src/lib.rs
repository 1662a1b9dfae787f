// Public API - the runner, the error taxonomy, uid derivation, preferences
pub mod error;
pub mod prefs;
pub mod runner;
pub mod uid;

// Internal modules - organized by pipeline stage
mod config;
mod dispatch;
mod formats;
mod selectors;
mod store;
mod submit;
