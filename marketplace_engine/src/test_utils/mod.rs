//! Helpers for tests that need a real, throw-away SQLite database.
pub mod prepare_env;
