//! SQLite backend for the marketplace engine.
//!
//! [`SqliteDatabase`] implements every backend trait in [`crate::traits`]. The low-level queries live in [`db`] as
//! free functions over a `&mut SqliteConnection`, so they can be composed inside a single transaction.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
