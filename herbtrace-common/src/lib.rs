//! # HerbTrace Common Library
//!
//! Shared infrastructure for the HerbTrace services:
//! - Error and result types
//! - Configuration loading and data folder resolution
//! - SQLite database initialization and lock-contention retry
//! - Timestamp and text helpers

pub mod config;
pub mod db;
pub mod error;
pub mod text;
pub mod time;

pub use error::{Error, Result};
