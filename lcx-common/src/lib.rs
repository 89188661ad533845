//! # LCX Common Library
//!
//! Shared code for the license compliance export services:
//! - Database schema initialization and models
//! - Data access for uploads, agents, licenses, clearing decisions,
//!   copyrights and the Software Heritage cache
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
