//! # gamerec Common Library
//!
//! Shared code for the gamerec cleaner and trainer:
//! - Error type and result alias
//! - Configuration loading (CLI → ENV → TOML → defaults)
//! - Time helpers

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
