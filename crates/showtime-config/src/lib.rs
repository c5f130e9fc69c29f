//! # Showtime Config
//!
//! Layered configuration for Showtime: TOML files under `config/`, a `.env`
//! file, then `SHOWTIME__*` environment variables, validated before use.

mod app_config;
mod jobs_config;
mod loader;
mod validation;

pub use app_config::*;
pub use jobs_config::*;
pub use loader::*;
pub use validation::*;
