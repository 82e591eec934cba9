//! Wabulk Core - Shared configuration and error types
//!
//! This crate provides:
//! - Application configuration read from the environment
//! - The common error type and `Result` alias used across the workspace

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{Result, WabulkError};
