//! # API Shared
//!
//! Shared utilities and definitions for the regulation APIs.
//!
//! Contains:
//! - Request/response DTOs (`dto` module) with their OpenAPI schemas
//! - Shared services like `HealthService`
//! - Authentication utilities
//!
//! Used by `api-rest` and the CLI for common functionality.

pub mod auth;
pub mod dto;
pub mod health;

pub use health::{HealthRes, HealthService};
