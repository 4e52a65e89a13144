//! Shared utilities for brcmcp.
//!
//! This crate provides common utilities used across the brcmcp workspace:
//! - Logging setup with tracing
//! - Cryptographically strong identifier and secret minting

pub mod id;
pub mod log;

pub use id::{new_auth_code, new_client_id, new_client_secret};
