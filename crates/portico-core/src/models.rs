//! Domain models for Portico.
//!
//! These are the core types shared across all crates.

pub mod access_request;
pub mod grant;
pub mod portal;
pub mod user;
