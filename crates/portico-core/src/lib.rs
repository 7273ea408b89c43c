//! Portico Core — domain models, store trait contracts, and
//! collaborator traits shared across all crates.

pub mod activity;
pub mod error;
pub mod models;
pub mod notify;
pub mod repository;

pub use activity::ActivityLogger;
pub use error::{PorticoError, PorticoResult};
pub use notify::{Mailer, TemplatedEmail};
