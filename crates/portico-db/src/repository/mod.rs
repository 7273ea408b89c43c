//! SurrealDB repository implementations.

mod access_request;
mod grant;
mod user;

pub use access_request::SurrealAccessRequestRepository;
pub use grant::SurrealGrantRepository;
pub use user::SurrealUserDirectory;
