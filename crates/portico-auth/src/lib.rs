//! Portico Auth — token issuance and verification, password and SSO
//! login, session guarding, refresh, and the access-request workflow.

pub mod config;
pub mod error;
pub mod guard;
pub mod local;
pub mod password;
pub mod provider;
pub mod refresh;
pub mod reset;
pub mod sso;
pub mod token;
pub mod workflow;

pub use config::AuthConfig;
pub use error::AuthError;
pub use guard::SessionGuard;
pub use local::{LocalAuthenticator, LoginInput, TokenPair};
pub use provider::{HttpIdentityProvider, IdentityProvider, OAuthConfig};
pub use refresh::{IssuedToken, RefreshFlow};
pub use reset::PasswordResetFlow;
pub use sso::{SsoExchanger, SsoLogin};
pub use token::{Claims, TokenCodec};
pub use workflow::{AccessRequestWorkflow, Decision, FileRequestInput};
