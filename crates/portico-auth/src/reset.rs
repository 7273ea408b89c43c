//! Password reset — the forgot-password entry point.
//!
//! The endpoint reports success whether or not the address maps to an
//! account, so responses carry no account-existence signal. The reset
//! link carries a short-lived signed token.

use std::sync::Arc;

use chrono::Utc;
use portico_core::error::PorticoResult;
use portico_core::models::user::AuthProvider;
use portico_core::notify::{Mailer, TemplatedEmail};
use portico_core::repository::UserDirectory;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AuthConfig;
use crate::token::TokenCodec;

/// Signed contents of a reset link.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct PasswordResetFlow<U: UserDirectory, M: Mailer> {
    users: U,
    mailer: M,
    codec: Arc<TokenCodec>,
    config: AuthConfig,
}

impl<U: UserDirectory, M: Mailer> PasswordResetFlow<U, M> {
    pub fn new(users: U, mailer: M, codec: Arc<TokenCodec>, config: AuthConfig) -> Self {
        Self {
            users,
            mailer,
            codec,
            config,
        }
    }

    /// Mail a reset link if `email` belongs to a local-credential
    /// account. Always returns Ok: unknown addresses, SSO-only
    /// accounts and delivery failures all look identical to the
    /// caller.
    pub async fn request_reset(&self, email: &str) -> PorticoResult<()> {
        let user = match self.users.find_by_email(email).await {
            Ok(Some(user)) => user,
            Ok(None) => return Ok(()),
            Err(e) => {
                warn!(error = %e, "reset lookup failed");
                return Ok(());
            }
        };

        // SSO accounts have no usable password; their hash is random
        // filler.
        if user.auth_provider != AuthProvider::Local {
            return Ok(());
        }

        let now = Utc::now().timestamp();
        let token = match self.codec.issue_custom(&ResetClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            iat: now,
            exp: now + self.config.reset_token_ttl_secs as i64,
        }) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "reset token issuance failed");
                return Ok(());
            }
        };

        let mail = TemplatedEmail {
            subject: "Password reset".into(),
            greeting: "Hello,".into(),
            recipient_name: format!("{} {}", user.first_name, user.last_name),
            key_values: vec![(
                "Reset link".into(),
                format!("{}?token={}", self.config.reset_link_base, token),
            )],
            to: vec![user.email.clone()],
            cc: Vec::new(),
            bcc: Vec::new(),
        };

        if let Err(e) = self.mailer.send_templated(&mail).await {
            warn!(error = %e, "reset mail delivery failed");
        }

        Ok(())
    }
}
