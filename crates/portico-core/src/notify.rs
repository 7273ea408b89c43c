//! Notification collaborator contract.

use crate::error::PorticoResult;

/// A templated notification: subject, greeting, and a key/value body
/// rendered by the transport.
#[derive(Debug, Clone, Default)]
pub struct TemplatedEmail {
    pub subject: String,
    pub greeting: String,
    pub recipient_name: String,
    pub key_values: Vec<(String, String)>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

/// External mail sender. Delivery failures never roll back state
/// transitions; callers treat them as non-fatal.
pub trait Mailer: Send + Sync {
    fn send_templated(
        &self,
        email: &TemplatedEmail,
    ) -> impl Future<Output = PorticoResult<()>> + Send;
}
