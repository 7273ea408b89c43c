//! SMTP transport for workflow and password-reset notifications.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use portico_core::error::{PorticoError, PorticoResult};
use portico_core::notify::{Mailer, TemplatedEmail};

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender mailbox, e.g. `Portico <no-reply@example.com>`.
    pub from: String,
}

/// [`Mailer`] over async SMTP. Cheap to clone; the transport pools
/// connections internally.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> PorticoResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| PorticoError::Notification(format!("SMTP relay setup: {e}")))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let from = config
            .from
            .parse()
            .map_err(|e| PorticoError::Notification(format!("invalid sender address: {e}")))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn render(email: &TemplatedEmail) -> String {
        let mut body = String::new();
        body.push_str(&email.greeting);
        body.push_str("\n\n");
        body.push_str(&email.recipient_name);
        body.push_str(",\n\n");
        for (key, value) in &email.key_values {
            body.push_str(key);
            body.push_str(": ");
            body.push_str(value);
            body.push('\n');
        }
        body
    }
}

impl Mailer for SmtpMailer {
    async fn send_templated(&self, email: &TemplatedEmail) -> PorticoResult<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(email.subject.clone());

        for to in &email.to {
            let mailbox: Mailbox = to
                .parse()
                .map_err(|e| PorticoError::Notification(format!("invalid recipient: {e}")))?;
            builder = builder.to(mailbox);
        }
        for cc in &email.cc {
            let mailbox: Mailbox = cc
                .parse()
                .map_err(|e| PorticoError::Notification(format!("invalid cc: {e}")))?;
            builder = builder.cc(mailbox);
        }
        for bcc in &email.bcc {
            let mailbox: Mailbox = bcc
                .parse()
                .map_err(|e| PorticoError::Notification(format!("invalid bcc: {e}")))?;
            builder = builder.bcc(mailbox);
        }

        let message = builder
            .body(Self::render(email))
            .map_err(|e| PorticoError::Notification(format!("message build: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| PorticoError::Notification(format!("SMTP send: {e}")))?;

        Ok(())
    }
}
