//! Delivery of login links.

use parking_lot::Mutex;

use crate::error::AuthResult;

/// Delivers a login link to an email address.
pub trait Mailer: Send + Sync {
    fn send_login_link(&self, email: &str, url: &str) -> AuthResult<()>;
}

/// Writes the link to the log instead of sending mail.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_login_link(&self, email: &str, url: &str) -> AuthResult<()> {
        tracing::info!(email, url, "login link issued");
        Ok(())
    }
}

/// A sent message, as recorded by [`OutboxMailer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentLink {
    pub email: String,
    pub url: String,
}

/// Keeps every link in memory. Lets tests and embedders pick up the link.
#[derive(Debug, Default)]
pub struct OutboxMailer {
    sent: Mutex<Vec<SentLink>>,
}

impl OutboxMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentLink> {
        self.sent.lock().clone()
    }

    pub fn last_url(&self) -> Option<String> {
        self.sent.lock().last().map(|s| s.url.clone())
    }
}

impl Mailer for OutboxMailer {
    fn send_login_link(&self, email: &str, url: &str) -> AuthResult<()> {
        self.sent.lock().push(SentLink {
            email: email.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }
}
