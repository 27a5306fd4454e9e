//! Sign-in form logic: request a login link, redeem it, sign out.

use std::sync::Arc;

use rolematch_backend::{AuthError, AuthProvider};
use rolematch_types::Session;

use crate::constants::{DEFAULT_REDIRECT, LINK_SENT_MESSAGE};

/// Message shown under the sign-in form after a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignInMessage {
    Success(String),
    Error(String),
}

impl SignInMessage {
    pub fn text(&self) -> &str {
        match self {
            SignInMessage::Success(text) | SignInMessage::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SignInMessage::Error(_))
    }
}

pub struct SignIn {
    auth: Arc<dyn AuthProvider>,
    redirect_to: String,
}

impl SignIn {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            auth,
            redirect_to: DEFAULT_REDIRECT.to_string(),
        }
    }

    /// Where the emailed link should land.
    pub fn with_redirect(mut self, redirect_to: impl Into<String>) -> Self {
        self.redirect_to = redirect_to.into();
        self
    }

    pub fn redirect_to(&self) -> &str {
        &self.redirect_to
    }

    /// Ask the provider to email a login link.
    ///
    /// A blank address is refused without calling the provider. Provider
    /// errors are shown verbatim.
    pub async fn request_link(&self, email: &str) -> SignInMessage {
        let email = email.trim();
        if email.is_empty() {
            return SignInMessage::Error(AuthError::InvalidEmail(String::new()).to_string());
        }
        match self.auth.request_link(email, &self.redirect_to).await {
            Ok(()) => SignInMessage::Success(LINK_SENT_MESSAGE.to_string()),
            Err(e) => {
                tracing::warn!(email, "login link request failed: {e}");
                SignInMessage::Error(e.to_string())
            }
        }
    }

    /// Redeem a token or a full login link.
    pub async fn redeem(&self, link: &str) -> Result<Session, AuthError> {
        self.auth.redeem(link.trim()).await
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.sign_out().await
    }
}
