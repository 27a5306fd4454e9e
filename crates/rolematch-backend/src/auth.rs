//! Passwordless authentication.
//!
//! An [`AuthProvider`] issues single-use login links and turns a redeemed
//! link into a [`Session`]. Session changes are published on a watch
//! channel; a [`SessionSubscription`] sees the latest value and every later
//! change, and dropping it unsubscribes.
//!
//! [`LinkAuth`] is the local provider: tokens are random, expire after an
//! hour, and can be persisted (with the current session) to a JSON file so
//! separate CLI invocations share one sign-in.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use rolematch_types::{Principal, Session, now_millis};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{AuthError, AuthResult};
use crate::mailer::Mailer;

/// How long a login link stays redeemable.
pub const LINK_TTL: Duration = Duration::from_secs(60 * 60);

/// Source of sessions.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The current session, if signed in.
    async fn current_session(&self) -> AuthResult<Option<Session>>;

    /// Observe session changes.
    fn subscribe(&self) -> SessionSubscription;

    /// Send a one-time login link for `email` that lands on `redirect_to`.
    async fn request_link(&self, email: &str, redirect_to: &str) -> AuthResult<()>;

    /// Exchange a link token (or the whole link) for a session.
    async fn redeem(&self, token: &str) -> AuthResult<Session>;

    async fn sign_out(&self) -> AuthResult<()>;
}

/// Receiver side of a provider's session channel.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    pub fn new(rx: watch::Receiver<Option<Session>>) -> Self {
        Self { rx }
    }

    /// Latest value, without waiting.
    pub fn current(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. `None` once the provider is gone.
    pub async fn changed(&mut self) -> Option<Option<Session>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PendingLink {
    token: String,
    email: String,
    expires_at: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct AuthState {
    #[serde(default)]
    pending: Vec<PendingLink>,
    #[serde(default)]
    session: Option<Session>,
}

/// Local magic-link provider.
pub struct LinkAuth {
    state: Mutex<AuthState>,
    tx: watch::Sender<Option<Session>>,
    mailer: Arc<dyn Mailer>,
    state_path: Option<PathBuf>,
    link_ttl: Duration,
}

impl LinkAuth {
    /// Provider that keeps everything in memory.
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self::from_state(AuthState::default(), mailer, None)
    }

    /// Provider persisted to `path`. A missing file starts signed out.
    pub fn open(path: impl AsRef<Path>, mailer: Arc<dyn Mailer>) -> AuthResult<Self> {
        let path = path.as_ref();
        let state = match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AuthState::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::from_state(state, mailer, Some(path.to_path_buf())))
    }

    fn from_state(state: AuthState, mailer: Arc<dyn Mailer>, state_path: Option<PathBuf>) -> Self {
        let (tx, _) = watch::channel(state.session.clone());
        Self {
            state: Mutex::new(state),
            tx,
            mailer,
            state_path,
            link_ttl: LINK_TTL,
        }
    }

    pub fn with_link_ttl(mut self, ttl: Duration) -> Self {
        self.link_ttl = ttl;
        self
    }

    fn persist(&self, state: &AuthState) -> AuthResult<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }

    /// Commits and notifies only after the state file is written.
    fn set_session(&self, session: Option<Session>) -> AuthResult<()> {
        {
            let mut state = self.state.lock();
            let next = AuthState {
                session: session.clone(),
                ..state.clone()
            };
            self.persist(&next)?;
            *state = next;
        }
        self.tx.send_replace(session);
        Ok(())
    }
}

fn validate_email(email: &str) -> AuthResult<&str> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail(email.to_string()))
    }
}

fn new_token() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// The token inside a pasted link, or the input itself.
fn extract_token(input: &str) -> &str {
    let input = input.trim();
    match input.rsplit_once("token=") {
        Some((_, rest)) => rest.split(['&', '#']).next().unwrap_or(rest),
        None => input,
    }
}

#[async_trait]
impl AuthProvider for LinkAuth {
    async fn current_session(&self) -> AuthResult<Option<Session>> {
        Ok(self.state.lock().session.clone())
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.tx.subscribe())
    }

    #[tracing::instrument(skip(self), name = "auth.request_link")]
    async fn request_link(&self, email: &str, redirect_to: &str) -> AuthResult<()> {
        let email = validate_email(email)?;
        let token = new_token();
        let now = now_millis();
        {
            let mut state = self.state.lock();
            state.pending.retain(|p| p.expires_at > now);
            state.pending.push(PendingLink {
                token: token.clone(),
                email: email.to_string(),
                expires_at: now + self.link_ttl.as_millis() as u64,
            });
            self.persist(&state)?;
        }

        let url = format!("{}/?token={token}", redirect_to.trim_end_matches('/'));
        self.mailer.send_login_link(email, &url)?;
        tracing::debug!(email, "login link sent");
        Ok(())
    }

    #[tracing::instrument(skip(self, token), name = "auth.redeem")]
    async fn redeem(&self, token: &str) -> AuthResult<Session> {
        let token = extract_token(token);
        let link = {
            let mut state = self.state.lock();
            let idx = state
                .pending
                .iter()
                .position(|p| p.token == token)
                .ok_or(AuthError::InvalidToken)?;
            let link = state.pending.remove(idx);
            self.persist(&state)?;
            link
        };
        if now_millis() >= link.expires_at {
            return Err(AuthError::ExpiredToken);
        }

        let session = Session::new(Principal::from_email(link.email));
        self.set_session(Some(session.clone()))?;
        tracing::info!(email = %session.principal.email, session = %session.display_name(), "signed in");
        Ok(session)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.set_session(None)?;
        tracing::info!("signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::OutboxMailer;

    fn provider() -> (LinkAuth, Arc<OutboxMailer>) {
        let mailer = Arc::new(OutboxMailer::new());
        (LinkAuth::new(mailer.clone()), mailer)
    }

    #[tokio::test]
    async fn test_starts_signed_out() {
        let (auth, _) = provider();
        assert!(auth.current_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_request_sends_link_to_redirect() {
        let (auth, mailer) = provider();
        auth.request_link(" amy@example.org ", "http://localhost:5173/")
            .await
            .unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].email, "amy@example.org");
        assert!(sent[0].url.starts_with("http://localhost:5173/?token="));
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let (auth, mailer) = provider();
        for bad in ["amy", "@example.org", "amy@", "a my@example.org"] {
            let err = auth.request_link(bad, "http://x").await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidEmail(_)), "{bad}");
        }
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_redeem_link_signs_in_once() {
        let (auth, mailer) = provider();
        let mut sub = auth.subscribe();
        auth.request_link("Amy@Example.org", "http://x").await.unwrap();
        let url = mailer.last_url().unwrap();

        let session = auth.redeem(&url).await.unwrap();
        assert_eq!(session.principal.email, "Amy@Example.org");
        assert_eq!(auth.current_session().await.unwrap(), Some(session.clone()));
        assert_eq!(sub.changed().await, Some(Some(session)));

        let err = auth.redeem(&url).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_expired_link() {
        let mailer = Arc::new(OutboxMailer::new());
        let auth = LinkAuth::new(mailer.clone()).with_link_ttl(Duration::ZERO);
        auth.request_link("amy@example.org", "http://x").await.unwrap();
        let err = auth.redeem(&mailer.last_url().unwrap()).await.unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));
    }

    #[tokio::test]
    async fn test_sign_out_notifies() {
        let (auth, mailer) = provider();
        auth.request_link("amy@example.org", "http://x").await.unwrap();
        auth.redeem(&mailer.last_url().unwrap()).await.unwrap();

        let mut sub = auth.subscribe();
        assert!(sub.current().is_some());
        auth.sign_out().await.unwrap();
        assert_eq!(sub.changed().await, Some(None));
    }

    #[tokio::test]
    async fn test_state_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth").join("state.json");
        let mailer = Arc::new(OutboxMailer::new());

        let auth = LinkAuth::open(&path, mailer.clone()).unwrap();
        auth.request_link("amy@example.org", "http://x").await.unwrap();
        drop(auth);

        // Link requested by one process, redeemed by another.
        let auth = LinkAuth::open(&path, mailer.clone()).unwrap();
        let session = auth.redeem(&mailer.last_url().unwrap()).await.unwrap();
        drop(auth);

        let auth = LinkAuth::open(&path, mailer).unwrap();
        assert_eq!(auth.current_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mailer = Arc::new(OutboxMailer::new());
        let auth = LinkAuth::open(&path, mailer.clone()).unwrap();
        auth.request_link("amy@example.org", "http://x").await.unwrap();
        let session = auth.redeem(&mailer.last_url().unwrap()).await.unwrap();
        let mut sub = auth.subscribe();

        // A directory where the state file was makes the next write fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        assert!(matches!(auth.sign_out().await, Err(AuthError::Io(_))));
        assert_eq!(auth.current_session().await.unwrap(), Some(session.clone()));
        assert_eq!(sub.current(), Some(session));

        std::fs::remove_dir(&path).unwrap();
        auth.sign_out().await.unwrap();
        assert_eq!(sub.changed().await, Some(None));
        assert!(auth.current_session().await.unwrap().is_none());
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("abc123"), "abc123");
        assert_eq!(extract_token(" http://x/?token=abc123 "), "abc123");
        assert_eq!(extract_token("http://x/?token=abc&next=1"), "abc");
    }
}
