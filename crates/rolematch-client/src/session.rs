//! Session gate: decides whether the editor or the sign-in form is shown.
//!
//! ```text
//!   Loading ──current_session()──▶ SignedIn(session) ◀──┐
//!      │                                 │               │ changed()
//!      └── none / error ──▶ SignedOut ◀──┘ sign_out ─────┘
//! ```

use std::sync::Arc;

use rolematch_backend::AuthProvider;
use rolematch_types::Session;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the user should see.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionGate {
    /// Still asking the provider.
    #[default]
    Loading,
    SignedOut,
    SignedIn(Session),
}

impl SessionGate {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionGate::SignedIn(session) => Some(session),
            _ => None,
        }
    }

    fn from_session(session: Option<Session>) -> Self {
        session.map_or(SessionGate::SignedOut, SessionGate::SignedIn)
    }
}

/// Tracks the provider's session for the lifetime of the app.
pub struct SessionHolder {
    rx: watch::Receiver<SessionGate>,
    task: JoinHandle<()>,
}

impl SessionHolder {
    /// Start tracking. The gate is `Loading` until the provider answers.
    pub fn start(auth: Arc<dyn AuthProvider>) -> Self {
        let (tx, rx) = watch::channel(SessionGate::Loading);
        let task = tokio::spawn(async move {
            // Subscribe first so a sign-in during the initial query is seen.
            let mut sub = auth.subscribe();
            let initial = match auth.current_session().await {
                Ok(session) => session,
                Err(e) => {
                    warn!("session lookup failed, treating as signed out: {e}");
                    None
                }
            };
            tx.send_replace(SessionGate::from_session(initial));

            while let Some(session) = sub.changed().await {
                match &session {
                    Some(s) => info!(email = %s.principal.email, "session started"),
                    None => info!("session ended"),
                }
                tx.send_replace(SessionGate::from_session(session));
            }
            debug!("auth provider gone, session tracking stopped");
        });
        Self { rx, task }
    }

    pub fn gate(&self) -> SessionGate {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionGate> {
        self.rx.clone()
    }

    /// Wait until the gate leaves `Loading`.
    pub async fn ready(&self) -> SessionGate {
        let mut rx = self.rx.clone();
        match rx.wait_for(|gate| *gate != SessionGate::Loading).await {
            Ok(gate) => gate.clone(),
            // Task ended without answering.
            Err(_) => SessionGate::SignedOut,
        }
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for SessionHolder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rolematch_backend::{AuthError, AuthResult, LinkAuth, OutboxMailer, SessionSubscription};
    use rolematch_types::Principal;

    fn link_auth() -> (Arc<LinkAuth>, Arc<OutboxMailer>) {
        let mailer = Arc::new(OutboxMailer::new());
        (Arc::new(LinkAuth::new(mailer.clone())), mailer)
    }

    #[tokio::test]
    async fn test_signed_out_when_no_session() {
        let (auth, _) = link_auth();
        let holder = SessionHolder::start(auth);
        assert_eq!(holder.ready().await, SessionGate::SignedOut);
    }

    #[tokio::test]
    async fn test_follows_sign_in_and_out() {
        let (auth, mailer) = link_auth();
        let holder = SessionHolder::start(auth.clone());
        assert_eq!(holder.ready().await, SessionGate::SignedOut);

        let mut rx = holder.subscribe();
        auth.request_link("amy@example.org", "http://localhost:5173")
            .await
            .unwrap();
        auth.redeem(&mailer.last_url().unwrap()).await.unwrap();
        let gate = rx
            .wait_for(|g| matches!(g, SessionGate::SignedIn(_)))
            .await
            .unwrap()
            .clone();
        assert_eq!(gate.session().unwrap().principal.email, "amy@example.org");

        auth.sign_out().await.unwrap();
        rx.wait_for(|g| *g == SessionGate::SignedOut).await.unwrap();
    }

    /// Provider whose lookup always fails.
    struct Broken {
        tx: watch::Sender<Option<Session>>,
    }

    #[async_trait]
    impl AuthProvider for Broken {
        async fn current_session(&self) -> AuthResult<Option<Session>> {
            Err(AuthError::Unavailable("offline".into()))
        }
        fn subscribe(&self) -> SessionSubscription {
            SessionSubscription::new(self.tx.subscribe())
        }
        async fn request_link(&self, _: &str, _: &str) -> AuthResult<()> {
            Err(AuthError::Unavailable("offline".into()))
        }
        async fn redeem(&self, _: &str) -> AuthResult<Session> {
            Err(AuthError::Unavailable("offline".into()))
        }
        async fn sign_out(&self) -> AuthResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_lookup_error_is_signed_out() {
        let (tx, _) = watch::channel(Some(Session::new(Principal::from_email("x@y.z"))));
        let holder = SessionHolder::start(Arc::new(Broken { tx }));
        assert_eq!(holder.ready().await, SessionGate::SignedOut);
    }

    #[tokio::test]
    async fn test_drop_releases_provider_subscription() {
        let (tx, _) = watch::channel(None);
        let provider = Arc::new(Broken { tx });
        let holder = SessionHolder::start(provider.clone());
        assert_eq!(holder.ready().await, SessionGate::SignedOut);
        assert_eq!(provider.tx.receiver_count(), 1);

        let mut gate = holder.subscribe();
        gate.borrow_and_update();
        drop(holder);

        // The gate sender lives in the task, so this resolves once it is gone.
        assert!(gate.changed().await.is_err());
        assert_eq!(provider.tx.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_following_sign_in() {
        let (auth, mailer) = link_auth();
        let holder = SessionHolder::start(auth.clone());
        assert_eq!(holder.ready().await, SessionGate::SignedOut);

        let mut gate = holder.subscribe();
        gate.borrow_and_update();
        holder.shutdown();
        assert!(gate.changed().await.is_err());

        auth.request_link("amy@example.org", "http://localhost:5173")
            .await
            .unwrap();
        auth.redeem(&mailer.last_url().unwrap()).await.unwrap();
        assert_eq!(*gate.borrow(), SessionGate::SignedOut);
    }
}
