//! Backend services for rolematch.
//!
//! Everything an editor talks to lives here, behind traits so that tests can
//! run entirely in memory:
//!
//! - [`DocumentStore`]: fetch/upsert of the shared document, plus a change
//!   feed of accepted writes. [`MemoryStore`] and [`SqliteStore`] implement it.
//! - [`AuthProvider`]: passwordless sign-in. [`LinkAuth`] issues login links
//!   and hands them to a [`Mailer`].

pub mod auth;
pub mod error;
pub mod feed;
pub mod mailer;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use auth::{AuthProvider, LINK_TTL, LinkAuth, SessionSubscription};
pub use error::{AuthError, AuthResult, StoreError, StoreResult};
pub use feed::{ChangeEvent, ChangeFeed, Subscription};
pub use mailer::{LogMailer, Mailer, OutboxMailer, SentLink};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{DocumentStore, DocumentWrite};
