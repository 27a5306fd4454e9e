//! Principal types.
//!
//! A `Principal` is a signed-in person, identified by the email address they
//! used to request a login link. Writes to the shared document are stamped
//! with the principal that made them.

use serde::{Deserialize, Serialize};

use crate::ids::PrincipalId;

/// A person who can sign in and edit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identifier, derived from the lower-cased email.
    pub id: PrincipalId,
    /// Email address as entered at sign-in.
    pub email: String,
}

impl Principal {
    /// Principal for an email address. The ID is stable across sign-ins.
    pub fn from_email(email: impl Into<String>) -> Self {
        let email = email.into().trim().to_string();
        Self {
            id: PrincipalId::for_email(&email),
            email,
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.email)
    }
}
