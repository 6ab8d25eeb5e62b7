//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use rotharc_core::{Email, UserId};

/// A Supabase access token (JWT).
///
/// Serialized as a plain string so it can live in the session store;
/// `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// The raw token, for an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Session-stored user identity.
///
/// This is the identity object handed explicitly to every handler and
/// service that acts on behalf of the visitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth user id (also the `profiles` primary key).
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// First name from the profile, for greetings.
    pub first_name: String,
    /// Bearer credential for requests made on the user's behalf.
    pub access_token: AccessToken,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the booking wizard state.
    pub const BOOKING_WIZARD: &str = "booking_wizard";

    /// Key for notifications waiting to be shown on the next page.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_debug_redacted() {
        let token = AccessToken::new("eyJ.secret.sig".to_string());
        let debug = format!("{token:?}");
        assert!(!debug.contains("secret"));
        assert_eq!(token.expose(), "eyJ.secret.sig");
    }
}
