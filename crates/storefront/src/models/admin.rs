//! Admin dashboard rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rotharc_core::UserId;

/// One user as listed by the `list-users` function: auth user, profile and
/// admin flag joined server-side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserRow {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub is_super_admin: bool,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl AdminUserRow {
    /// Name shown in the user column.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }

    /// Role badge text.
    #[must_use]
    pub const fn role_label(&self) -> &'static str {
        if self.is_super_admin { "Admin" } else { "User" }
    }

    /// Status badge text.
    #[must_use]
    pub const fn status_label(&self) -> &'static str {
        if self.is_banned { "Banned" } else { "Active" }
    }
}
