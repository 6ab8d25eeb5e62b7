//! Edge functions (`/functions/v1/{name}`) used by the admin dashboard.
//!
//! Each function re-checks that the caller is a super admin, so the
//! signed-in user's token is always sent.

use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use rotharc_core::UserId;

use super::{SupabaseClient, SupabaseError, decode, expect_success};
use crate::models::{AccessToken, AdminUserRow};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserTarget {
    user_id: UserId,
}

#[derive(Serialize)]
struct Empty {}

impl SupabaseClient {
    /// Call an edge function with a JSON body.
    ///
    /// # Errors
    ///
    /// `Api` with the function's `{"error": ..}` message on non-2xx.
    #[instrument(skip(self, token, body))]
    pub async fn invoke<B, T>(
        &self,
        token: &AccessToken,
        name: &str,
        body: &B,
    ) -> Result<T, SupabaseError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.post_function(token, name, body).await?;
        decode(response).await.inspect_err(|e| {
            tracing::warn!(function = name, error = %e, "Edge function failed");
        })
    }

    async fn post_function<B: Serialize + Sync>(
        &self,
        token: &AccessToken,
        name: &str,
        body: &B,
    ) -> Result<reqwest::Response, SupabaseError> {
        let url = self.endpoint(&format!("functions/v1/{name}"))?;
        Ok(self
            .http()
            .post(url)
            .header(AUTHORIZATION, self.bearer(Some(token)))
            .json(body)
            .send()
            .await?)
    }

    /// Every user with profile and admin flag.
    ///
    /// # Errors
    ///
    /// Returns error if the function fails.
    pub async fn list_users(&self, token: &AccessToken) -> Result<Vec<AdminUserRow>, SupabaseError> {
        self.invoke(token, "list-users", &Empty {}).await
    }

    /// # Errors
    ///
    /// Returns error if the function fails.
    pub async fn ban_user(&self, token: &AccessToken, user_id: UserId) -> Result<(), SupabaseError> {
        self.invoke_on_user(token, "ban-user", user_id).await
    }

    /// # Errors
    ///
    /// Returns error if the function fails.
    pub async fn unban_user(&self, token: &AccessToken, user_id: UserId) -> Result<(), SupabaseError> {
        self.invoke_on_user(token, "unban-user", user_id).await
    }

    /// # Errors
    ///
    /// Returns error if the function fails.
    pub async fn delete_user(&self, token: &AccessToken, user_id: UserId) -> Result<(), SupabaseError> {
        self.invoke_on_user(token, "delete-user", user_id).await
    }

    async fn invoke_on_user(
        &self,
        token: &AccessToken,
        name: &str,
        user_id: UserId,
    ) -> Result<(), SupabaseError> {
        // Any 2xx counts, whatever the body
        let response = self
            .post_function(token, name, &UserTarget { user_id })
            .await?;
        expect_success(response).await.inspect_err(|e| {
            tracing::warn!(function = name, error = %e, "Edge function failed");
        })?;
        tracing::info!(function = name, target = %user_id, "Admin action applied");
        Ok(())
    }
}
