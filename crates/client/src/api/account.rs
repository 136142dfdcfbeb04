//! Login, signup and profile endpoints.

use crowdfork_core::Email;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{info, instrument};

use super::types::{LoginResponse, MessageResponse, ProfileUpdate, UserProfile};
use super::{ApiClient, ApiError, ApiRequest};

impl ApiClient {
    /// Exchange credentials for a session token and store it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] for rejected credentials, or the
    /// transport error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &SecretString) -> Result<(), ApiError> {
        let response: LoginResponse = self
            .execute_json(
                ApiRequest::post(["login"])
                    .json(json!({
                        "email": email.as_str(),
                        "password": password.expose_secret(),
                    }))
                    .on_failure("Login failed"),
            )
            .await?;

        if response.token.trim().is_empty() {
            return Err(ApiError::RequestFailed {
                status: 200,
                message: "Login failed".to_string(),
            });
        }

        self.inner
            .credentials
            .set(SecretString::from(response.token));
        info!("Signed in");
        Ok(())
    }

    /// Create an account. Returns the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] when the backend refuses the
    /// signup, or the transport error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn signup(&self, email: &Email, password: &SecretString) -> Result<String, ApiError> {
        let response: MessageResponse = self
            .execute_json(
                ApiRequest::post(["signup"])
                    .json(json!({
                        "email": email.as_str(),
                        "password": password.expose_secret(),
                    }))
                    .on_failure("Signup failed"),
            )
            .await?;
        Ok(response.message)
    }

    /// Forget the session token.
    pub fn sign_out(&self) -> bool {
        self.inner.credentials.sign_out()
    }

    /// Profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.execute_json(
            ApiRequest::get(["users", "me"])
                .protected()
                .on_failure("Failed to load profile"),
        )
        .await
    }

    /// Apply a partial profile update and return the stored profile.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for an empty update,
    /// [`ApiError::Unauthenticated`] without a session, or the
    /// backend/transport error otherwise.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        if update.is_empty() {
            return Err(ApiError::InvalidRequest("Nothing to update".to_string()));
        }

        self.execute_json(
            ApiRequest::put(["users", "me"])
                .protected()
                .json(serde_json::to_value(update)?)
                .on_failure("Failed to update profile"),
        )
        .await
    }
}
