use std::sync::Arc;
use std::time::Duration;

use super::interface::{AuthError, Result};
use super::model::User;
use super::schema::{AuthStatusDetail, LoginRequest, LoginResponse, RegisterForm, RegistrationOutcome};
use crate::services::{ApiClient, ApiError, ApiRequest};

const PENDING_MESSAGE: &str = "Registration successful. Your account is pending authorization.";

/// REST calls of the authentication backend
pub struct AuthApi {
    api: Arc<ApiClient>,
    upload_timeout: Duration,
}

impl AuthApi {
    pub fn new(api: Arc<ApiClient>, upload_timeout: Duration) -> Self {
        Self { api, upload_timeout }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.api
    }

    /// Exchanges credentials for tokens and stores them
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = ApiRequest::post("/auth/login").json(&LoginRequest { email, password })?;
        let response = self.api.send_public(request).await?;
        let tokens: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        self.api
            .tokens()
            .set_tokens(&tokens.access_token, &tokens.refresh_token);
        Ok(tokens)
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<RegistrationOutcome> {
        let multipart = form
            .to_multipart()
            .map_err(|e| AuthError::Payload(e.to_string()))?;

        let response = self
            .api
            .post_multipart_public("/auth/register", multipart, self.upload_timeout)
            .await?;
        let body: serde_json::Value = response.json().await.unwrap_or(serde_json::Value::Null);

        let user = body
            .get("user")
            .cloned()
            .and_then(|u| serde_json::from_value::<User>(u).ok())
            .or_else(|| serde_json::from_value::<User>(body.clone()).ok());
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or(PENDING_MESSAGE)
            .to_string();

        Ok(RegistrationOutcome { user, message })
    }

    /// Current user, also cached in the token store
    pub async fn profile(&self) -> Result<User> {
        let raw: serde_json::Value = self.api.get_json(ApiRequest::get("/profile")).await?;
        let user: User = serde_json::from_value(raw)
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if let Ok(cached) = serde_json::to_value(&user) {
            self.api.tokens().set_user(cached);
        }
        Ok(user)
    }

    pub async fn auth_status(&self) -> Result<AuthStatusDetail> {
        Ok(self.api.get_json(ApiRequest::get("/auth/status")).await?)
    }
}
