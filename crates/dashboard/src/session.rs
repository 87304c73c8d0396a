use crate::error::DashboardError;
use api_client::{is_unauthorized, DashboardApi};
use configuration::AuthConfig;
use core_types::User;
use std::sync::Arc;

/// Client-side view of the cookie session held by the API client.
pub struct Session {
    api: Arc<dyn DashboardApi>,
    authenticated: bool,
    user: Option<User>,
}

impl Session {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self {
            api,
            authenticated: false,
            user: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Logs in. The reported user falls back to the submitted username when
    /// the response does not carry one.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<&User, DashboardError> {
        let user = self
            .api
            .login(username, password)
            .await?
            .unwrap_or_else(|| User {
                username: username.to_string(),
            });
        tracing::info!(user = %user.username, "Logged in.");
        self.authenticated = true;
        Ok(self.user.insert(user))
    }

    /// Ends the session locally no matter what the service answers.
    pub async fn logout(&mut self) {
        if let Err(e) = self.api.logout().await {
            tracing::error!(error = %e, "Logout failed.");
        }
        self.authenticated = false;
        self.user = None;
    }

    /// Pings the users endpoint. Any failure simply means "not signed in".
    pub async fn check(&mut self) -> bool {
        match self.api.check_auth().await {
            Ok(()) => self.authenticated = true,
            Err(e) if is_unauthorized(&e) => {
                tracing::debug!("Session is not authenticated.");
                self.authenticated = false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session check failed.");
                self.authenticated = false;
            }
        }
        self.authenticated
    }

    /// Gate for commands that need a signed-in session.
    pub fn require_authenticated(&self) -> Result<(), DashboardError> {
        if self.authenticated {
            Ok(())
        } else {
            Err(DashboardError::NotAuthenticated)
        }
    }

    /// Checks the session and, if it is not live, logs in with the configured
    /// credentials when `auto_login` allows it.
    pub async fn ensure(&mut self, auth: &AuthConfig) -> Result<(), DashboardError> {
        if self.check().await {
            return Ok(());
        }
        match auth.credentials() {
            Some((username, password)) if auth.auto_login => {
                self.login(username, password).await?;
                Ok(())
            }
            _ => self.require_authenticated(),
        }
    }
}
