use std::sync::Arc;

use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use eyre::{Result, eyre};
use log::{debug, info};
use rand::Rng;
use reqwest::Url;

use crate::api::client::ApiClient;
use crate::models::user::User;
use crate::session::persist::KeyValueStorage;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const OAUTH_STATE_KEY: &str = "google_oauth_state";

/// Google OAuth authorization-code round-trip. The random `state` is held
/// in session-scoped storage between the outbound redirect and the
/// callback; the code exchange itself happens on the backend.
pub struct GoogleOauth {
    client_id: String,
    redirect_uri: String,
    state_store: Arc<dyn KeyValueStorage>,
}

impl GoogleOauth {
    pub fn new(
        client_id: String,
        redirect_uri: String,
        state_store: Arc<dyn KeyValueStorage>,
    ) -> Self {
        Self {
            client_id,
            redirect_uri,
            state_store,
        }
    }

    /// Builds the outbound authorization URL and remembers its CSRF state.
    pub fn authorization_url(&self) -> Result<String> {
        if self.client_id.is_empty() {
            return Err(eyre!("google.client_id is not configured"));
        }

        let state = random_state();
        self.state_store.set(OAUTH_STATE_KEY, &state)?;

        let url = Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state.as_str()),
            ],
        )?;

        Ok(url.to_string())
    }

    /// Extracts `code` from the callback URL after checking its `state`
    /// against the stored value. The stored state is single-use.
    pub fn handle_callback(&self, callback_url: &str) -> Result<String> {
        let url = Url::parse(callback_url)?;

        let mut code = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                _ => {}
            }
        }

        let code = code.ok_or_else(|| eyre!("callback URL carries no authorization code"))?;
        let state = state.ok_or_else(|| eyre!("callback URL carries no state parameter"))?;

        let expected = self
            .state_store
            .get(OAUTH_STATE_KEY)
            .ok_or_else(|| eyre!("no pending Google sign-in for this session"))?;
        self.state_store.remove(OAUTH_STATE_KEY)?;

        if state != expected {
            return Err(eyre!("OAuth state mismatch, aborting sign-in"));
        }

        debug!("OAuth state verified");
        Ok(code)
    }

    /// Exchanges the code and resolves the Google profile into a SwiftApply
    /// user, both via the backend.
    pub async fn exchange(&self, client: &ApiClient, code: &str) -> Result<User> {
        let token = client.google_token(code, &self.redirect_uri).await?;
        if !token.success {
            return Err(eyre!(
                token.error.unwrap_or_else(|| "Google token exchange failed".to_string())
            ));
        }
        let access_token = token
            .access_token
            .ok_or_else(|| eyre!("backend returned no access token"))?;

        let response = client.google_user(&access_token).await?;
        if !response.success {
            return Err(eyre!(
                response.error.unwrap_or_else(|| "Google profile lookup failed".to_string())
            ));
        }

        let user = response
            .user
            .ok_or_else(|| eyre!("backend returned no user for the Google account"))?;
        info!("google sign-in resolved to {}", user.email);
        Ok(user)
    }
}

fn random_state() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::persist::MemoryStorage;

    fn oauth(store: Arc<MemoryStorage>) -> GoogleOauth {
        GoogleOauth::new(
            "client-123".to_string(),
            "http://localhost:3000/auth/google/callback".to_string(),
            store,
        )
    }

    #[test]
    fn authorization_url_carries_the_contract_parameters() {
        let store = Arc::new(MemoryStorage::new());
        let url = oauth(store.clone()).authorization_url().unwrap();
        let parsed = Url::parse(&url).unwrap();

        let params: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(get("client_id").as_deref(), Some("client-123"));
        assert_eq!(get("response_type").as_deref(), Some("code"));
        assert_eq!(get("scope").as_deref(), Some("openid email profile"));
        assert_eq!(get("access_type").as_deref(), Some("offline"));
        assert_eq!(get("prompt").as_deref(), Some("consent"));

        let state = get("state").unwrap();
        assert!(!state.is_empty());
        assert_eq!(store.get(OAUTH_STATE_KEY).as_deref(), Some(state.as_str()));
    }

    #[test]
    fn matching_state_yields_the_code_and_consumes_the_state() {
        let store = Arc::new(MemoryStorage::new());
        let flow = oauth(store.clone());
        flow.authorization_url().unwrap();
        let state = store.get(OAUTH_STATE_KEY).unwrap();

        let callback = format!(
            "http://localhost:3000/auth/google/callback?code=abc&state={}",
            state
        );
        assert_eq!(flow.handle_callback(&callback).unwrap(), "abc");
        assert_eq!(store.get(OAUTH_STATE_KEY), None);
    }

    #[test]
    fn mismatched_state_is_rejected() {
        let store = Arc::new(MemoryStorage::new());
        let flow = oauth(store.clone());
        flow.authorization_url().unwrap();

        let err = flow
            .handle_callback("http://localhost:3000/auth/google/callback?code=abc&state=forged")
            .unwrap_err();
        assert!(err.to_string().contains("state mismatch"));
    }

    #[test]
    fn callback_without_pending_state_is_rejected() {
        let store = Arc::new(MemoryStorage::new());
        let flow = oauth(store);

        let err = flow
            .handle_callback("http://localhost:3000/auth/google/callback?code=abc&state=x")
            .unwrap_err();
        assert!(err.to_string().contains("no pending"));
    }
}
