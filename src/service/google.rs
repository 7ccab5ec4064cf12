use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    config::GoogleConfig,
};

/**
 * What Google hands back to the callback in `state`.
 */
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthState {
    pub user_id: String,
    pub return_url: String,
}

/**
 * Builds Google OAuth authorization urls for linking a user's calendar.
 */
pub struct GoogleAuthService {
    config: Option<GoogleConfig>,
}

impl GoogleAuthService {
    pub fn new(config: Option<GoogleConfig>) -> Self {
        GoogleAuthService { config }
    }

    /**
     * Creates the authorization url for a signed in user.
     *
     * # Arguments
     * `user_id`: Subject of the caller's session.
     * `return_url`: Local path to return to after linking. Anything else falls back to `/`.
     *
     * # Returns
     * The url, or `Unavailable` when Google is not configured.
     */
    pub fn authorization_url(&self, user_id: &str, return_url: Option<&str>) -> Result<String, ApplicationError> {
        let Some(config) = &self.config else {
            return Err(ApplicationError::new(ErrorType::Unavailable, "Google integration is not configured".to_string()));
        };
        let state = GoogleAuthState { user_id: user_id.to_string(), return_url: local_return_url(return_url) };
        let state = serde_json::to_vec(&state).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to encode state: {err}")))?;
        let mut url = Url::parse(&config.auth_endpoint).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid Google auth endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", &STANDARD.encode(state));
        Ok(url.into())
    }
}

/**
 * Keeps only same-site paths. Protocol relative (`//host`) and absolute urls would redirect off site.
 */
fn local_return_url(return_url: Option<&str>) -> String {
    match return_url.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path.to_string(),
        _ => "/".to_string(),
    }
}
