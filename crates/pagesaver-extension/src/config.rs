//! Extension settings.

use std::time::Duration;

use pagesaver_auth::AuthorizationRequest;
use pagesaver_auth::config::DEFAULT_AUTHORIZATION_ENDPOINT;
use serde::{Deserialize, Serialize};

/// Settings baked into the extension build.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Backend API root, e.g. `http://localhost:3000/api`.
    pub api_endpoint: String,

    /// Browser-assigned extension id, used for the redirect target.
    pub extension_id: String,

    pub client_id: String,
    pub scope: String,
    pub response_type: String,
    pub authorization_endpoint: String,

    /// Interval of the periodic bookmark sync.
    #[serde(with = "humantime_serde")]
    pub sync_interval: Duration,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            api_endpoint: "http://localhost:3000/api".to_string(),
            extension_id: String::new(),
            client_id: String::new(),
            scope: "r_liteprofile r_emailaddress".to_string(),
            response_type: "code".to_string(),
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
            sync_interval: Duration::from_secs(3600),
        }
    }
}

impl ExtensionConfig {
    /// Redirect target registered for the extension.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("https://{}.chromiumapp.org/", self.extension_id)
    }

    /// Authorization request for the extension flow.
    #[must_use]
    pub fn authorization_request(&self) -> AuthorizationRequest {
        AuthorizationRequest {
            authorization_endpoint: self.authorization_endpoint.clone(),
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri(),
            scope: self.scope.clone(),
            response_type: self.response_type.clone(),
        }
    }

    /// Joins a path onto the API root.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_endpoint.trim_end_matches('/'), path)
    }
}
