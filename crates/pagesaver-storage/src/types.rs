//! Document types kept by the store.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A page (or bookmark) stored in the user's collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPage {
    /// Store-assigned identifier.
    pub id: String,
    pub url: String,
    pub title: String,
    /// Client-side save time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Payload for inserting a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPage {
    pub url: String,
    pub title: String,
    pub timestamp: i64,
    #[serde(default)]
    pub description: String,
}

impl NewPage {
    /// Creates a page payload with an empty description.
    #[must_use]
    pub fn new(url: impl Into<String>, title: impl Into<String>, timestamp: i64) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            timestamp,
            description: String::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Audit record of the last credential obtained for a subject.
///
/// Keyed by `user_id`; writing a record for an existing subject replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub user_id: String,
    pub access_token: String,
    pub expires_in: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Profile snapshot of a user who has logged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub picture: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_login: OffsetDateTime,
}

/// Collection statistics shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub total_pages: u64,
    /// Pages created during the last seven days.
    pub week_pages: u64,
    /// Distinct hostnames across all stored urls.
    pub unique_domains: u64,
}
