//! Platform adapters, selected by hostname.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::backend::PageData;

/// Title used for saved LinkedIn posts.
pub const LINKEDIN_POST_TITLE: &str = "LinkedIn Post";

/// Kind of item an adapter saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Page,
}

/// What the content side knows about the page being saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub url: String,
    pub document_title: String,
    /// Permalink of the post, when the user picked one.
    pub post_url: Option<String>,
}

/// A saved item as produced by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedItem {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(flatten)]
    pub page: PageData,
}

/// Adapter variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformAdapter {
    LinkedIn,
    Generic,
}

impl PlatformAdapter {
    #[must_use]
    pub fn platform_name(self) -> &'static str {
        match self {
            Self::LinkedIn => "linkedin",
            Self::Generic => "generic",
        }
    }

    #[must_use]
    pub fn item_kind(self) -> ItemKind {
        match self {
            Self::LinkedIn => ItemKind::Post,
            Self::Generic => ItemKind::Page,
        }
    }

    /// Builds the item to save.
    #[must_use]
    pub fn capture(self, context: &PageContext, timestamp: i64) -> CapturedItem {
        let (url, title) = match self {
            Self::LinkedIn => (
                context.post_url.clone().unwrap_or_else(|| context.url.clone()),
                LINKEDIN_POST_TITLE.to_string(),
            ),
            Self::Generic => (context.url.clone(), context.document_title.clone()),
        };
        CapturedItem {
            kind: self.item_kind(),
            page: PageData {
                url,
                title,
                timestamp,
                description: None,
            },
        }
    }
}

/// Hostname to adapter mapping with an explicit default.
#[derive(Debug, Clone)]
pub struct AdapterRegistry {
    by_host: HashMap<String, PlatformAdapter>,
    default: PlatformAdapter,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        let mut by_host = HashMap::new();
        by_host.insert("www.linkedin.com".to_string(), PlatformAdapter::LinkedIn);
        Self {
            by_host,
            default: PlatformAdapter::Generic,
        }
    }
}

impl AdapterRegistry {
    #[must_use]
    pub fn resolve_host(&self, host: &str) -> PlatformAdapter {
        self.by_host.get(host).copied().unwrap_or(self.default)
    }

    /// Resolves a page url. Unparseable urls get the default adapter.
    #[must_use]
    pub fn resolve(&self, url: &str) -> PlatformAdapter {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| self.resolve_host(h)))
            .unwrap_or(self.default)
    }
}
