//! Browser bookmark tree and its flattening into sync records.

use std::sync::Arc;

use async_trait::async_trait;
use pagesaver_auth::BookmarkRecord;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::ExtensionError;

/// Description attached to imported bookmarks.
pub const IMPORTED_DESCRIPTION: &str = "Imported from browser bookmarks";

/// A node of the browser bookmark tree. Nodes with a url are bookmarks,
/// the rest are folders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub date_added: Option<i64>,
    #[serde(default)]
    pub children: Vec<BookmarkNode>,
}

impl BookmarkNode {
    #[must_use]
    pub fn bookmark(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn folder(title: impl Into<String>, children: Vec<BookmarkNode>) -> Self {
        Self {
            title: title.into(),
            children,
            ..Self::default()
        }
    }

    /// Converts a single bookmark node into a record. Folders yield `None`.
    #[must_use]
    pub fn to_record(&self) -> Option<BookmarkRecord> {
        let url = self.url.as_ref().filter(|u| !u.is_empty())?;
        Some(BookmarkRecord {
            url: url.clone(),
            title: Some(self.title.clone()).filter(|t| !t.is_empty()),
            date_added: self.date_added,
            description: Some(IMPORTED_DESCRIPTION.to_string()),
        })
    }
}

/// Depth-first flattening of the bookmark forest.
#[must_use]
pub fn flatten_bookmarks(nodes: &[BookmarkNode]) -> Vec<BookmarkRecord> {
    let mut records = Vec::new();
    let mut stack: Vec<&BookmarkNode> = nodes.iter().rev().collect();
    while let Some(node) = stack.pop() {
        if let Some(record) = node.to_record() {
            records.push(record);
        }
        stack.extend(node.children.iter().rev());
    }
    records
}

/// Access to the browser bookmark tree.
#[async_trait]
pub trait BookmarkSource: Send + Sync {
    async fn tree(&self) -> Result<Vec<BookmarkNode>, ExtensionError>;
}

/// A bookmark tree held in memory.
#[derive(Debug, Default, Clone)]
pub struct StaticBookmarks {
    nodes: Arc<RwLock<Vec<BookmarkNode>>>,
}

impl StaticBookmarks {
    #[must_use]
    pub fn new(nodes: Vec<BookmarkNode>) -> Self {
        Self {
            nodes: Arc::new(RwLock::new(nodes)),
        }
    }

    pub async fn replace(&self, nodes: Vec<BookmarkNode>) {
        *self.nodes.write().await = nodes;
    }
}

#[async_trait]
impl BookmarkSource for StaticBookmarks {
    async fn tree(&self) -> Result<Vec<BookmarkNode>, ExtensionError> {
        Ok(self.nodes.read().await.clone())
    }
}
