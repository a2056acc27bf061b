use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: String,
    pub language: String,
    #[serde(default)]
    pub is_pinned: bool,
}

/// Editable fields of a bookmark, as submitted by the form or an import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkInput {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

impl BookmarkInput {
    /// Trims fields and drops empty or repeated tags, keeping first occurrence.
    pub fn normalized(mut self) -> Self {
        self.url = self.url.trim().to_string();
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        self.tags = tags;
        self
    }
}

/// Language code to bookmark count.
pub type LanguageStats = BTreeMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub slug: String,
    pub count: i64,
}
