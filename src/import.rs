//! Chrome bookmarks export parsing.
//!
//! The export is a JSON document whose `roots` hold the bookmark bar, the
//! "other bookmarks" folder and the synced folder. Every `url` node becomes a
//! private bookmark input; folders are walked recursively.

use serde_json::Value;

use crate::error::AppError;
use crate::model::BookmarkInput;

const ROOTS: [&str; 3] = ["bookmark_bar", "other", "synced"];

fn string_field(node: &Value, key: &str) -> String {
    node.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Walks one node. Anything that is not an object is skipped; a `url` node
/// with a missing or non-string URL becomes an input with an empty URL, which
/// the import then counts as failed.
fn collect(node: &Value, out: &mut Vec<BookmarkInput>) {
    if !node.is_object() {
        return;
    }
    if node.get("type").and_then(Value::as_str) == Some("url") {
        out.push(BookmarkInput {
            url: string_field(node, "url"),
            title: string_field(node, "name"),
            description: String::new(),
            tags: Vec::new(),
            is_public: false,
        });
    }
    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            collect(child, out);
        }
    }
}

/// Parses an export into bookmark inputs in document order. Entries without a
/// usable URL are kept so the import can count them as failures; absent or
/// null roots are skipped.
pub fn parse_chrome(text: &str) -> Result<Vec<BookmarkInput>, AppError> {
    let document: Value = serde_json::from_str(text).map_err(|e| AppError::Parse(e.to_string()))?;

    let Some(roots) = document.get("roots").and_then(Value::as_object) else {
        return Err(AppError::Parse("missing roots".to_string()));
    };

    let mut inputs = Vec::new();
    for name in ROOTS {
        if let Some(root) = roots.get(name) {
            collect(root, &mut inputs);
        }
    }

    tracing::debug!(entries = inputs.len(), "parsed bookmark export");
    Ok(inputs)
}
