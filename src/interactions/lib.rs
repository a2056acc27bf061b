use anyhow::Result;
use libsql::Connection;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Like,
    Favorite,
}

impl Kind {
    pub fn table(&self) -> &'static str {
        match self {
            Kind::Like => "bookmark_likes",
            Kind::Favorite => "bookmark_favorites",
        }
    }
}

pub struct Interactions<'a> {
    conn: &'a Connection,
}

impl<'a> Interactions<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Rows per bookmark for every bookmark that has at least one.
    pub async fn counts(&self, kind: Kind) -> Result<HashMap<String, i64>> {
        let query = format!("SELECT bookmark_id, COUNT(*) FROM {} GROUP BY bookmark_id", kind.table());
        let mut rows = self.conn.query(&query, ()).await?;

        let mut counts = HashMap::new();
        while let Some(row) = rows.next().await? {
            counts.insert(row.get::<String>(0)?, row.get::<i64>(1)?);
        }
        Ok(counts)
    }

    pub async fn marked_by(&self, kind: Kind, user_id: &str) -> Result<HashSet<String>> {
        let query = format!("SELECT bookmark_id FROM {} WHERE user_id = ?", kind.table());
        let mut rows = self.conn.query(&query, libsql::params![user_id]).await?;

        let mut marked = HashSet::new();
        while let Some(row) = rows.next().await? {
            marked.insert(row.get::<String>(0)?);
        }
        Ok(marked)
    }

    /// Records the mark. Returns `false` when the bookmark does not exist.
    pub async fn insert(&self, kind: Kind, user_id: &str, bookmark_id: &str) -> Result<bool> {
        let query = format!(
            r#"
            INSERT INTO {} (id, user_id, bookmark_id, created_at)
            SELECT ?, ?, id, strftime('%Y-%m-%dT%H:%M:%fZ', 'now') FROM bookmarks WHERE id = ?
            "#,
            kind.table()
        );
        let inserted = self
            .conn
            .execute(
                &query,
                libsql::params![uuid::Uuid::new_v4().to_string(), user_id, bookmark_id],
            )
            .await?;
        Ok(inserted > 0)
    }

    pub async fn remove(&self, kind: Kind, user_id: &str, bookmark_id: &str) -> Result<bool> {
        let query = format!("DELETE FROM {} WHERE user_id = ? AND bookmark_id = ?", kind.table());
        let removed = self
            .conn
            .execute(&query, libsql::params![user_id, bookmark_id])
            .await?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::Bookmarks;
    use crate::testing::test_db;
    use crate::model::BookmarkInput;

    #[tokio::test]
    async fn test_insert_count_remove() {
        let (db, _dir) = test_db().await;
        let input = BookmarkInput {
            url: "https://a.io".into(),
            title: String::new(),
            description: String::new(),
            tags: vec![],
            is_public: true,
        };
        Bookmarks::new(&db)
            .insert("a", "alice", &input, "en", "2024-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let store = Interactions::new(db.connection());
        assert!(store.insert(Kind::Like, "u1", "a").await.unwrap());
        assert!(store.insert(Kind::Like, "u2", "a").await.unwrap());
        assert!(store.insert(Kind::Favorite, "u1", "a").await.unwrap());
        assert!(!store.insert(Kind::Like, "u1", "missing").await.unwrap());
        assert!(store.insert(Kind::Like, "u1", "a").await.is_err());

        assert_eq!(store.counts(Kind::Like).await.unwrap().get("a"), Some(&2));
        assert_eq!(store.counts(Kind::Favorite).await.unwrap().get("a"), Some(&1));
        assert!(store.marked_by(Kind::Like, "u2").await.unwrap().contains("a"));

        assert!(store.remove(Kind::Like, "u2", "a").await.unwrap());
        assert!(!store.remove(Kind::Like, "u2", "a").await.unwrap());
        assert_eq!(store.counts(Kind::Like).await.unwrap().get("a"), Some(&1));
    }
}
