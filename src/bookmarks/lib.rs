use anyhow::Result;
use libsql::Connection;

use crate::db::Database;
use crate::model::{Bookmark, BookmarkInput, LanguageStats};
use crate::views;

const SELECT_BOOKMARK: &str = r#"
    SELECT
        bookmarks.id,
        bookmarks.user_id,
        bookmarks.url,
        bookmarks.title,
        bookmarks.description,
        bookmarks.tags,
        bookmarks.is_public,
        bookmarks.created_at,
        bookmarks.language,
        COALESCE(pinned_bookmarks.is_pinned, 0) AS is_pinned
    FROM bookmarks
    LEFT JOIN pinned_bookmarks ON pinned_bookmarks.bookmark_id = bookmarks.id
"#;

pub struct Bookmarks<'a> {
    db: &'a Database,
}

impl<'a> Bookmarks<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn conn(&self) -> &Connection {
        self.db.connection()
    }

    /// Public bookmarks plus the viewer's own, newest first. `language`
    /// narrows to one language; `None` spans all of them.
    pub async fn list(&self, viewer: Option<&str>, language: Option<&str>) -> Result<Vec<Bookmark>> {
        let query = format!(
            r#"{SELECT_BOOKMARK}
            WHERE (?1 IS NULL OR bookmarks.language = ?1)
              AND (bookmarks.is_public = 1 OR bookmarks.user_id = ?2)
            ORDER BY bookmarks.created_at DESC, bookmarks.rowid DESC
            "#
        );

        let mut rows = self
            .conn()
            .query(
                &query,
                libsql::params![language.map(str::to_string), viewer.map(str::to_string)],
            )
            .await?;

        let mut bookmarks = Vec::new();
        while let Some(row) = rows.next().await? {
            bookmarks.push(Self::row_to_bookmark(&row)?);
        }
        Ok(bookmarks)
    }

    /// Fetches a bookmark regardless of visibility.
    pub async fn get(&self, id: &str) -> Result<Option<Bookmark>> {
        let query = format!("{SELECT_BOOKMARK} WHERE bookmarks.id = ?");
        let mut rows = self.conn().query(&query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_bookmark(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn insert(
        &self,
        id: &str,
        owner: &str,
        input: &BookmarkInput,
        language: &str,
        created_at: &str,
    ) -> Result<()> {
        let query = r#"
            INSERT INTO bookmarks (id, user_id, url, title, description, tags, is_public, created_at, language)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        self.conn()
            .execute(
                query,
                libsql::params![
                    id,
                    owner,
                    input.url.as_str(),
                    input.title.as_str(),
                    input.description.as_str(),
                    serde_json::to_string(&input.tags)?,
                    input.is_public as i64,
                    created_at,
                    language
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn update(&self, id: &str, input: &BookmarkInput, language: &str) -> Result<bool> {
        let query = r#"
            UPDATE bookmarks
            SET url = ?, title = ?, description = ?, tags = ?, is_public = ?, language = ?
            WHERE id = ?
        "#;

        let updated = self
            .conn()
            .execute(
                query,
                libsql::params![
                    input.url.as_str(),
                    input.title.as_str(),
                    input.description.as_str(),
                    serde_json::to_string(&input.tags)?,
                    input.is_public as i64,
                    language,
                    id
                ],
            )
            .await?;
        Ok(updated > 0)
    }

    /// Deletes a bookmark. Its likes, favorites and pin go with it through
    /// the `bookmarks_delete_relations` trigger, in the same statement.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM bookmarks WHERE id = ?", libsql::params![id])
            .await?;
        Ok(deleted > 0)
    }

    /// Flips the pin flag in one statement, creating the row as pinned when
    /// absent. Returns the new state.
    pub async fn toggle_pin(&self, bookmark_id: &str) -> Result<bool> {
        let query = r#"
            INSERT INTO pinned_bookmarks (id, bookmark_id, is_pinned, created_at)
            VALUES (?, ?, 1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            ON CONFLICT(bookmark_id) DO UPDATE SET is_pinned = 1 - pinned_bookmarks.is_pinned
            RETURNING is_pinned
        "#;

        let mut rows = self
            .conn()
            .query(
                query,
                libsql::params![uuid::Uuid::new_v4().to_string(), bookmark_id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let pinned: i64 = row.get(0)?;
            Ok(pinned != 0)
        } else {
            anyhow::bail!("Failed to toggle pin for bookmark {}", bookmark_id)
        }
    }

    /// Counts per language over the owner's bookmarks, or over public ones
    /// when there is no owner.
    pub async fn language_stats(&self, owner: Option<&str>) -> Result<LanguageStats> {
        let mut rows = match owner {
            Some(owner) => {
                self.conn()
                    .query("SELECT language FROM bookmarks WHERE user_id = ?", libsql::params![owner])
                    .await?
            }
            None => {
                self.conn()
                    .query("SELECT language FROM bookmarks WHERE is_public = 1", ())
                    .await?
            }
        };

        let mut languages: Vec<String> = Vec::new();
        while let Some(row) = rows.next().await? {
            languages.push(row.get(0)?);
        }
        Ok(views::language_stats(languages.iter().map(String::as_str)))
    }

    fn row_to_bookmark(row: &libsql::Row) -> Result<Bookmark> {
        let tags: String = row.get::<Option<String>>(5)?.unwrap_or_default();
        let tags: Vec<String> = if tags.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&tags)
                .map_err(|e| anyhow::anyhow!("failed to decode tags: {e}"))?
        };

        Ok(Bookmark {
            id: row.get(0)?,
            user_id: row.get(1)?,
            url: row.get(2)?,
            title: row.get::<Option<String>>(3)?.unwrap_or_default(),
            description: row.get::<Option<String>>(4)?.unwrap_or_default(),
            tags,
            is_public: row.get::<i64>(6)? != 0,
            created_at: row.get(7)?,
            language: row.get(8)?,
            is_pinned: row.get::<i64>(9)? != 0,
        })
    }
}
