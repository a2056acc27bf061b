use serde::{Deserialize, Serialize};

use super::Bookmarks;
use crate::auth::now_timestamp;
use crate::db::Database;
use crate::error::AppError;
use crate::identity::Caller;
use crate::interactions::InteractionBoard;
use crate::lang::{self, Language};
use crate::model::{Bookmark, BookmarkInput, LanguageStats, TagCount};
use crate::views;

/// Which bookmarks a board is loaded for.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub language: Language,
    /// Selected tag slug. A tag page spans every language.
    pub tag: Option<String>,
}

impl Scope {
    pub fn language(language: Language) -> Self {
        Scope { language, tag: None }
    }

    pub fn tag(language: Language, slug: impl Into<String>) -> Self {
        Scope {
            language,
            tag: Some(slug.into()),
        }
    }

    fn language_filter(&self) -> Option<&'static str> {
        match self.tag {
            Some(_) => None,
            None => Some(self.language.code()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    All,
    Mine,
    Favorites,
    Trending,
}

impl ViewKind {
    pub fn default_for(caller: &Caller) -> Self {
        match caller.session {
            Some(_) => ViewKind::All,
            None => ViewKind::Trending,
        }
    }
}

/// A bookmark with its interaction counts and the caller's marks.
#[derive(Debug, Clone, Serialize)]
pub struct BookmarkCard {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    pub likes: i64,
    pub favorites: i64,
    pub liked: bool,
    pub favorited: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub view: ViewKind,
    pub language: Language,
    pub tag: Option<String>,
    /// Where the tag page lives when its bookmarks are in another language.
    pub canonical_path: Option<String>,
    pub bookmarks: Vec<BookmarkCard>,
    pub stats: LanguageStats,
    pub popular_tags: Vec<TagCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub bookmarks: Vec<Bookmark>,
    pub stats: LanguageStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub failed: usize,
    pub message: String,
}

impl ImportReport {
    pub fn new(imported: usize, failed: usize) -> Self {
        let message = if failed > 0 {
            format!("Imported {} bookmarks, {} failed", imported, failed)
        } else {
            format!("Imported {} bookmarks", imported)
        };
        ImportReport {
            imported,
            failed,
            message,
        }
    }
}

fn validate(input: BookmarkInput) -> Result<BookmarkInput, AppError> {
    let input = input.normalized();
    if input.url.is_empty() {
        return Err(AppError::Validation("url is required".to_string()));
    }
    match url::Url::parse(&input.url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(input),
        _ => Err(AppError::Validation(format!("invalid url: {}", input.url))),
    }
}

/// Bookmarks and language stats as seen by one caller, re-fetched after
/// every mutation.
pub struct BookmarkBoard<'a> {
    db: &'a Database,
    caller: &'a Caller,
    scope: Scope,
    bookmarks: Vec<Bookmark>,
    stats: LanguageStats,
}

impl<'a> BookmarkBoard<'a> {
    pub async fn load(db: &'a Database, caller: &'a Caller, scope: Scope) -> Result<Self, AppError> {
        let mut board = BookmarkBoard {
            db,
            caller,
            scope,
            bookmarks: Vec::new(),
            stats: LanguageStats::new(),
        };
        board.refresh().await?;
        Ok(board)
    }

    fn store(&self) -> Bookmarks<'a> {
        Bookmarks::new(self.db)
    }

    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let store = self.store();
        self.bookmarks = store
            .list(self.caller.user_id(), self.scope.language_filter())
            .await?;
        self.stats = store.language_stats(self.caller.user_id()).await?;
        Ok(())
    }

    pub fn list(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn stats(&self) -> &LanguageStats {
        &self.stats
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            bookmarks: self.bookmarks.clone(),
            stats: self.stats.clone(),
        }
    }

    async fn persist(&self, input: BookmarkInput) -> Result<Bookmark, AppError> {
        let session = self.caller.require_user()?;
        let input = validate(input)?;
        let id = uuid::Uuid::new_v4().to_string();
        let language = self.caller.language.code();

        self.store()
            .insert(&id, &session.user.id, &input, language, &now_timestamp())
            .await?;

        self.store().get(&id).await?.ok_or(AppError::NotFound)
    }

    pub async fn add(&mut self, input: BookmarkInput) -> Result<Bookmark, AppError> {
        let bookmark = self.persist(input).await?;
        tracing::info!(bookmark_id = %bookmark.id, user_id = %bookmark.user_id, "bookmark added");
        self.refresh().await?;
        Ok(bookmark)
    }

    /// Loads the bookmark and checks the caller owns it or is an admin.
    async fn authorize(&self, id: &str) -> Result<Bookmark, AppError> {
        let session = self.caller.require_user()?;
        let bookmark = self.store().get(id).await?.ok_or(AppError::NotFound)?;
        if bookmark.user_id != session.user.id && !session.is_admin {
            tracing::warn!(bookmark_id = %id, user_id = %session.user.id, "mutation by non-owner rejected");
            return Err(AppError::PermissionDenied);
        }
        Ok(bookmark)
    }

    pub async fn update(&mut self, id: &str, input: BookmarkInput) -> Result<Bookmark, AppError> {
        self.authorize(id).await?;
        let input = validate(input)?;

        if !self.store().update(id, &input, self.caller.language.code()).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(bookmark_id = %id, "bookmark updated");

        self.refresh().await?;
        self.store().get(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), AppError> {
        self.authorize(id).await?;

        if !self.store().delete(id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(bookmark_id = %id, "bookmark deleted");

        self.refresh().await
    }

    /// Admin only. Returns the new pin state.
    pub async fn toggle_pin(&mut self, id: &str) -> Result<bool, AppError> {
        self.caller.require_user()?;
        if !self.caller.is_admin() {
            return Err(AppError::PermissionDenied);
        }
        if self.store().get(id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let pinned = self.store().toggle_pin(id).await?;
        tracing::info!(bookmark_id = %id, pinned, "pin toggled");

        self.refresh().await?;
        Ok(pinned)
    }

    /// Adds every entry as its own bookmark, counting failures instead of
    /// stopping, and refreshes once at the end.
    pub async fn import(&mut self, inputs: Vec<BookmarkInput>) -> Result<ImportReport, AppError> {
        self.caller.require_user()?;

        let mut imported = 0;
        let mut failed = 0;
        for input in inputs {
            match self.persist(input).await {
                Ok(_) => imported += 1,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to import bookmark");
                    failed += 1;
                }
            }
        }

        self.refresh().await?;
        Ok(ImportReport::new(imported, failed))
    }

    /// The bookmarks of `view`, then tag and search filters.
    pub fn view(&self, view: ViewKind, interactions: &InteractionBoard, search: &str) -> Vec<&Bookmark> {
        let base: Vec<&Bookmark> = match view {
            ViewKind::All => self.bookmarks.iter().filter(|b| b.is_public).collect(),
            ViewKind::Mine => match self.caller.user_id() {
                Some(user_id) => self.bookmarks.iter().filter(|b| b.user_id == user_id).collect(),
                None => Vec::new(),
            },
            ViewKind::Favorites => self
                .bookmarks
                .iter()
                .filter(|b| interactions.is_favorited(&b.id))
                .collect(),
            ViewKind::Trending => views::trending(&self.bookmarks, |b| interactions.score(&b.id)),
        };

        views::filter(base, self.scope.tag.as_deref(), search, self.caller.language)
    }

    /// Path of the tag page in the language of its first bookmark, when that
    /// differs from the active one.
    pub fn canonical_tag_path(&self) -> Option<String> {
        let slug = self.scope.tag.as_deref()?;
        let first = self
            .bookmarks
            .iter()
            .find(|b| views::has_tag_slug(b, slug, self.caller.language))?;
        let language = Language::from_code(&first.language)?;
        if language == self.caller.language {
            return None;
        }
        Some(lang::localized_path(language, &format!("tag/{}", slug)))
    }

    pub fn listing(&self, view: ViewKind, interactions: &InteractionBoard, search: &str) -> Listing {
        let bookmarks = self
            .view(view, interactions, search)
            .into_iter()
            .map(|b| interactions.card(b.clone()))
            .collect();

        Listing {
            view,
            language: self.caller.language,
            tag: self.scope.tag.clone(),
            canonical_path: self.canonical_tag_path(),
            bookmarks,
            stats: self.stats.clone(),
            popular_tags: views::popular_tags(&self.bookmarks, self.caller.language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, input, sign_up, test_db};

    #[tokio::test]
    async fn test_add_requires_session() {
        let (db, _dir) = test_db().await;
        let anon = Caller::anonymous(None, Language::En);
        let mut board = BookmarkBoard::load(&db, &anon, Scope::language(Language::En)).await.unwrap();

        let err = board.add(input("https://a.io", &[], true)).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired));
        assert!(board.list().is_empty());
        assert!(Bookmarks::new(&db).list(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_refreshes_list_and_stats() {
        let (db, _dir) = test_db().await;
        let alice = sign_up(&db, "alice@example.com").await;
        let mut board = BookmarkBoard::load(&db, &alice, Scope::language(Language::En)).await.unwrap();

        let added = board.add(input("https://a.io", &["rust", "rust"], false)).await.unwrap();
        assert_eq!(added.user_id, alice.user_id().unwrap());
        assert_eq!(added.language, "en");
        assert_eq!(added.tags, vec!["rust".to_string()]);
        assert_eq!(board.list().len(), 1);
        assert_eq!(board.stats().get("en"), Some(&1));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_url() {
        let (db, _dir) = test_db().await;
        let alice = sign_up(&db, "alice@example.com").await;
        let mut board = BookmarkBoard::load(&db, &alice, Scope::language(Language::En)).await.unwrap();

        assert!(matches!(board.add(input("", &[], true)).await, Err(AppError::Validation(_))));
        assert!(matches!(board.add(input("not a url", &[], true)).await, Err(AppError::Validation(_))));
        assert!(board.list().is_empty());
    }

    #[tokio::test]
    async fn test_non_owner_cannot_delete_private_bookmark() {
        let (db, _dir) = test_db().await;
        let alice = sign_up(&db, "alice@example.com").await;
        let bob = sign_up(&db, "bob@example.com").await;

        let mut alice_board = BookmarkBoard::load(&db, &alice, Scope::language(Language::En)).await.unwrap();
        let private = alice_board.add(input("https://secret.io", &[], false)).await.unwrap();

        let mut bob_board = BookmarkBoard::load(&db, &bob, Scope::language(Language::En)).await.unwrap();
        assert!(bob_board.list().is_empty());
        let err = bob_board.delete(&private.id).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));
        let err = bob_board.update(&private.id, input("https://x.io", &[], true)).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));

        alice_board.refresh().await.unwrap();
        assert_eq!(alice_board.list().len(), 1);
        assert_eq!(alice_board.list()[0].url, "https://secret.io");
    }

    #[tokio::test]
    async fn test_owner_and_admin_can_mutate() {
        let (db, _dir) = test_db().await;
        let alice = sign_up(&db, "alice@example.com").await;
        let root = admin(&db, "root@example.com").await;

        let mut alice_board = BookmarkBoard::load(&db, &alice, Scope::language(Language::En)).await.unwrap();
        let first = alice_board.add(input("https://a.io", &[], true)).await.unwrap();
        let second = alice_board.add(input("https://b.io", &[], true)).await.unwrap();

        let updated = alice_board
            .update(&first.id, input("https://a2.io", &["new"], true))
            .await
            .unwrap();
        assert_eq!(updated.url, "https://a2.io");
        assert_eq!(updated.tags, vec!["new".to_string()]);

        let mut root_board = BookmarkBoard::load(&db, &root, Scope::language(Language::En)).await.unwrap();
        root_board.delete(&second.id).await.unwrap();
        assert_eq!(root_board.list().len(), 1);

        assert!(matches!(alice_board.delete("missing").await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_toggle_pin_requires_admin() {
        let (db, _dir) = test_db().await;
        let alice = sign_up(&db, "alice@example.com").await;
        let root = admin(&db, "root@example.com").await;

        let mut alice_board = BookmarkBoard::load(&db, &alice, Scope::language(Language::En)).await.unwrap();
        let bookmark = alice_board.add(input("https://a.io", &[], true)).await.unwrap();

        let err = alice_board.toggle_pin(&bookmark.id).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));
        assert!(!Bookmarks::new(&db).get(&bookmark.id).await.unwrap().unwrap().is_pinned);

        let anon = Caller::anonymous(None, Language::En);
        let mut anon_board = BookmarkBoard::load(&db, &anon, Scope::language(Language::En)).await.unwrap();
        assert!(matches!(anon_board.toggle_pin(&bookmark.id).await, Err(AppError::AuthRequired)));

        let mut root_board = BookmarkBoard::load(&db, &root, Scope::language(Language::En)).await.unwrap();
        assert!(root_board.toggle_pin(&bookmark.id).await.unwrap());
        assert!(root_board.list()[0].is_pinned);
        assert!(!root_board.toggle_pin(&bookmark.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_tag_scope_spans_languages() {
        let (db, _dir) = test_db().await;
        let alice = sign_up(&db, "alice@example.com").await;
        let mut german = alice.clone();
        german.language = Language::De;

        let mut en_board = BookmarkBoard::load(&db, &alice, Scope::language(Language::En)).await.unwrap();
        en_board.add(input("https://a.io", &["Rust Lang"], true)).await.unwrap();
        let mut de_board = BookmarkBoard::load(&db, &german, Scope::language(Language::De)).await.unwrap();
        de_board.add(input("https://b.io", &["rust-lang"], true)).await.unwrap();
        de_board.add(input("https://c.io", &["go"], true)).await.unwrap();

        en_board.refresh().await.unwrap();
        assert_eq!(en_board.list().len(), 1);

        let anon = Caller::anonymous(None, Language::En);
        let tag_board = BookmarkBoard::load(&db, &anon, Scope::tag(Language::En, "rust-lang")).await.unwrap();
        assert_eq!(tag_board.list().len(), 3);

        let interactions = InteractionBoard::default();
        let hits = tag_board.view(ViewKind::All, &interactions, "");
        assert_eq!(hits.len(), 2);
        let hits = tag_board.view(ViewKind::All, &interactions, "B.IO");
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_canonical_tag_path() {
        let (db, _dir) = test_db().await;
        let mut german = sign_up(&db, "alice@example.com").await;
        german.language = Language::De;
        let mut board = BookmarkBoard::load(&db, &german, Scope::language(Language::De)).await.unwrap();
        board.add(input("https://b.io", &["Werkzeuge"], true)).await.unwrap();

        let anon = Caller::anonymous(None, Language::En);
        let tag_board = BookmarkBoard::load(&db, &anon, Scope::tag(Language::En, "werkzeuge")).await.unwrap();
        assert_eq!(tag_board.canonical_tag_path(), Some("/de/tag/werkzeuge".to_string()));
    }

    #[test]
    fn test_import_report_message() {
        assert_eq!(ImportReport::new(3, 1).message, "Imported 3 bookmarks, 1 failed");
        assert_eq!(ImportReport::new(2, 0).message, "Imported 2 bookmarks");
    }
}
