use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::{Interactions, Kind};
use crate::bookmarks::BookmarkCard;
use crate::db::Database;
use crate::error::AppError;
use crate::identity::Caller;
use crate::model::Bookmark;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toggled {
    pub bookmark_id: String,
    pub kind: Kind,
    pub active: bool,
    pub count: i64,
}

/// Aggregate like/favorite counts plus the marks of one acting identity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InteractionBoard {
    pub likes: HashMap<String, i64>,
    pub favorites: HashMap<String, i64>,
    pub liked: HashSet<String>,
    pub favorited: HashSet<String>,
}

impl InteractionBoard {
    /// Likes are looked up for the acting identity (user or anonymous id),
    /// favorites only for a signed-in user.
    pub async fn load(db: &Database, caller: &Caller) -> Result<Self, AppError> {
        let store = Interactions::new(db.connection());

        let mut board = InteractionBoard {
            likes: store.counts(Kind::Like).await?,
            favorites: store.counts(Kind::Favorite).await?,
            ..Default::default()
        };
        if let Some(actor) = caller.acting_id() {
            board.liked = store.marked_by(Kind::Like, &actor).await?;
        }
        if let Some(user_id) = caller.user_id() {
            board.favorited = store.marked_by(Kind::Favorite, user_id).await?;
        }
        Ok(board)
    }

    fn parts(&mut self, kind: Kind) -> (&mut HashMap<String, i64>, &mut HashSet<String>) {
        match kind {
            Kind::Like => (&mut self.likes, &mut self.liked),
            Kind::Favorite => (&mut self.favorites, &mut self.favorited),
        }
    }

    pub fn count(&self, kind: Kind, bookmark_id: &str) -> i64 {
        let counts = match kind {
            Kind::Like => &self.likes,
            Kind::Favorite => &self.favorites,
        };
        counts.get(bookmark_id).copied().unwrap_or(0)
    }

    pub fn is_liked(&self, bookmark_id: &str) -> bool {
        self.liked.contains(bookmark_id)
    }

    pub fn is_favorited(&self, bookmark_id: &str) -> bool {
        self.favorited.contains(bookmark_id)
    }

    /// Likes plus favorites, the trending score.
    pub fn score(&self, bookmark_id: &str) -> i64 {
        self.count(Kind::Like, bookmark_id) + self.count(Kind::Favorite, bookmark_id)
    }

    pub fn card(&self, bookmark: Bookmark) -> BookmarkCard {
        BookmarkCard {
            likes: self.count(Kind::Like, &bookmark.id),
            favorites: self.count(Kind::Favorite, &bookmark.id),
            liked: self.is_liked(&bookmark.id),
            favorited: self.is_favorited(&bookmark.id),
            bookmark,
        }
    }

    /// Flips the local mark and count; the count never drops below zero.
    /// Returns the new active state.
    fn flip(&mut self, kind: Kind, bookmark_id: &str) -> bool {
        let (counts, marked) = self.parts(kind);
        let count = counts.entry(bookmark_id.to_string()).or_insert(0);
        if marked.remove(bookmark_id) {
            *count = (*count - 1).max(0);
            false
        } else {
            marked.insert(bookmark_id.to_string());
            *count += 1;
            true
        }
    }

    async fn toggle(&mut self, db: &Database, kind: Kind, actor: &str, bookmark_id: &str) -> Result<Toggled, AppError> {
        let before = self.count(kind, bookmark_id);
        let active = self.flip(kind, bookmark_id);

        let store = Interactions::new(db.connection());
        let written = if active {
            store.insert(kind, actor, bookmark_id).await
        } else {
            store.remove(kind, actor, bookmark_id).await
        };

        let failure = match written {
            Ok(true) => None,
            Ok(false) => Some(AppError::NotFound),
            Err(e) => Some(AppError::from(e)),
        };
        if let Some(err) = failure {
            // undo the optimistic change so local state matches the store
            self.flip(kind, bookmark_id);
            let (counts, _) = self.parts(kind);
            counts.insert(bookmark_id.to_string(), before);
            tracing::warn!(bookmark_id, ?kind, error = %err, "interaction toggle rolled back");
            return Err(err);
        }

        tracing::info!(bookmark_id, ?kind, active, "interaction toggled");
        Ok(Toggled {
            bookmark_id: bookmark_id.to_string(),
            kind,
            active,
            count: self.count(kind, bookmark_id),
        })
    }

    /// Likes are open to anonymous callers; the caller gets an anonymous id
    /// minted when it has none.
    pub async fn toggle_like(&mut self, db: &Database, caller: &mut Caller, bookmark_id: &str) -> Result<Toggled, AppError> {
        let minted = caller.acting_id().is_none();
        let actor = caller.ensure_acting_id();
        if minted {
            self.liked.clear();
        }
        self.toggle(db, Kind::Like, &actor, bookmark_id).await
    }

    pub async fn toggle_favorite(&mut self, db: &Database, caller: &Caller, bookmark_id: &str) -> Result<Toggled, AppError> {
        let session = caller.require_user()?;
        self.toggle(db, Kind::Favorite, &session.user.id, bookmark_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::{BookmarkBoard, Scope};
    use crate::testing::{input, sign_up, test_db};
    use crate::lang::Language;

    async fn seed(db: &Database) -> String {
        let owner = sign_up(db, "owner@example.com").await;
        let mut board = BookmarkBoard::load(db, &owner, Scope::language(Language::En)).await.unwrap();
        board.add(input("https://b.io", &[], true)).await.unwrap().id
    }

    #[tokio::test]
    async fn test_anonymous_like_round_trip() {
        let (db, _dir) = test_db().await;
        let id = seed(&db).await;

        let mut anon = Caller::anonymous(None, Language::En);
        let mut board = InteractionBoard::load(&db, &anon).await.unwrap();

        let first = board.toggle_like(&db, &mut anon, &id).await.unwrap();
        assert!(first.active);
        assert_eq!(first.count, 1);
        let anon_id = anon.anonymous_id.clone().unwrap();

        // a later request carrying the persisted id sees its own like
        let mut returning = Caller::anonymous(Some(anon_id.clone()), Language::En);
        let mut board = InteractionBoard::load(&db, &returning).await.unwrap();
        assert!(board.is_liked(&id));

        let second = board.toggle_like(&db, &mut returning, &id).await.unwrap();
        assert!(!second.active);
        assert_eq!(second.count, 0);
        assert_eq!(returning.anonymous_id.as_deref(), Some(anon_id.as_str()));

        let fresh = InteractionBoard::load(&db, &returning).await.unwrap();
        assert_eq!(fresh.count(Kind::Like, &id), 0);
        assert!(!fresh.is_liked(&id));
    }

    #[tokio::test]
    async fn test_anonymous_id_cannot_act_as_user() {
        let (db, _dir) = test_db().await;
        let id = seed(&db).await;
        let mut alice = sign_up(&db, "alice@example.com").await;
        let alice_id = alice.user_id().unwrap().to_string();

        let mut board = InteractionBoard::load(&db, &alice).await.unwrap();
        board.toggle_like(&db, &mut alice, &id).await.unwrap();

        let mut impostor = Caller::anonymous(Some(alice_id), Language::En);
        let mut board = InteractionBoard::load(&db, &impostor).await.unwrap();
        assert!(!board.is_liked(&id));
        let toggled = board.toggle_like(&db, &mut impostor, &id).await.unwrap();
        assert!(toggled.active);
        assert_eq!(toggled.count, 2);

        let alice_view = InteractionBoard::load(&db, &alice).await.unwrap();
        assert!(alice_view.is_liked(&id));
        assert_eq!(alice_view.count(Kind::Like, &id), 2);
    }

    #[tokio::test]
    async fn test_authenticated_like_round_trip() {
        let (db, _dir) = test_db().await;
        let id = seed(&db).await;
        let mut alice = sign_up(&db, "alice@example.com").await;

        let mut board = InteractionBoard::load(&db, &alice).await.unwrap();
        let original = board.count(Kind::Like, &id);
        board.toggle_like(&db, &mut alice, &id).await.unwrap();
        assert_eq!(board.count(Kind::Like, &id), original + 1);
        board.toggle_like(&db, &mut alice, &id).await.unwrap();
        assert_eq!(board.count(Kind::Like, &id), original);
        assert!(alice.anonymous_id.is_none());
    }

    #[tokio::test]
    async fn test_favorite_requires_session() {
        let (db, _dir) = test_db().await;
        let id = seed(&db).await;

        let anon = Caller::anonymous(Some("anon-1".into()), Language::En);
        let mut board = InteractionBoard::load(&db, &anon).await.unwrap();
        let err = board.toggle_favorite(&db, &anon, &id).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired));
        assert_eq!(board.count(Kind::Favorite, &id), 0);

        let alice = sign_up(&db, "alice@example.com").await;
        let mut board = InteractionBoard::load(&db, &alice).await.unwrap();
        let toggled = board.toggle_favorite(&db, &alice, &id).await.unwrap();
        assert!(toggled.active);
        assert_eq!(board.score(&id), 1);
        assert!(InteractionBoard::load(&db, &alice).await.unwrap().is_favorited(&id));
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back() {
        let (db, _dir) = test_db().await;
        let mut alice = sign_up(&db, "alice@example.com").await;
        let mut board = InteractionBoard::load(&db, &alice).await.unwrap();

        let err = board.toggle_like(&db, &mut alice, "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
        assert_eq!(board.count(Kind::Like, "missing"), 0);
        assert!(!board.is_liked("missing"));
    }

    #[test]
    fn test_decrement_clamps_at_zero() {
        let mut board = InteractionBoard::default();
        board.liked.insert("a".into());
        assert!(!board.flip(Kind::Like, "a"));
        assert_eq!(board.count(Kind::Like, "a"), 0);
    }
}
