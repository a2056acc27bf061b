//! Fixtures shared by the unit tests.

use tempfile::TempDir;

use crate::auth::{Auth, Credentials};
use crate::db::Database;
use crate::identity::Caller;
use crate::lang::Language;
use crate::model::BookmarkInput;

pub const PASSWORD: &str = "secret123";

/// Fresh migrated database in a temp dir; keep the dir alive for the test.
pub async fn test_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_local(&dir.path().join("test.db")).await.unwrap();
    (db, dir)
}

pub async fn sign_up(db: &Database, email: &str) -> Caller {
    let session = Auth::new(db.connection(), 24)
        .sign_up(Credentials {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    Caller::signed_in(session, Language::En)
}

pub async fn admin(db: &Database, email: &str) -> Caller {
    sign_up(db, email).await;
    let auth = Auth::new(db.connection(), 24);
    assert!(auth.grant_admin(email).await.unwrap());
    let session = auth
        .sign_in(Credentials {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .unwrap();
    Caller::signed_in(session, Language::En)
}

pub fn input(url: &str, tags: &[&str], is_public: bool) -> BookmarkInput {
    BookmarkInput {
        url: url.to_string(),
        title: format!("Title for {url}"),
        description: String::new(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        is_public,
    }
}
