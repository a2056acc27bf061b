use std::num::NonZeroU32;

use anyhow::Result;
use chrono::{Duration, SecondsFormat, Utc};
use libsql::Connection;
use ring::pbkdf2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

const PBKDF2_ROUNDS: u32 = if cfg!(test) { 1_000 } else { 100_000 };
const PBKDF2_ITERATIONS: NonZeroU32 = NonZeroU32::MIN.saturating_add(PBKDF2_ROUNDS - 1);
const PASSWORD_HASH_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub is_admin: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hash = [0u8; PASSWORD_HASH_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        salt.as_bytes(),
        password.as_bytes(),
        &mut hash,
    );
    hex::encode(hash)
}

fn verify_password(salt: &str, password: &str, stored: &str) -> bool {
    let Ok(stored) = hex::decode(stored) else {
        return false;
    };
    pbkdf2::verify(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        salt.as_bytes(),
        password.as_bytes(),
        &stored,
    )
    .is_ok()
}

/// Sessions are stored under the SHA-256 of their token; the raw token only
/// ever lives with the client.
fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn validate(credentials: &Credentials) -> Result<String, AppError> {
    let email = credentials.email.trim().to_lowercase();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    if credentials.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(email)
}

pub struct Auth<'a> {
    conn: &'a Connection,
    session_ttl: Duration,
}

impl<'a> Auth<'a> {
    pub fn new(conn: &'a Connection, session_ttl_hours: i64) -> Self {
        Self {
            conn,
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    pub async fn sign_up(&self, credentials: Credentials) -> Result<Session, AppError> {
        let email = validate(&credentials)?;
        let id = uuid::Uuid::new_v4().to_string();
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let password_hash = hash_password(&salt, &credentials.password);

        let query = r#"
            INSERT INTO users (id, email, password_hash, salt, created_at)
            VALUES (?, ?, ?, ?, ?)
        "#;
        let inserted = self
            .conn
            .execute(
                query,
                libsql::params![id.as_str(), email.as_str(), password_hash, salt, now_timestamp()],
            )
            .await;

        if let Err(e) = inserted {
            if e.to_string().contains("UNIQUE") {
                return Err(AppError::Validation("email already registered".to_string()));
            }
            return Err(e.into());
        }

        tracing::info!(user_id = %id, "user signed up");
        Ok(self.create_session(User { id, email }).await?)
    }

    pub async fn sign_in(&self, credentials: Credentials) -> Result<Session, AppError> {
        let email = credentials.email.trim().to_lowercase();
        let query = "SELECT id, email, password_hash, salt FROM users WHERE email = ?";
        let mut rows = self.conn.query(query, libsql::params![email]).await?;

        let Some(row) = rows.next().await? else {
            return Err(AppError::InvalidCredentials);
        };
        let user = User {
            id: row.get(0)?,
            email: row.get(1)?,
        };
        let password_hash: String = row.get(2)?;
        let salt: String = row.get(3)?;

        if !verify_password(&salt, &credentials.password, &password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "user signed in");
        Ok(self.create_session(user).await?)
    }

    pub async fn sign_out(&self, token: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE token = ?", libsql::params![token_digest(token)])
            .await?;
        Ok(deleted > 0)
    }

    async fn create_session(&self, user: User) -> Result<Session> {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let created_at = now_timestamp();
        self.conn
            .execute(
                "INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)",
                libsql::params![token_digest(&token), user.id.as_str(), created_at.as_str()],
            )
            .await?;

        let is_admin = self.is_admin(&user.id).await?;
        Ok(Session {
            token,
            user,
            is_admin,
            created_at,
        })
    }

    fn cutoff(&self) -> String {
        (Utc::now() - self.session_ttl).to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Looks up a live session by token. Expired tokens resolve to `None`.
    pub async fn session(&self, token: &str) -> Result<Option<Session>> {
        let query = r#"
            SELECT sessions.created_at, users.id, users.email
            FROM sessions
            JOIN users ON users.id = sessions.user_id
            WHERE sessions.token = ? AND sessions.created_at >= ?
        "#;
        let mut rows = self
            .conn
            .query(query, libsql::params![token_digest(token), self.cutoff()])
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let created_at: String = row.get(0)?;
        let user = User {
            id: row.get(1)?,
            email: row.get(2)?,
        };
        drop(rows);
        let is_admin = self.is_admin(&user.id).await?;

        Ok(Some(Session {
            token: token.to_string(),
            created_at,
            user,
            is_admin,
        }))
    }

    pub async fn is_admin(&self, user_id: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM admins WHERE user_id = ?", libsql::params![user_id])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Adds the user with `email` to `admins`. Returns `false` when no such
    /// user exists.
    pub async fn grant_admin(&self, email: &str) -> Result<bool> {
        let query = r#"
            INSERT OR IGNORE INTO admins (id, user_id, created_at)
            SELECT ?, id, ? FROM users WHERE email = ?
        "#;
        self.conn
            .execute(
                query,
                libsql::params![uuid::Uuid::new_v4().to_string(), now_timestamp(), email.trim().to_lowercase()],
            )
            .await?;

        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM admins JOIN users ON users.id = admins.user_id WHERE users.email = ?",
                libsql::params![email.trim().to_lowercase()],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        let purged = self
            .conn
            .execute("DELETE FROM sessions WHERE created_at < ?", libsql::params![self.cutoff()])
            .await?;
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_db;

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let (db, _dir) = test_db().await;
        let auth = Auth::new(db.connection(), 24);

        let signed_up = auth.sign_up(creds("Ada@Example.com", "secret123")).await.unwrap();
        assert_eq!(signed_up.user.email, "ada@example.com");
        assert!(!signed_up.is_admin);

        let signed_in = auth.sign_in(creds("ada@example.com", "secret123")).await.unwrap();
        assert_eq!(signed_in.user.id, signed_up.user.id);
        assert_ne!(signed_in.token, signed_up.token);

        let session = auth.session(&signed_in.token).await.unwrap().unwrap();
        assert_eq!(session.user, signed_up.user);
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (db, _dir) = test_db().await;
        let auth = Auth::new(db.connection(), 24);
        auth.sign_up(creds("ada@example.com", "secret123")).await.unwrap();

        let err = auth.sign_in(creds("ada@example.com", "nope-nope")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        let err = auth.sign_in(creds("bob@example.com", "secret123")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[test]
    fn test_password_hash_is_stretched() {
        let hash = hash_password("salt", "secret123");
        let plain = hex::encode(Sha256::digest(b"salt:secret123"));
        assert_eq!(hash.len(), PASSWORD_HASH_LEN * 2);
        assert_ne!(hash, plain);
        assert!(verify_password("salt", "secret123", &hash));
        assert!(!verify_password("salt", "secret124", &hash));
        assert!(!verify_password("other", "secret123", &hash));
        assert!(!verify_password("salt", "secret123", "not hex"));
    }

    #[tokio::test]
    async fn test_stored_credentials_are_not_plain() {
        let (db, _dir) = test_db().await;
        let auth = Auth::new(db.connection(), 24);
        let session = auth.sign_up(creds("ada@example.com", "secret123")).await.unwrap();

        let mut rows = db.connection().query("SELECT token FROM sessions", ()).await.unwrap();
        let stored: String = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_ne!(stored, session.token);
        assert_eq!(stored, token_digest(&session.token));
        drop(rows);

        let mut rows = db.connection().query("SELECT password_hash FROM users", ()).await.unwrap();
        let stored: String = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert!(!stored.contains("secret123"));
        drop(rows);

        let found = auth.session(&session.token).await.unwrap().unwrap();
        assert_eq!(found.token, session.token);
        assert!(auth.session(&stored).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_and_invalid_sign_up() {
        let (db, _dir) = test_db().await;
        let auth = Auth::new(db.connection(), 24);
        auth.sign_up(creds("ada@example.com", "secret123")).await.unwrap();

        let err = auth.sign_up(creds("ADA@example.com", "another1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = auth.sign_up(creds("not-an-email", "secret123")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = auth.sign_up(creds("bob@example.com", "123")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_sign_out_ends_session() {
        let (db, _dir) = test_db().await;
        let auth = Auth::new(db.connection(), 24);
        let session = auth.sign_up(creds("ada@example.com", "secret123")).await.unwrap();

        assert!(auth.sign_out(&session.token).await.unwrap());
        assert!(auth.session(&session.token).await.unwrap().is_none());
        assert!(!auth.sign_out(&session.token).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_sessions_purged() {
        let (db, _dir) = test_db().await;
        let session = Auth::new(db.connection(), 24)
            .sign_up(creds("ada@example.com", "secret123"))
            .await
            .unwrap();

        // negative TTL puts the cutoff in the future
        let expired = Auth::new(db.connection(), -1);
        assert!(expired.session(&session.token).await.unwrap().is_none());
        assert_eq!(expired.purge_expired_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_grant_admin() {
        let (db, _dir) = test_db().await;
        let auth = Auth::new(db.connection(), 24);
        let session = auth.sign_up(creds("ada@example.com", "secret123")).await.unwrap();

        assert!(!auth.grant_admin("nobody@example.com").await.unwrap());
        assert!(auth.grant_admin("ada@example.com").await.unwrap());
        assert!(auth.grant_admin("ada@example.com").await.unwrap());
        assert!(auth.session(&session.token).await.unwrap().unwrap().is_admin);
    }
}
