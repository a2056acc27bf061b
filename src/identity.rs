//! Per-request caller context.
//!
//! A [`Caller`] is extracted from the request headers and passed explicitly to
//! every operation that depends on who is acting: the bearer session (if any),
//! the client-held anonymous id (if any) and the active display language.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use crate::auth::{Auth, Session};
use crate::error::AppError;
use crate::handler::AppState;
use crate::lang::{self, Language};

pub const ANONYMOUS_ID_HEADER: &str = "x-anonymous-id";

/// Anonymous identities are recorded under this prefix so they can never
/// collide with a user id.
pub const ANONYMOUS_PREFIX: &str = "anon:";

#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub session: Option<Session>,
    pub anonymous_id: Option<String>,
    pub language: Language,
}

impl Caller {
    pub fn anonymous(anonymous_id: Option<String>, language: Language) -> Self {
        Caller {
            session: None,
            anonymous_id,
            language,
        }
    }

    pub fn signed_in(session: Session, language: Language) -> Self {
        Caller {
            session: Some(session),
            anonymous_id: None,
            language,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user.id.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_admin)
    }

    pub fn require_user(&self) -> Result<&Session, AppError> {
        self.session.as_ref().ok_or(AppError::AuthRequired)
    }

    /// Identity recorded on likes: the session user, else the prefixed
    /// anonymous id.
    pub fn acting_id(&self) -> Option<String> {
        match (self.user_id(), self.anonymous_id.as_deref()) {
            (Some(user_id), _) => Some(user_id.to_string()),
            (None, Some(anonymous_id)) => Some(format!("{}{}", ANONYMOUS_PREFIX, anonymous_id)),
            (None, None) => None,
        }
    }

    /// Returns the acting identity, minting an anonymous id when the caller
    /// has none. The minted id must be handed back to the client to persist.
    pub fn ensure_acting_id(&mut self) -> String {
        if let Some(id) = self.acting_id() {
            return id;
        }
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(anonymous_id = %id, "minted anonymous identity");
        let acting = format!("{}{}", ANONYMOUS_PREFIX, id);
        self.anonymous_id = Some(id);
        acting
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Only well-formed UUIDs are accepted as anonymous ids; anything else is
/// ignored and a fresh id is minted on the next like.
fn parse_anonymous_id(value: &str) -> Option<String> {
    uuid::Uuid::parse_str(value).ok().map(|id| id.hyphenated().to_string())
}

fn query_lang(parts: &Parts) -> Option<String> {
    let query = parts.uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "lang")
        .map(|(_, value)| value.into_owned())
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let language = lang::resolve(
            None,
            query_lang(parts).as_deref(),
            header_str(&parts.headers, header::ACCEPT_LANGUAGE),
        );
        let anonymous_id = header_str(&parts.headers, ANONYMOUS_ID_HEADER).and_then(parse_anonymous_id);

        let session = match bearer_token(&parts.headers) {
            Some(token) => {
                Auth::new(state.db.connection(), state.session_ttl_hours)
                    .session(token)
                    .await?
            }
            None => None,
        };

        Ok(Caller {
            session,
            anonymous_id,
            language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;

    fn session(is_admin: bool) -> Session {
        Session {
            token: "t".into(),
            user: User {
                id: "user-1".into(),
                email: "a@b.io".into(),
            },
            is_admin,
            created_at: "2024-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn test_acting_id_prefers_session() {
        let mut caller = Caller::signed_in(session(false), Language::En);
        caller.anonymous_id = Some("anon".into());
        assert_eq!(caller.acting_id().as_deref(), Some("user-1"));
        assert!(caller.require_user().is_ok());
        assert!(!caller.is_admin());
    }

    #[test]
    fn test_ensure_acting_id_mints_once() {
        let mut caller = Caller::anonymous(None, Language::En);
        assert!(matches!(caller.require_user(), Err(AppError::AuthRequired)));
        let first = caller.ensure_acting_id();
        let second = caller.ensure_acting_id();
        assert_eq!(first, second);
        assert_eq!(caller.anonymous_id.as_deref(), first.strip_prefix(ANONYMOUS_PREFIX));
    }

    #[test]
    fn test_anonymous_id_kept_apart_from_user_ids() {
        let caller = Caller::anonymous(Some("user-1".into()), Language::En);
        assert_eq!(caller.acting_id().as_deref(), Some("anon:user-1"));
    }

    #[test]
    fn test_anonymous_id_header_must_be_uuid() {
        assert_eq!(parse_anonymous_id("not-a-uuid"), None);
        assert_eq!(parse_anonymous_id("anon:x"), None);
        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_anonymous_id(&id.simple().to_string()), Some(id.to_string()));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));
        headers.insert(header::AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
