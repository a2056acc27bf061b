//! Display languages and their URL path prefixes.
//!
//! English lives at the bare root (`/`, `/tag/rust`); every other language is
//! prefixed with its two-letter code (`/de`, `/de/tag/rust`).

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Tr,
    Fr,
    De,
    Es,
    It,
    Pt,
}

pub const SUPPORTED: [Language; 7] = [
    Language::En,
    Language::Tr,
    Language::Fr,
    Language::De,
    Language::Es,
    Language::It,
    Language::Pt,
];

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Tr => "tr",
            Language::Fr => "fr",
            Language::De => "de",
            Language::Es => "es",
            Language::It => "it",
            Language::Pt => "pt",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        SUPPORTED.iter().copied().find(|l| l.code() == code)
    }

    /// Picks the first supported language from an `Accept-Language` header value.
    pub fn from_accept_language(header: &str) -> Option<Self> {
        header
            .split(',')
            .filter_map(|part| part.split(';').next())
            .filter_map(|tag| tag.trim().split('-').next())
            .find_map(Language::from_code)
    }

}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

fn is_language_segment(segment: &str) -> bool {
    segment.len() == 2 && segment.bytes().all(|b| b.is_ascii_lowercase())
}

/// Splits a path into its language (if the first segment names a supported
/// one) and the remainder without a leading slash.
pub fn split_path(path: &str) -> (Option<Language>, &str) {
    let trimmed = path.trim_start_matches('/');
    let (first, rest) = match trimmed.split_once('/') {
        Some((first, rest)) => (first, rest),
        None => (trimmed, ""),
    };

    match Language::from_code(first) {
        Some(lang) if is_language_segment(first) => (Some(lang), rest),
        _ => (None, trimmed),
    }
}

/// Builds the path for `rest` under `lang`, collapsing duplicate slashes and
/// dropping a trailing one.
pub fn localized_path(lang: Language, rest: &str) -> String {
    let raw = match lang {
        Language::En => format!("/{}", rest),
        other => format!("/{}/{}", other.code(), rest),
    };

    let mut clean = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '/' && clean.ends_with('/') {
            continue;
        }
        clean.push(ch);
    }
    while clean.len() > 1 && clean.ends_with('/') {
        clean.pop();
    }
    clean
}

/// Rewrites `path` for `target`, keeping everything after the language prefix.
pub fn switch_language(path: &str, target: Language) -> String {
    let (_, rest) = split_path(path);
    localized_path(target, rest)
}

/// Returns the redirect target when the path's leading segment looks like a
/// language code that is not supported, or when the English prefix is spelled
/// out explicitly.
pub fn redirect_for(path: &str) -> Option<String> {
    let trimmed = path.trim_start_matches('/');
    let first = trimmed.split('/').next().unwrap_or("");
    if !is_language_segment(first) {
        return None;
    }

    match Language::from_code(first) {
        Some(Language::En) => Some(switch_language(path, Language::En)),
        Some(_) => None,
        None => {
            let rest = trimmed.split_once('/').map(|(_, r)| r).unwrap_or("");
            Some(localized_path(Language::default(), rest))
        }
    }
}

/// Resolves the active language: path prefix, then explicit query value, then
/// `Accept-Language`, then the default.
pub fn resolve(path: Option<&str>, query: Option<&str>, accept: Option<&str>) -> Language {
    path.and_then(|p| split_path(p).0)
        .or_else(|| query.and_then(Language::from_code))
        .or_else(|| accept.and_then(Language::from_accept_language))
        .unwrap_or_default()
}
