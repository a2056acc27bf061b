//! Derived views over an already fetched bookmark list: slugs, tag and search
//! filters, trending order, popular tags and per-language counts.

use std::cmp::Reverse;
use std::collections::HashMap;

use crate::lang::Language;
use crate::model::{Bookmark, LanguageStats, TagCount};

pub const TRENDING_LIMIT: usize = 10;
pub const POPULAR_TAGS_LIMIT: usize = 10;

fn char_map(ch: char) -> Option<&'static str> {
    let mapped = match ch {
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'Æ' => "AE",
        'æ' => "ae",
        'Ç' | 'Ć' | 'Č' => "C",
        'ç' | 'ć' | 'č' => "c",
        'Ð' | 'Ď' | 'Đ' => "D",
        'ð' | 'ď' | 'đ' => "d",
        'È' | 'É' | 'Ê' | 'Ë' | 'Ē' | 'Ę' | 'Ě' => "E",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'Ğ' => "G",
        'ğ' => "g",
        'Ì' | 'Í' | 'Î' | 'Ï' | 'İ' | 'Ī' => "I",
        'ì' | 'í' | 'î' | 'ï' | 'ı' | 'ī' => "i",
        'Ł' => "L",
        'ł' => "l",
        'Ñ' | 'Ń' | 'Ň' => "N",
        'ñ' | 'ń' | 'ň' => "n",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' | 'Ő' | 'Ō' => "O",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ő' | 'ō' => "o",
        'Œ' => "OE",
        'œ' => "oe",
        'Ř' => "R",
        'ř' => "r",
        'Ş' | 'Ś' | 'Š' => "S",
        'ş' | 'ś' | 'š' => "s",
        'ß' => "ss",
        'Ţ' | 'Ť' => "T",
        'ţ' | 'ť' => "t",
        'Þ' => "TH",
        'þ' => "th",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ů' | 'Ű' | 'Ū' => "U",
        'ù' | 'ú' | 'û' | 'ü' | 'ů' | 'ű' | 'ū' => "u",
        'Ý' | 'Ÿ' => "Y",
        'ý' | 'ÿ' => "y",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ź' | 'ż' | 'ž' => "z",
        '&' => "and",
        '$' => "dollar",
        '%' => "percent",
        '<' => "less",
        '>' => "greater",
        '|' => "or",
        '€' => "euro",
        '£' => "pound",
        '¢' => "cent",
        '♥' => "love",
        _ => return None,
    };
    Some(mapped)
}

fn locale_map(lang: Language, ch: char) -> Option<&'static str> {
    let mapped = match (lang, ch) {
        (Language::De, 'Ä') => "AE",
        (Language::De, 'ä') => "ae",
        (Language::De, 'Ö') => "OE",
        (Language::De, 'ö') => "oe",
        (Language::De, 'Ü') => "UE",
        (Language::De, 'ü') => "ue",
        (Language::De, '%') => "prozent",
        (Language::De, '&') => "und",
        (Language::De, '|') => "oder",
        (Language::Es, '%') => "por ciento",
        (Language::Es, '&') => "y",
        (Language::Es, '|') => "o",
        (Language::Fr, '%') => "pourcent",
        (Language::Fr, '&') => "et",
        (Language::Fr, '|') => "ou",
        (Language::It, '&') => "e",
        (Language::Pt, '%') => "porcento",
        (Language::Pt, '&') => "e",
        (Language::Pt, '|') => "ou",
        (Language::Tr, '&') => "ve",
        _ => return None,
    };
    Some(mapped)
}

/// Lower-case, ASCII-only, hyphen-separated form of `text`.
///
/// Letters are transliterated through the locale table for `lang` first and
/// the generic table second; anything else that is not an ASCII letter,
/// digit or whitespace is dropped. Hyphens in the input count as word breaks.
pub fn slugify(text: &str, lang: Language) -> String {
    let mut mapped = String::with_capacity(text.len());
    for ch in text.chars() {
        match locale_map(lang, ch).or_else(|| char_map(ch)) {
            Some(s) => mapped.push_str(s),
            None if ch == '-' => mapped.push(' '),
            None => mapped.push(ch),
        }
    }

    let strict: String = mapped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    strict
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_lowercase()
}

pub fn has_tag_slug(bookmark: &Bookmark, slug: &str, lang: Language) -> bool {
    bookmark.tags.iter().any(|tag| slugify(tag, lang) == slug)
}

pub fn matches_search(bookmark: &Bookmark, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    bookmark.title.to_lowercase().contains(&needle)
        || bookmark.description.to_lowercase().contains(&needle)
        || bookmark.url.to_lowercase().contains(&needle)
}

/// Applies the tag filter, then the search filter, preserving order.
pub fn filter<'a>(
    bookmarks: impl IntoIterator<Item = &'a Bookmark>,
    tag_slug: Option<&str>,
    search: &str,
    lang: Language,
) -> Vec<&'a Bookmark> {
    bookmarks
        .into_iter()
        .filter(|b| tag_slug.is_none_or(|slug| has_tag_slug(b, slug, lang)))
        .filter(|b| matches_search(b, search))
        .collect()
}

/// Public bookmarks, pinned first, then by descending score; ties keep
/// their input order. At most [`TRENDING_LIMIT`] entries.
pub fn trending<'a>(bookmarks: &'a [Bookmark], score: impl Fn(&Bookmark) -> i64) -> Vec<&'a Bookmark> {
    let mut public: Vec<&Bookmark> = bookmarks.iter().filter(|b| b.is_public).collect();
    public.sort_by_key(|b| (!b.is_pinned, Reverse(score(b))));
    public.truncate(TRENDING_LIMIT);
    public
}

/// Most used tags by descending count; ties keep first-seen order.
pub fn popular_tags<'a>(bookmarks: impl IntoIterator<Item = &'a Bookmark>, lang: Language) -> Vec<TagCount> {
    let mut order: Vec<(String, i64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for bookmark in bookmarks {
        for tag in &bookmark.tags {
            match index.get(tag) {
                Some(&i) => order[i].1 += 1,
                None => {
                    index.insert(tag.clone(), order.len());
                    order.push((tag.clone(), 1));
                }
            }
        }
    }

    order.sort_by_key(|(_, count)| Reverse(*count));
    order
        .into_iter()
        .take(POPULAR_TAGS_LIMIT)
        .map(|(tag, count)| TagCount {
            slug: slugify(&tag, lang),
            tag,
            count,
        })
        .collect()
}

pub fn language_stats<'a>(languages: impl IntoIterator<Item = &'a str>) -> LanguageStats {
    let mut stats = LanguageStats::new();
    for language in languages {
        *stats.entry(language.to_string()).or_insert(0) += 1;
    }
    stats
}
