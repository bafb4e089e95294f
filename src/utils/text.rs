// src/utils/text.rs

//! Text normalization helpers.
//!
//! Every string that enters a stored document passes through here first:
//! whitespace is collapsed, subtitles are clamped, titles are slugified into
//! stable story keys.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;
use url::Url;

/// Short month names used as byMonth keys and in prompts.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Maximum subtitle length after normalization.
pub const SUBTITLE_MAX: usize = 220;

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize_ws(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a subtitle and clamp it to [`SUBTITLE_MAX`] characters.
///
/// Longer strings are cut at 217 grapheme clusters with a `...` suffix so
/// multi-byte text never splits mid-cluster.
pub fn clamp_subtitle(raw: &str) -> String {
    let subtitle = normalize_ws(raw);
    if subtitle.graphemes(true).count() <= SUBTITLE_MAX {
        return subtitle;
    }
    let head: String = subtitle.graphemes(true).take(SUBTITLE_MAX - 3).collect();
    format!("{head}...")
}

/// Derive the stable story key joining a news item to its article.
///
/// Format: `{year}-{month:02}-{slug}`. The slug is the lowercased title with
/// non-alphanumeric runs collapsed to `-`, trimmed of edge dashes and cut to
/// 80 bytes; an empty slug falls back to `story`.
pub fn story_key(year: i32, month: u32, title: &str) -> String {
    let normalized = normalize_ws(title).to_lowercase();
    let mut slug = String::new();
    let mut last_dash = true;
    for c in normalized.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
        if slug.len() >= 80 {
            break;
        }
    }
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "story" } else { slug };
    format!("{year}-{month:02}-{slug}")
}

/// Dedup identity for a quiz question: trimmed, lowercased, single-spaced.
pub fn question_key(question: &str) -> String {
    normalize_ws(question).to_lowercase()
}

/// Deterministic seed digest for a (group, week, year, difficulty) tuple.
pub fn hash_seed(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..8])
}

fn year_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid year token regex"))
}

/// True when any option mentions a 4-digit year other than `year`.
pub fn has_other_year(options: &[String], year: i32) -> bool {
    options.iter().any(|option| {
        year_token_regex()
            .find_iter(option)
            .any(|m| m.as_str().parse::<i32>().ok() != Some(year))
    })
}

/// Clamp a raw month number to 1-12, substituting `fallback` otherwise.
pub fn clamp_month(raw: Option<i64>, fallback: u32) -> u32 {
    match raw {
        Some(month) if (1..=12).contains(&month) => month as u32,
        _ => fallback,
    }
}

/// Short label for a 1-based month number.
pub fn month_label(month: u32) -> &'static str {
    MONTH_LABELS
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Jan")
}

/// Encyclopedia search URL for a query; empty for an empty query.
pub fn wiki_search_url(query: &str) -> String {
    let normalized = normalize_ws(query);
    if normalized.is_empty() {
        return String::new();
    }
    let mut url = Url::parse("https://en.wikipedia.org/wiki/Special:Search")
        .expect("valid search base url");
    url.query_pairs_mut().append_pair("search", &normalized);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ws() {
        assert_eq!(normalize_ws("  a \t b\n c  "), "a b c");
        assert_eq!(normalize_ws(""), "");
    }

    #[test]
    fn test_clamp_subtitle_short_passes() {
        assert_eq!(clamp_subtitle(" plain  text "), "plain text");
    }

    #[test]
    fn test_clamp_subtitle_truncates() {
        let long = "x".repeat(300);
        let clamped = clamp_subtitle(&long);
        assert_eq!(clamped.len(), SUBTITLE_MAX);
        assert!(clamped.ends_with("..."));
    }

    #[test]
    fn test_story_key_deterministic_across_variants() {
        let a = story_key(2001, 3, "Thing");
        let b = story_key(2001, 3, "  THING ");
        let c = story_key(2001, 3, "thing");
        assert_eq!(a, "2001-03-thing");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_story_key_slugs_punctuation() {
        assert_eq!(
            story_key(1985, 11, "Live Aid: The Day After?"),
            "1985-11-live-aid-the-day-after"
        );
    }

    #[test]
    fn test_story_key_empty_title_falls_back() {
        assert_eq!(story_key(1999, 1, "!!!"), "1999-01-story");
    }

    #[test]
    fn test_question_key_idempotent() {
        let once = question_key("  What  Happened in 1994? ");
        let twice = question_key(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "what happened in 1994?");
    }

    #[test]
    fn test_hash_seed_is_stable() {
        let a = hash_seed("g1:w1:1994:medium");
        let b = hash_seed("g1:w1:1994:medium");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, hash_seed("g1:w1:1994:hard"));
    }

    #[test]
    fn test_has_other_year() {
        let options = vec!["A hit from 1994".to_string(), "A 1995 single".to_string()];
        assert!(has_other_year(&options, 1994));
        let locked = vec!["A hit from 1994".to_string(), "Radio trend".to_string()];
        assert!(!has_other_year(&locked, 1994));
    }

    #[test]
    fn test_has_other_year_ignores_long_numbers() {
        let options = vec!["Serial 219945 pressing".to_string()];
        assert!(!has_other_year(&options, 1994));
    }

    #[test]
    fn test_clamp_month() {
        assert_eq!(clamp_month(Some(7), 1), 7);
        assert_eq!(clamp_month(Some(13), 1), 1);
        assert_eq!(clamp_month(Some(0), 4), 4);
        assert_eq!(clamp_month(None, 12), 12);
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label(1), "Jan");
        assert_eq!(month_label(12), "Dec");
        assert_eq!(month_label(0), "Jan");
    }

    #[test]
    fn test_wiki_search_url() {
        assert_eq!(wiki_search_url("   "), "");
        let url = wiki_search_url("Live Aid 1985");
        assert!(url.starts_with("https://en.wikipedia.org/wiki/Special:Search"));
        assert!(url.contains("Live+Aid+1985"));
    }
}
