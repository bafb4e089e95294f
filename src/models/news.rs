//! Year-news data structures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source label attached to every generated news item and article.
pub const DIGEST_SOURCE: &str = "AI Historical Digest";

/// Generation status of a stored package. An absent document means no
/// generation has completed yet.
pub const STATUS_COMPLETE: &str = "complete";

/// Inclusive range of years the nostalgia timeline covers.
pub const YEAR_MIN: i32 = 1950;
pub const YEAR_MAX: i32 = 2010;

/// One news card in a year package.
///
/// Identity is not stored: it is derived from (year, month, normalized
/// title) via the story key and used to join articles back to their cards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,

    /// Clamped to 220 chars
    pub subtitle: String,

    #[serde(default)]
    pub image_url: String,

    /// Query used when resolving an illustrative image
    #[serde(default)]
    pub image_query: String,

    /// Source label shown on the card
    #[serde(default)]
    pub source: String,

    /// Reference link for the card
    #[serde(default)]
    pub url: String,

    /// Month 1-12
    pub month: u32,
}

/// A full year of news content, owned by a single year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearNewsPackage {
    pub year: i32,

    pub generation_status: String,

    pub updated_at: DateTime<Utc>,

    /// Exactly 3 items
    pub hero: Vec<NewsItem>,

    /// Month short name -> exactly 5 items
    pub by_month: BTreeMap<String, Vec<NewsItem>>,

    /// Exactly 15 short headlines
    pub ticker: Vec<String>,
}

/// A generated feature article, owned by a (year, story key) pair.
///
/// Created once and immutable thereafter; its image/reference fields may be
/// back-patched into the parent package's matching news item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub story_key: String,
    pub year: i32,
    pub month: u32,
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub source: String,
    pub reference_url: String,

    /// Exactly 5 paragraphs
    pub body_paragraphs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_item_round_trip_keys() {
        let item = NewsItem {
            title: "T".into(),
            subtitle: "S".into(),
            image_url: "img".into(),
            image_query: "q".into(),
            source: DIGEST_SOURCE.into(),
            url: "u".into(),
            month: 4,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["imageUrl"], "img");
        assert_eq!(value["imageQuery"], "q");
        let back: NewsItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_article_serializes_story_key() {
        let article = Article {
            story_key: "1985-07-live-aid".into(),
            year: 1985,
            month: 7,
            title: "Live Aid".into(),
            subtitle: "S".into(),
            image_url: String::new(),
            source: DIGEST_SOURCE.into(),
            reference_url: String::new(),
            body_paragraphs: vec!["p1".into()],
        };
        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["storyKey"], "1985-07-live-aid");
        assert_eq!(value["bodyParagraphs"][0], "p1");
    }
}
