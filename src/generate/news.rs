//! Year-news package generation.
//!
//! Four model calls build a full package: one for hero cards and the
//! ticker, three for 4-month chunks of monthly cards. Every category is
//! padded to its exact target count with deterministic placeholders, so a
//! package always has the same shape whether or not the model delivered.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model_client::LanguageModel;
use crate::models::{NewsItem, DIGEST_SOURCE};
use crate::utils::text::{clamp_month, clamp_subtitle, month_label, normalize_ws, story_key, wiki_search_url};

/// Hero cards per package.
pub const HERO_COUNT: usize = 3;

/// Ticker headlines per package.
pub const TICKER_COUNT: usize = 15;

/// Cards per month.
pub const MONTH_ITEM_COUNT: usize = 5;

/// Generated package content, ready to persist.
#[derive(Debug, Clone)]
pub struct GeneratedPackage {
    pub hero: Vec<NewsItem>,
    pub by_month: BTreeMap<String, Vec<NewsItem>>,
    pub ticker: Vec<String>,
}

/// Normalize one raw model item; items missing a title or subtitle are
/// dropped rather than repaired.
fn normalize_item(raw: &Value, month_fallback: u32) -> Option<NewsItem> {
    let month = clamp_month(raw.get("month").and_then(Value::as_i64), month_fallback);
    let title = normalize_ws(raw.get("title").and_then(Value::as_str).unwrap_or_default());
    let subtitle = clamp_subtitle(raw.get("subtitle").and_then(Value::as_str).unwrap_or_default());
    if title.is_empty() || subtitle.is_empty() {
        return None;
    }
    let image_query = {
        let query = normalize_ws(raw.get("imageQuery").and_then(Value::as_str).unwrap_or_default());
        if query.is_empty() { title.clone() } else { query }
    };

    Some(NewsItem {
        url: wiki_search_url(&format!("{title} {month} UK")),
        title,
        subtitle,
        image_url: String::new(),
        image_query,
        source: DIGEST_SOURCE.to_string(),
        month,
    })
}

/// Deterministic placeholder card used to pad under-delivered categories.
fn default_item(year: i32, month: u32, index: usize, hero: bool) -> NewsItem {
    let label = month_label(month);
    let title = if hero {
        format!("UK spotlight in {year} ({index}/{HERO_COUNT})")
    } else {
        format!("{label} {year} UK spotlight ({index}/{MONTH_ITEM_COUNT})")
    };
    let subtitle = if hero {
        format!("Major UK talking points from {year}, curated for your nostalgia timeline.")
    } else {
        format!("A key UK moment from {label} {year}, selected for the year timeline.")
    };
    NewsItem {
        url: wiki_search_url(&format!("{title} {year} UK")),
        image_query: title.clone(),
        title,
        subtitle,
        image_url: String::new(),
        source: DIGEST_SOURCE.to_string(),
        month,
    }
}

/// Fixed fallback ticker headlines for a year.
fn default_ticker(year: i32) -> Vec<String> {
    vec![
        format!("UK headlines shaping {year}"),
        format!("Showbiz buzz across {year}"),
        format!("Sport moments fans remember from {year}"),
        format!("Politics and public debate in {year}"),
        format!("Cultural shifts that defined {year}"),
        format!("Charts, screens, and stories from {year}"),
        format!("Memorable UK events from {year}"),
        format!("Year-in-review: standout moments in {year}"),
        format!("What people talked about in {year}"),
        format!("From Westminster to Wembley in {year}"),
        format!("Global stories seen through a UK lens in {year}"),
        format!("Flashback briefings from {year}"),
        format!("Broadcast highlights from {year}"),
        format!("Headline recap for {year}"),
        format!("Nostalgia feed: UK yearbook {year}"),
    ]
}

fn hero_image_prompt(year: i32, title: &str, subtitle: &str) -> String {
    [
        format!("Cinematic realistic documentary-style scene set in {year}."),
        format!("Primary subject: {title}."),
        format!("Context: {subtitle}."),
        "Natural lighting, dramatic composition, period-appropriate details.".to_string(),
        "No text, no logos, no watermarks.".to_string(),
    ]
    .join(" ")
}

/// Generator for a full year package.
pub struct YearNewsGenerator<'a> {
    model: &'a dyn LanguageModel,
}

impl<'a> YearNewsGenerator<'a> {
    pub fn new(model: &'a dyn LanguageModel) -> Self {
        Self { model }
    }

    /// Build the complete package for a year. Never fails: model errors
    /// degrade to fully padded content.
    pub async fn build_package(&self, year: i32) -> GeneratedPackage {
        let (hero, ticker) = self.build_hero_and_ticker(year).await;

        let mut by_month = BTreeMap::new();
        for (start, end) in [(1u32, 4u32), (5, 8), (9, 12)] {
            by_month.extend(self.build_months_chunk(year, start, end).await);
        }

        GeneratedPackage {
            hero,
            by_month,
            ticker,
        }
    }

    async fn build_hero_and_ticker(&self, year: i32) -> (Vec<NewsItem>, Vec<String>) {
        let prompt = [
            format!("Create UK-first nostalgic headlines for year {year}."),
            "Focus on UK news, showbiz, sport, and major global events that mattered in the UK conversation."
                .to_string(),
            "Return strict JSON with fields hero and ticker.".to_string(),
            format!("hero must be an array of exactly {HERO_COUNT} items."),
            "Each hero item: { title, subtitle, imageQuery, month }".to_string(),
            format!("ticker must be an array of {TICKER_COUNT} concise headlines (max 80 chars each)."),
            "No markdown. No extra keys.".to_string(),
        ]
        .join("\n");

        let parsed = match self.model.chat_json(&prompt, 1600, 0.2).await {
            Ok(parsed) => parsed,
            Err(error) => {
                log::warn!("hero/ticker generation for {year} falling back to padded content: {error}");
                Value::Null
            }
        };

        let hero_base: Vec<NewsItem> = parsed
            .get("hero")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| normalize_item(item, 1))
                    .take(HERO_COUNT)
                    .collect()
            })
            .unwrap_or_default();

        // Hero imagery is generated concurrently; each card is independent.
        let mut hero: Vec<NewsItem> =
            futures::future::join_all(hero_base.into_iter().map(|mut item| async move {
                let key = story_key(year, item.month, &item.title);
                item.image_url = self
                    .model
                    .generate_image(
                        &hero_image_prompt(year, &item.title, &item.subtitle),
                        &format!("year-news/{year}/hero/{key}.png"),
                    )
                    .await;
                let search = wiki_search_url(&format!("{} {year} UK", item.title));
                if !search.is_empty() {
                    item.url = search;
                }
                item
            }))
            .await;

        while hero.len() < HERO_COUNT {
            let index = hero.len() + 1;
            hero.push(default_item(year, index as u32, index, true));
        }

        let mut ticker: Vec<String> = parsed
            .get("ticker")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| normalize_ws(entry.as_str().unwrap_or_default()))
                    .filter(|entry| !entry.is_empty())
                    .take(TICKER_COUNT)
                    .collect()
            })
            .unwrap_or_default();

        if ticker.len() < TICKER_COUNT {
            for headline in default_ticker(year) {
                if ticker.len() >= TICKER_COUNT {
                    break;
                }
                if !ticker.contains(&headline) {
                    ticker.push(headline);
                }
            }
        }

        (hero, ticker)
    }

    async fn build_months_chunk(
        &self,
        year: i32,
        start_month: u32,
        end_month: u32,
    ) -> BTreeMap<String, Vec<NewsItem>> {
        let labels: Vec<&str> = (start_month..=end_month).map(month_label).collect();
        let prompt = [
            format!("Create UK-first nostalgic news cards for year {year}."),
            format!("Generate months {}.", labels.join(", ")),
            "Return strict JSON with one key byMonth.".to_string(),
            "byMonth is an object keyed by month short names (Jan..Dec).".to_string(),
            format!("Each month must have exactly {MONTH_ITEM_COUNT} items."),
            "Each item must be: { title, subtitle, imageQuery, month }".to_string(),
            "subtitle must be factual one sentence, max 170 chars.".to_string(),
            "No markdown and no extra keys.".to_string(),
        ]
        .join("\n");

        let by_month_raw = match self.model.chat_json(&prompt, 2600, 0.2).await {
            Ok(parsed) => parsed.get("byMonth").cloned().unwrap_or(Value::Null),
            Err(error) => {
                log::warn!(
                    "month chunk {start_month}-{end_month} for {year} falling back to padded content: {error}"
                );
                Value::Null
            }
        };

        let mut output = BTreeMap::new();
        for month in start_month..=end_month {
            let label = month_label(month);
            let month_raw = by_month_raw
                .get(label)
                .or_else(|| by_month_raw.get(month.to_string()))
                .and_then(Value::as_array);

            let mut items: Vec<NewsItem> = month_raw
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|item| normalize_item(item, month))
                        .take(MONTH_ITEM_COUNT)
                        .collect()
                })
                .unwrap_or_default();

            while items.len() < MONTH_ITEM_COUNT {
                items.push(default_item(year, month, items.len() + 1, false));
            }
            output.insert(label.to_string(), items);
        }
        output
    }
}
