//! Package reconciliation.
//!
//! When an article lands after its year package, the package's matching
//! news item (found by derived story key) is back-patched with the
//! article's resolved image, reference link, and source label. All other
//! fields, items, and package keys are left untouched.

use serde_json::{Map, Value};

use crate::models::Article;
use crate::utils::text::{clamp_month, normalize_ws, story_key};

/// Patched hero and byMonth lists, plus whether anything changed.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub hero: Vec<Value>,
    pub by_month: Map<String, Value>,
    pub changed: bool,
}

/// Patch every item in the package whose story key matches the article's.
///
/// The write-back decision belongs to the caller: merge back only when
/// `changed` is true.
pub fn reconcile_package(package: &Value, article: &Article) -> ReconcileOutcome {
    let target_key = story_key(article.year, article.month, &article.title);
    let mut changed = false;

    let patch_item = |raw: &Value, changed: &mut bool| -> Option<Value> {
        let object = raw.as_object()?;
        let mut item = object.clone();

        let title = normalize_ws(item.get("title").and_then(Value::as_str).unwrap_or_default());
        if title.is_empty() {
            return Some(Value::Object(item));
        }
        let month = clamp_month(item.get("month").and_then(Value::as_i64), article.month);
        if story_key(article.year, month, &title) != target_key {
            return Some(Value::Object(item));
        }

        let current_image = normalize_ws(item.get("imageUrl").and_then(Value::as_str).unwrap_or_default());
        if current_image != article.image_url {
            item.insert("imageUrl".into(), Value::String(article.image_url.clone()));
            *changed = true;
        }
        let current_url = normalize_ws(item.get("url").and_then(Value::as_str).unwrap_or_default());
        if current_url != article.reference_url {
            item.insert("url".into(), Value::String(article.reference_url.clone()));
            *changed = true;
        }
        let current_source = normalize_ws(item.get("source").and_then(Value::as_str).unwrap_or_default());
        if current_source != article.source {
            item.insert("source".into(), Value::String(article.source.clone()));
            *changed = true;
        }
        Some(Value::Object(item))
    };

    let hero: Vec<Value> = package
        .get("hero")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| patch_item(item, &mut changed))
                .collect()
        })
        .unwrap_or_default();

    let mut by_month = Map::new();
    if let Some(raw_months) = package.get("byMonth").and_then(Value::as_object) {
        for (month_key, raw_items) in raw_months {
            let items: Vec<Value> = raw_items
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| patch_item(item, &mut changed))
                        .collect()
                })
                .unwrap_or_default();
            by_month.insert(month_key.clone(), Value::Array(items));
        }
    }

    ReconcileOutcome {
        hero,
        by_month,
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DIGEST_SOURCE;
    use serde_json::json;

    fn article() -> Article {
        Article {
            story_key: "1985-07-live-aid".into(),
            year: 1985,
            month: 7,
            title: "Live Aid".into(),
            subtitle: "Deck".into(),
            image_url: "https://img.example/live-aid.jpg".into(),
            source: DIGEST_SOURCE.into(),
            reference_url: "https://en.wikipedia.org/wiki/Live_Aid".into(),
            body_paragraphs: vec!["p1".into(), "p2".into(), "p3".into()],
        }
    }

    fn package_with(hero_item: Value) -> Value {
        json!({
            "year": 1985,
            "hero": [hero_item],
            "byMonth": {
                "Jul": [
                    { "title": "Live Aid", "month": 7, "imageUrl": "", "url": "", "source": "old" },
                    { "title": "Other story", "month": 7, "imageUrl": "keep", "url": "keep", "source": "keep" },
                ],
            },
        })
    }

    #[test]
    fn test_patches_matching_items_everywhere() {
        let package = package_with(json!({
            "title": "LIVE AID",
            "month": 7,
            "imageUrl": "stale",
            "url": "stale",
            "source": "stale",
        }));
        let outcome = reconcile_package(&package, &article());

        assert!(outcome.changed);
        assert_eq!(outcome.hero[0]["imageUrl"], "https://img.example/live-aid.jpg");
        assert_eq!(outcome.hero[0]["url"], "https://en.wikipedia.org/wiki/Live_Aid");
        let july = outcome.by_month["Jul"].as_array().unwrap();
        assert_eq!(july[0]["source"], DIGEST_SOURCE);
        // Non-matching item untouched
        assert_eq!(july[1]["imageUrl"], "keep");
    }

    #[test]
    fn test_noop_when_fields_already_match() {
        let article = article();
        let matching_item = json!({
            "title": "Live Aid",
            "month": 7,
            "imageUrl": article.image_url,
            "url": article.reference_url,
            "source": article.source,
        });
        let package = json!({
            "year": 1985,
            "hero": [matching_item.clone()],
            "byMonth": { "Jul": [matching_item] },
        });
        let outcome = reconcile_package(&package, &article);

        assert!(!outcome.changed);
        assert_eq!(outcome.hero[0], package["hero"][0]);
        assert_eq!(outcome.by_month["Jul"], package["byMonth"]["Jul"]);
    }

    #[test]
    fn test_untitled_items_pass_through() {
        let package = json!({
            "hero": [{ "month": 7, "imageUrl": "x" }],
            "byMonth": {},
        });
        let outcome = reconcile_package(&package, &article());
        assert!(!outcome.changed);
        assert_eq!(outcome.hero[0]["imageUrl"], "x");
    }

    #[test]
    fn test_item_month_falls_back_to_article_month() {
        // An item with no month field still matches via the article's month.
        let package = json!({
            "hero": [{ "title": "Live Aid", "imageUrl": "", "url": "", "source": "" }],
            "byMonth": {},
        });
        let outcome = reconcile_package(&package, &article());
        assert!(outcome.changed);
        assert_eq!(outcome.hero[0]["imageUrl"], "https://img.example/live-aid.jpg");
    }

    #[test]
    fn test_non_object_entries_are_dropped() {
        let package = json!({
            "hero": ["garbage", { "title": "Live Aid", "month": 7 }],
            "byMonth": {},
        });
        let outcome = reconcile_package(&package, &article());
        assert_eq!(outcome.hero.len(), 1);
        assert!(outcome.changed);
    }
}
