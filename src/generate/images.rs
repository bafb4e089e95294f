//! Illustrative image resolution.
//!
//! Ordered fallback chain, stopping at the first hit:
//! 1. encyclopedia summary lookup over title variants
//! 2. image-search lookup over the same variants
//! 3. model image generation
//! 4. static placeholder
//!
//! Lookup failures at any stage fall through to the next; this module
//! never returns an error.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::config::ContentConfig;
use crate::model_client::LanguageModel;
use crate::utils::text::{normalize_ws, story_key, wiki_search_url};

/// A resolved image plus the page it came from (may be empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub image_url: String,
    pub page_url: String,
}

/// Candidate lookup titles for a story, deduplicated case-insensitively so
/// no variant is queried twice.
pub fn candidate_titles(title: &str, image_query: &str, year: i32) -> Vec<String> {
    let raw = [
        title.to_string(),
        format!("{title} ({year})"),
        image_query.to_string(),
        format!("{image_query} {year}"),
        format!("{title} UK {year}"),
    ];

    let mut seen = Vec::new();
    let mut candidates = Vec::new();
    for candidate in raw {
        let normalized = normalize_ws(&candidate);
        if normalized.is_empty() {
            continue;
        }
        let key = normalized.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        candidates.push(normalized);
    }
    candidates
}

/// Resolver over the lookup APIs and the model's image endpoint.
pub struct ImageResolver<'a> {
    http: &'a reqwest::Client,
    model: &'a dyn LanguageModel,
    content: &'a ContentConfig,
    lookup_timeout: Duration,
}

impl<'a> ImageResolver<'a> {
    pub fn new(
        http: &'a reqwest::Client,
        model: &'a dyn LanguageModel,
        content: &'a ContentConfig,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            http,
            model,
            content,
            lookup_timeout,
        }
    }

    /// Resolve an image for a story, walking the fallback chain.
    pub async fn resolve(&self, title: &str, image_query: &str, year: i32) -> ResolvedImage {
        let candidates = candidate_titles(title, image_query, year);

        for candidate in &candidates {
            if let Some(summary) = self.fetch_summary(candidate).await {
                if !summary.image_url.is_empty() {
                    return summary;
                }
            }
        }

        for candidate in &candidates {
            let image_url = self.fetch_search_image(candidate).await;
            if !image_url.is_empty() {
                return ResolvedImage {
                    image_url,
                    page_url: wiki_search_url(candidate),
                };
            }
        }

        let prompt = [
            format!("Cinematic realistic documentary-style scene set in {year}."),
            format!("Subject: {title}."),
            "Historically grounded atmosphere.".to_string(),
            "No text, no logos, no watermarks.".to_string(),
        ]
        .join(" ");
        let storage_path = format!(
            "year-news/{year}/stories/{}.png",
            story_key(year, 1, title)
        );
        let generated = self.model.generate_image(&prompt, &storage_path).await;
        if !generated.is_empty() {
            return ResolvedImage {
                image_url: generated,
                page_url: wiki_search_url(&format!("{title} {year}")),
            };
        }

        ResolvedImage {
            image_url: self.content.fallback_image_url.clone(),
            page_url: wiki_search_url(&format!("{title} {year}")),
        }
    }

    /// Query the encyclopedia summary endpoint for one title variant.
    /// Disambiguation pages and transport failures yield `None`.
    async fn fetch_summary(&self, title: &str) -> Option<ResolvedImage> {
        let normalized = normalize_ws(title);
        if normalized.is_empty() {
            return None;
        }

        let mut endpoint = Url::parse(&self.content.wiki_summary_base).ok()?;
        endpoint
            .path_segments_mut()
            .ok()?
            .push(&normalized.replace(' ', "_"));

        let response = self
            .http
            .get(endpoint)
            .timeout(self.lookup_timeout)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let payload: Value = response.json().await.ok()?;

        if payload["type"].as_str() == Some("disambiguation") {
            return None;
        }

        let image_url = {
            let original = normalize_ws(payload["originalimage"]["source"].as_str().unwrap_or_default());
            if original.is_empty() {
                normalize_ws(payload["thumbnail"]["source"].as_str().unwrap_or_default())
            } else {
                original
            }
        };
        let page_url = normalize_ws(
            payload["content_urls"]["desktop"]["page"]
                .as_str()
                .unwrap_or_default(),
        );

        Some(ResolvedImage {
            image_url,
            page_url,
        })
    }

    /// Two-step image search: find the best page title, then its thumbnail.
    async fn fetch_search_image(&self, query: &str) -> String {
        let safe_query = normalize_ws(query);
        if safe_query.is_empty() {
            return String::new();
        }

        let Ok(mut search_url) = Url::parse(&self.content.commons_api_url) else {
            return String::new();
        };
        search_url
            .query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("list", "search")
            .append_pair("srsearch", &safe_query)
            .append_pair("format", "json")
            .append_pair("srlimit", "1")
            .append_pair("utf8", "1");

        let title = match self.get_json(search_url).await {
            Some(payload) => normalize_ws(
                payload["query"]["search"][0]["title"]
                    .as_str()
                    .unwrap_or_default(),
            ),
            None => return String::new(),
        };
        if title.is_empty() {
            return String::new();
        }

        let Ok(mut image_url) = Url::parse(&self.content.commons_api_url) else {
            return String::new();
        };
        image_url
            .query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("titles", &title)
            .append_pair("prop", "pageimages")
            .append_pair("piprop", "thumbnail")
            .append_pair("pithumbsize", "1200")
            .append_pair("format", "json");

        let Some(payload) = self.get_json(image_url).await else {
            return String::new();
        };
        if let Some(pages) = payload["query"]["pages"].as_object() {
            for page in pages.values() {
                let thumbnail = normalize_ws(page["thumbnail"]["source"].as_str().unwrap_or_default());
                if !thumbnail.is_empty() {
                    return thumbnail;
                }
            }
        }
        String::new()
    }

    async fn get_json(&self, url: Url) -> Option<Value> {
        let response = self
            .http
            .get(url)
            .timeout(self.lookup_timeout)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json().await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_client::testing::FakeModel;

    #[test]
    fn test_candidate_titles_dedupes_case_insensitively() {
        let candidates = candidate_titles("Live Aid", "live aid", 1985);
        assert_eq!(
            candidates,
            vec![
                "Live Aid".to_string(),
                "Live Aid (1985)".to_string(),
                "live aid 1985".to_string(),
                "Live Aid UK 1985".to_string(),
            ]
        );
    }

    #[test]
    fn test_candidate_titles_skips_empty() {
        let candidates = candidate_titles("Thing", "  ", 2001);
        assert!(candidates.iter().all(|c| !c.trim().is_empty()));
        assert_eq!(candidates[0], "Thing");
    }

    #[tokio::test]
    async fn test_resolver_falls_back_to_placeholder() {
        // Unroutable lookup endpoints and an imageless model exhaust the
        // chain down to the placeholder.
        let mut content = ContentConfig::default();
        content.wiki_summary_base = "http://127.0.0.1:1/summary".to_string();
        content.commons_api_url = "http://127.0.0.1:1/api".to_string();
        let http = reqwest::Client::new();
        let model = FakeModel::new();

        let resolver = ImageResolver::new(&http, &model, &content, Duration::from_millis(200));
        let resolved = resolver.resolve("Thing", "Thing", 2001).await;

        assert_eq!(resolved.image_url, content.fallback_image_url);
        assert!(resolved.page_url.contains("Special:Search"));
        assert_eq!(
            model.image_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn test_resolver_uses_model_image_before_placeholder() {
        let mut content = ContentConfig::default();
        content.wiki_summary_base = "http://127.0.0.1:1/summary".to_string();
        content.commons_api_url = "http://127.0.0.1:1/api".to_string();
        let http = reqwest::Client::new();
        let model = FakeModel::new().with_image_url("memory://generated.png");

        let resolver = ImageResolver::new(&http, &model, &content, Duration::from_millis(200));
        let resolved = resolver.resolve("Thing", "Thing", 2001).await;

        assert_eq!(resolved.image_url, "memory://generated.png");
    }
}
