//! Feature article generation.
//!
//! The one generator without a backfill path: an article below the
//! paragraph floor fails outright, since synthetic prose has no safe
//! substitute.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::model_client::LanguageModel;
use crate::models::{Article, DIGEST_SOURCE};
use crate::utils::text::{clamp_subtitle, normalize_ws, story_key, wiki_search_url};

use super::images::ImageResolver;

/// Paragraphs requested from the model.
pub const PARAGRAPH_COUNT: usize = 5;

/// Minimum usable paragraphs; below this the article fails.
pub const PARAGRAPH_FLOOR: usize = 3;

/// Inputs for one article, already normalized by the handler.
#[derive(Debug, Clone)]
pub struct ArticleParams {
    pub year: i32,
    pub month: u32,
    pub title: String,
    pub subtitle: String,
    pub image_query: String,
}

/// Generate a storage-ready article: one model call, a hard paragraph
/// floor, then image resolution.
pub async fn generate_article(
    model: &dyn LanguageModel,
    resolver: &ImageResolver<'_>,
    params: &ArticleParams,
) -> Result<Article> {
    let prompt = [
        format!(
            "Write a UK-first nostalgic feature article for the year {}.",
            params.year
        ),
        format!("Headline: {}", params.title),
        format!("Deck: {}", params.subtitle),
        "Return strict JSON with fields:".to_string(),
        "title, subtitle, imageQuery, bodyParagraphs".to_string(),
        format!("bodyParagraphs must be an array of exactly {PARAGRAPH_COUNT} paragraphs."),
        "Each paragraph should be 2-4 sentences, vivid but factual in tone.".to_string(),
        "No markdown, no bullet points, no extra keys.".to_string(),
    ]
    .join("\n");

    let parsed = model.chat_json(&prompt, 2200, 0.2).await?;

    let body_paragraphs: Vec<String> = parsed
        .get("bodyParagraphs")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| normalize_ws(entry.as_str().unwrap_or_default()))
                .filter(|entry| !entry.is_empty())
                .take(PARAGRAPH_COUNT)
                .collect()
        })
        .unwrap_or_default();

    if body_paragraphs.len() < PARAGRAPH_FLOOR {
        return Err(AppError::internal("article body incomplete"));
    }

    let title = {
        let resolved = normalize_ws(parsed.get("title").and_then(Value::as_str).unwrap_or_default());
        if resolved.is_empty() { params.title.clone() } else { resolved }
    };
    let subtitle = {
        let resolved = clamp_subtitle(parsed.get("subtitle").and_then(Value::as_str).unwrap_or_default());
        if resolved.is_empty() { params.subtitle.clone() } else { resolved }
    };
    let image_query = {
        let resolved = normalize_ws(
            parsed
                .get("imageQuery")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );
        if !resolved.is_empty() {
            resolved
        } else if !params.image_query.is_empty() {
            params.image_query.clone()
        } else {
            params.title.clone()
        }
    };

    let resolved_image = resolver.resolve(&title, &image_query, params.year).await;
    let reference_url = if resolved_image.page_url.is_empty() {
        wiki_search_url(&format!("{title} {} UK", params.year))
    } else {
        resolved_image.page_url
    };

    Ok(Article {
        story_key: story_key(params.year, params.month, &title),
        year: params.year,
        month: params.month,
        title,
        subtitle,
        image_url: resolved_image.image_url,
        source: DIGEST_SOURCE.to_string(),
        reference_url,
        body_paragraphs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentConfig;
    use crate::model_client::testing::FakeModel;
    use serde_json::json;
    use std::time::Duration;

    fn offline_content() -> ContentConfig {
        let mut content = ContentConfig::default();
        content.wiki_summary_base = "http://127.0.0.1:1/summary".to_string();
        content.commons_api_url = "http://127.0.0.1:1/api".to_string();
        content
    }

    fn params() -> ArticleParams {
        ArticleParams {
            year: 1985,
            month: 7,
            title: "Live Aid".into(),
            subtitle: "The day pop turned global".into(),
            image_query: "Live Aid Wembley".into(),
        }
    }

    #[tokio::test]
    async fn test_generates_article_with_five_paragraphs() {
        let model = FakeModel::new().push_json(json!({
            "title": "Live Aid at Wembley",
            "subtitle": "A deck",
            "imageQuery": "Live Aid",
            "bodyParagraphs": ["p1", "p2", "p3", "p4", "p5", "p6 extra"],
        }));
        let http = reqwest::Client::new();
        let content = offline_content();
        let resolver = ImageResolver::new(&http, &model, &content, Duration::from_millis(200));

        let article = generate_article(&model, &resolver, &params()).await.unwrap();
        assert_eq!(article.body_paragraphs.len(), PARAGRAPH_COUNT);
        assert_eq!(article.title, "Live Aid at Wembley");
        assert_eq!(article.story_key, "1985-07-live-aid-at-wembley");
        assert_eq!(article.source, DIGEST_SOURCE);
        assert!(!article.reference_url.is_empty());
    }

    #[tokio::test]
    async fn test_fails_below_paragraph_floor() {
        let model = FakeModel::new().push_json(json!({
            "bodyParagraphs": ["p1", "  ", "p2"],
        }));
        let http = reqwest::Client::new();
        let content = offline_content();
        let resolver = ImageResolver::new(&http, &model, &content, Duration::from_millis(200));

        let result = generate_article(&model, &resolver, &params()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_blank_model_fields_fall_back_to_request() {
        let model = FakeModel::new().push_json(json!({
            "bodyParagraphs": ["p1", "p2", "p3"],
        }));
        let http = reqwest::Client::new();
        let content = offline_content();
        let resolver = ImageResolver::new(&http, &model, &content, Duration::from_millis(200));

        let article = generate_article(&model, &resolver, &params()).await.unwrap();
        assert_eq!(article.title, "Live Aid");
        assert_eq!(article.subtitle, "The day pop turned global");
        assert_eq!(article.body_paragraphs.len(), 3);
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = FakeModel::new().push_json_error("boom");
        let http = reqwest::Client::new();
        let content = offline_content();
        let resolver = ImageResolver::new(&http, &model, &content, Duration::from_millis(200));

        assert!(generate_article(&model, &resolver, &params()).await.is_err());
    }
}
