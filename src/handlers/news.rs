//! Year-news handlers: package generation and article generation.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::generate::news::{YearNewsGenerator, TICKER_COUNT};
use crate::generate::{generate_article, reconcile_package, ArticleParams};
use crate::limiter::DAY_MS;
use crate::models::{YearNewsPackage, STATUS_COMPLETE, YEAR_MAX, YEAR_MIN};
use crate::store::{paths, DocumentStore};
use crate::utils::text::{clamp_month, clamp_subtitle, normalize_ws, story_key};

use super::{require_auth, CallerIdentity};

const PACKAGE_ACTION: &str = "year_news_generation_daily";
const ARTICLE_ACTION: &str = "year_news_article_daily";

/// Outcome marker shared by both handlers.
pub const STATUS_GENERATED: &str = "generated";
pub const STATUS_ALREADY_EXISTS: &str = "already_exists";

/// Package generation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageRequest {
    pub year: Option<i32>,
}

/// Package generation response.
#[derive(Debug, Clone, Serialize)]
pub struct PackageResponse {
    pub status: &'static str,
    pub year: i32,
}

/// Article generation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleRequest {
    pub year: Option<i32>,
    pub month: Option<i64>,
    pub title: String,
    pub subtitle: String,
    pub image_query: String,
}

/// Article generation response. `article` is the stored document shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub status: &'static str,
    pub year: i32,
    pub story_key: String,
    pub article: Value,
}

/// Validate a requested year against the supported nostalgia range.
fn validate_year(raw: Option<i32>) -> Result<i32> {
    match raw {
        Some(year) if (YEAR_MIN..=YEAR_MAX).contains(&year) => Ok(year),
        _ => Err(AppError::invalid_argument(format!(
            "year must be an integer between {YEAR_MIN} and {YEAR_MAX}."
        ))),
    }
}

/// True when the stored package is complete and fresh enough to reuse.
fn is_fresh_package(doc: &Value, freshness_days: i64) -> bool {
    if doc.get("generationStatus").and_then(Value::as_str) != Some(STATUS_COMPLETE) {
        return false;
    }
    let Some(updated_at) = doc
        .get("updatedAt")
        .and_then(Value::as_str)
        .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
    else {
        return false;
    };
    Utc::now().signed_duration_since(updated_at) < Duration::days(freshness_days)
}

/// Generate the year-news package for a year, unless a fresh one exists.
pub async fn generate_year_news_package(
    ctx: &AppContext,
    caller: Option<&CallerIdentity>,
    request: PackageRequest,
) -> Result<PackageResponse> {
    let uid = require_auth(caller)?;

    ctx.limiter
        .try_consume(uid, PACKAGE_ACTION, ctx.config.limits.package_per_day, DAY_MS)
        .await?;

    let year = validate_year(request.year)?;
    let package_path = paths::year_package(year);

    if let Some(existing) = ctx.store.get(&package_path).await? {
        if is_fresh_package(&existing, ctx.config.content.freshness_days) {
            return Ok(PackageResponse {
                status: STATUS_ALREADY_EXISTS,
                year,
            });
        }
    }

    if !ctx.model.is_configured() {
        return Err(AppError::failed_precondition(
            "model API key is not configured.",
        ));
    }

    log::info!("generating year-news package for {year}");
    let generated = YearNewsGenerator::new(ctx.model.as_ref())
        .build_package(year)
        .await;

    let mut ticker = generated.ticker;
    ticker.truncate(TICKER_COUNT);
    let package = YearNewsPackage {
        year,
        generation_status: STATUS_COMPLETE.to_string(),
        updated_at: Utc::now(),
        hero: generated.hero,
        by_month: generated.by_month,
        ticker,
    };
    ctx.store
        .set(&package_path, serde_json::to_value(&package)?)
        .await?;

    Ok(PackageResponse {
        status: STATUS_GENERATED,
        year,
    })
}

/// Generate a feature article for a news card, reconciling it back into
/// the stored year package.
pub async fn generate_year_news_article(
    ctx: &AppContext,
    caller: Option<&CallerIdentity>,
    request: ArticleRequest,
) -> Result<ArticleResponse> {
    let uid = require_auth(caller)?;

    ctx.limiter
        .try_consume(uid, ARTICLE_ACTION, ctx.config.limits.article_per_day, DAY_MS)
        .await?;

    let year = validate_year(request.year)?;
    let month = clamp_month(request.month, 1);
    let title = normalize_ws(&request.title);
    let subtitle = clamp_subtitle(&request.subtitle);
    let image_query = {
        let query = normalize_ws(&request.image_query);
        if query.is_empty() { title.clone() } else { query }
    };

    if title.is_empty() || subtitle.is_empty() {
        return Err(AppError::invalid_argument("title and subtitle are required."));
    }

    let key = story_key(year, month, &title);
    let article_path = paths::article(year, &key);

    if let Some(existing) = ctx.store.get(&article_path).await? {
        return Ok(ArticleResponse {
            status: STATUS_ALREADY_EXISTS,
            year,
            story_key: key,
            article: existing,
        });
    }

    if !ctx.model.is_configured() {
        return Err(AppError::failed_precondition(
            "model API key is not configured.",
        ));
    }

    let params = ArticleParams {
        year,
        month,
        title,
        subtitle,
        image_query,
    };
    let resolver = ctx.image_resolver();
    let article = generate_article(ctx.model.as_ref(), &resolver, &params)
        .await
        .map_err(|error| {
            log::error!("article generation failed: {error}");
            AppError::internal("Story generation failed. Please retry.")
        })?;

    let mut doc = serde_json::to_value(&article)?;
    doc["updatedAt"] = json!(Utc::now().to_rfc3339());
    ctx.store.set(&article_path, doc.clone()).await?;

    // Back-patch the year package's matching card, if a package exists.
    let package_path = paths::year_package(year);
    if let Some(package) = ctx.store.get(&package_path).await? {
        let outcome = reconcile_package(&package, &article);
        if outcome.changed {
            ctx.store
                .merge(
                    &package_path,
                    json!({
                        "hero": outcome.hero,
                        "byMonth": outcome.by_month,
                        "updatedAt": Utc::now().to_rfc3339(),
                    }),
                )
                .await?;
        }
    }

    Ok(ArticleResponse {
        status: STATUS_GENERATED,
        year,
        story_key: article.story_key.clone(),
        article: doc,
    })
}
