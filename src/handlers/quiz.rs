//! Weekly quiz handler.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::generate::quiz::{
    cached_questions, coerce_stored_questions, generate_questions, QuizParams,
};
use crate::limiter::DAY_MS;
use crate::models::{QuizDefinition, QuizQuestion};
use crate::store::{paths, DocumentStore};
use crate::utils::text::hash_seed;

use super::{assert_admin, assert_membership, load_group, require_auth, CallerIdentity};

/// Year assumed when neither the group nor the request names one.
const DEFAULT_YEAR: i32 = 1990;

/// Rate-limit action key for forced regeneration.
const QUIZ_ACTION: &str = "quiz_generation_daily";

/// Quiz generation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizRequest {
    pub group_id: String,
    pub week_id: String,
    pub year: Option<i32>,
    pub force_regenerate: bool,
}

/// Quiz generation response: always exactly 20 questions.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
}

/// Generate (or return the cached) weekly quiz for a (group, week) pair.
pub async fn generate_weekly_quiz(
    ctx: &AppContext,
    caller: Option<&CallerIdentity>,
    request: QuizRequest,
) -> Result<QuizResponse> {
    let uid = require_auth(caller)?;

    if request.group_id.is_empty() || request.week_id.is_empty() {
        return Err(AppError::invalid_argument(
            "groupId and weekId are required.",
        ));
    }
    assert_membership(ctx, &request.group_id, uid).await?;

    let group = load_group(ctx, &request.group_id).await?;
    let year = group
        .current_year
        .unwrap_or_else(|| request.year.unwrap_or(DEFAULT_YEAR));
    if !(1900..=2100).contains(&year) {
        return Err(AppError::invalid_argument(
            "year must be a valid integer year.",
        ));
    }

    let difficulty = group.difficulty();
    let seed = hash_seed(&format!(
        "{}:{}:{year}:{}",
        request.group_id,
        request.week_id,
        difficulty.as_str()
    ));

    let quiz_path = paths::quiz_definition(&request.group_id, &request.week_id);
    let existing = ctx.store.get(&quiz_path).await?;

    if !request.force_regenerate {
        if let Some(cached) = existing
            .as_ref()
            .and_then(|doc| cached_questions(doc, year, difficulty))
        {
            log::info!(
                "quiz {}/{}: returning cached definition",
                request.group_id,
                request.week_id
            );
            return Ok(QuizResponse { questions: cached });
        }
    }

    if request.force_regenerate {
        assert_admin(ctx, &request.group_id, uid).await?;
        ctx.limiter
            .try_consume(
                uid,
                QUIZ_ACTION,
                ctx.config.limits.quiz_regen_per_day,
                DAY_MS,
            )
            .await?;
    }

    let avoid_texts: Vec<String> = existing
        .as_ref()
        .and_then(|doc| doc.get("questions"))
        .map(|raw| {
            coerce_stored_questions(raw)
                .into_iter()
                .map(|question| question.question)
                .collect()
        })
        .unwrap_or_default();

    log::info!(
        "quiz {}/{}: regenerating (year={year} difficulty={} forced={})",
        request.group_id,
        request.week_id,
        difficulty.as_str(),
        request.force_regenerate
    );

    let params = QuizParams {
        year,
        difficulty,
        seed: seed.clone(),
        avoid_texts,
    };
    let (questions, source_summary) = generate_questions(ctx.model.as_ref(), &params).await?;

    let definition = QuizDefinition {
        year,
        difficulty,
        seed,
        week_id: request.week_id.clone(),
        questions: questions.clone(),
        source_summary,
        generated_by: uid.to_string(),
        model: format!("{}-or-fallback", ctx.config.model.chat_model),
        created_at: Utc::now(),
    };
    let doc: Value = serde_json::to_value(&definition)?;
    ctx.store.set(&quiz_path, doc).await?;

    Ok(QuizResponse { questions })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::generate::quiz::QUESTION_COUNT;
    use crate::handlers::testing::{context_with, seed_group, seed_member};
    use crate::model_client::testing::FakeModel;
    use crate::models::Provenance;

    use super::*;

    fn request(force: bool) -> QuizRequest {
        QuizRequest {
            group_id: "g1".into(),
            week_id: "w1".into(),
            year: None,
            force_regenerate: force,
        }
    }

    fn caller(uid: &str) -> CallerIdentity {
        CallerIdentity::new(uid)
    }

    #[tokio::test]
    async fn test_requires_authentication() {
        let ctx = context_with(Arc::new(FakeModel::new()));
        let result = generate_weekly_quiz(&ctx, None, request(false)).await;
        assert!(matches!(result, Err(AppError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn test_requires_group_and_week() {
        let ctx = context_with(Arc::new(FakeModel::new()));
        let result = generate_weekly_quiz(
            &ctx,
            Some(&caller("u1")),
            QuizRequest::default(),
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_rejects_non_members() {
        let ctx = context_with(Arc::new(FakeModel::new()));
        seed_group(&ctx, "g1", "admin", 1994).await;
        let result = generate_weekly_quiz(&ctx, Some(&caller("outsider")), request(false)).await;
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_unreachable_model_still_returns_full_fallback_quiz() {
        let model = Arc::new(FakeModel::unreachable());
        let ctx = context_with(model.clone());
        seed_group(&ctx, "g1", "admin", 1994).await;
        seed_member(&ctx, "g1", "u1").await;

        let response = generate_weekly_quiz(&ctx, Some(&caller("u1")), request(false))
            .await
            .unwrap();

        assert_eq!(response.questions.len(), QUESTION_COUNT);
        assert!(response.questions.iter().all(|q| q.year == 1994));
        assert!(response
            .questions
            .iter()
            .all(|q| q.provenance == Provenance::Fallback));

        let stored = ctx
            .store
            .get(&paths::quiz_definition("g1", "w1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["sourceSummary"]["fallbackCount"], 20);
        assert_eq!(stored["sourceSummary"]["modelCount"], 0);
        assert_eq!(stored["year"], 1994);
    }

    #[tokio::test]
    async fn test_fresh_quiz_is_returned_without_model_calls() {
        let model = Arc::new(FakeModel::new());
        let ctx = context_with(model.clone());
        seed_group(&ctx, "g1", "admin", 1994).await;
        seed_member(&ctx, "g1", "u1").await;

        // First call generates (all fallback, model unreachable) and persists.
        generate_weekly_quiz(&ctx, Some(&caller("u1")), request(false))
            .await
            .unwrap();
        let calls_after_first = model.total_calls();

        // Second call must come from the cache.
        let response = generate_weekly_quiz(&ctx, Some(&caller("u1")), request(false))
            .await
            .unwrap();
        assert_eq!(response.questions.len(), QUESTION_COUNT);
        assert_eq!(model.total_calls(), calls_after_first);
    }

    #[tokio::test]
    async fn test_difficulty_drift_triggers_regeneration() {
        let model = Arc::new(FakeModel::new());
        let ctx = context_with(model.clone());
        seed_group(&ctx, "g1", "admin", 1994).await;
        seed_member(&ctx, "g1", "u1").await;

        generate_weekly_quiz(&ctx, Some(&caller("u1")), request(false))
            .await
            .unwrap();
        let calls_after_first = model.total_calls();

        // The group flips its difficulty; the stored quiz is now stale.
        ctx.store
            .set(
                &paths::group("g1"),
                json!({ "adminUid": "admin", "currentYear": 1994, "settings": { "quizDifficulty": "hard" } }),
            )
            .await
            .unwrap();

        generate_weekly_quiz(&ctx, Some(&caller("u1")), request(false))
            .await
            .unwrap();
        assert!(model.total_calls() > calls_after_first);

        let stored = ctx
            .store
            .get(&paths::quiz_definition("g1", "w1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["difficulty"], "hard");
    }

    #[tokio::test]
    async fn test_forced_regeneration_requires_admin() {
        let ctx = context_with(Arc::new(FakeModel::new()));
        seed_group(&ctx, "g1", "admin", 1994).await;
        seed_member(&ctx, "g1", "u1").await;

        let result = generate_weekly_quiz(&ctx, Some(&caller("u1")), request(true)).await;
        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_forced_regeneration_is_rate_limited() {
        let model = Arc::new(FakeModel::new());
        let mut ctx = context_with(model);
        ctx.config.limits.quiz_regen_per_day = 1;
        seed_group(&ctx, "g1", "admin", 1994).await;
        seed_member(&ctx, "g1", "admin").await;

        generate_weekly_quiz(&ctx, Some(&caller("admin")), request(true))
            .await
            .unwrap();
        let denied = generate_weekly_quiz(&ctx, Some(&caller("admin")), request(true)).await;
        assert!(matches!(denied, Err(AppError::ResourceExhausted(_))));
    }

    #[tokio::test]
    async fn test_group_year_overrides_request_year() {
        let ctx = context_with(Arc::new(FakeModel::new()));
        seed_group(&ctx, "g1", "admin", 1987).await;
        seed_member(&ctx, "g1", "u1").await;

        let mut req = request(false);
        req.year = Some(2005);
        let response = generate_weekly_quiz(&ctx, Some(&caller("u1")), req)
            .await
            .unwrap();
        assert!(response.questions.iter().all(|q| q.year == 1987));
    }

    #[tokio::test]
    async fn test_missing_group_is_not_found() {
        let ctx = context_with(Arc::new(FakeModel::new()));
        // Membership marker without a group document.
        seed_member(&ctx, "g1", "u1").await;
        let result = generate_weekly_quiz(&ctx, Some(&caller("u1")), request(false)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
