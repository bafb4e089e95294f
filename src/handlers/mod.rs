//! Request handlers: the four callable operations.
//!
//! Each handler is a stateless invocation wiring authorization, rate
//! limiting, generation, and persistence. Validation happens before any
//! network call, and documents are only written once the full target shape
//! is assembled.

pub mod chat;
pub mod news;
pub mod quiz;

use serde_json::Value;

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::GroupDoc;
use crate::store::{paths, DocumentStore};

pub use chat::{nostalgia_chat, ChatContext, ChatRequest, ChatResponse, ChatTurn};
pub use news::{
    generate_year_news_article, generate_year_news_package, ArticleRequest, ArticleResponse,
    PackageRequest, PackageResponse,
};
pub use quiz::{generate_weekly_quiz, QuizRequest, QuizResponse};

/// Authenticated caller identity, resolved by the surrounding transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub uid: String,
}

impl CallerIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}

/// Require an authenticated caller, returning its uid.
fn require_auth(caller: Option<&CallerIdentity>) -> Result<&str> {
    caller
        .map(|identity| identity.uid.as_str())
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| AppError::unauthenticated("Authentication required."))
}

/// Require the caller to be a member of the group.
async fn assert_membership(ctx: &AppContext, group_id: &str, uid: &str) -> Result<()> {
    let member = ctx.store.get(&paths::member(group_id, uid)).await?;
    if member.is_none() {
        return Err(AppError::permission_denied(
            "You are not a member of this group.",
        ));
    }
    Ok(())
}

/// Load the group document, failing with `NotFound` when absent.
async fn load_group(ctx: &AppContext, group_id: &str) -> Result<GroupDoc> {
    let doc: Value = ctx
        .store
        .get(&paths::group(group_id))
        .await?
        .ok_or_else(|| AppError::not_found("Group not found."))?;
    Ok(serde_json::from_value(doc)?)
}

/// Require the caller to be the group's admin.
async fn assert_admin(ctx: &AppContext, group_id: &str, uid: &str) -> Result<()> {
    let group = load_group(ctx, group_id).await?;
    if group.admin() != Some(uid) {
        return Err(AppError::permission_denied(
            "Only admins can generate quiz content.",
        ));
    }
    Ok(())
}
