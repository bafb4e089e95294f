//! Nostalgia chat handler.

use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::limiter::MINUTE_MS;
use crate::model_client::ChatMessage;

use super::{assert_membership, require_auth, CallerIdentity};

const CHAT_ACTION: &str = "chat_minute";

/// Longest accepted user message, in characters.
const MESSAGE_MAX: usize = 800;

/// History entries carried into the model conversation, at most.
const HISTORY_MAX: usize = 8;

/// Characters kept per history entry.
const HISTORY_ENTRY_MAX: usize = 400;

/// Longest reply returned to the client.
const REPLY_MAX: usize = 1500;

/// Year assumed when the context names none.
const DEFAULT_YEAR: i32 = 1990;

/// Chat request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatRequest {
    pub group_id: String,
    pub message: String,
    pub context: Option<ChatContext>,
}

/// Conversation context: the group's year and recent history.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatContext {
    pub year: Option<i32>,
    pub history: Vec<ChatTurn>,
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Chat response.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Produce a year-anchored chat reply for a group member.
pub async fn nostalgia_chat(
    ctx: &AppContext,
    caller: Option<&CallerIdentity>,
    request: ChatRequest,
) -> Result<ChatResponse> {
    let uid = require_auth(caller)?;

    let message = request.message.trim().to_string();
    if request.group_id.is_empty() || message.is_empty() {
        return Err(AppError::invalid_argument(
            "groupId and message are required.",
        ));
    }
    if message.chars().count() > MESSAGE_MAX {
        return Err(AppError::invalid_argument("Message too long."));
    }

    assert_membership(ctx, &request.group_id, uid).await?;
    ctx.limiter
        .try_consume(uid, CHAT_ACTION, ctx.config.limits.chat_per_minute, MINUTE_MS)
        .await?;

    let context = request.context.unwrap_or_default();
    let year = context.year.unwrap_or(DEFAULT_YEAR);

    let mut messages = vec![ChatMessage::system(format!(
        "You are a nostalgic assistant for year {year}. Keep answers concise, friendly, and practical."
    ))];
    let start = context.history.len().saturating_sub(HISTORY_MAX);
    for turn in &context.history[start..] {
        let content = truncate_chars(&turn.content, HISTORY_ENTRY_MAX);
        if content.is_empty() {
            continue;
        }
        messages.push(if turn.role == "assistant" {
            ChatMessage::assistant(content)
        } else {
            ChatMessage::user(content)
        });
    }
    messages.push(ChatMessage::user(message));

    let reply = ctx
        .model
        .chat(&messages, 300, 0.7)
        .await
        .map_err(|error| {
            log::error!("chat completion failed: {error}");
            AppError::internal("AI service unavailable.")
        })?;

    let reply = reply.trim().to_string();
    if reply.is_empty() {
        return Err(AppError::internal("AI returned an empty response."));
    }

    Ok(ChatResponse {
        reply: truncate_chars(&reply, REPLY_MAX),
    })
}
