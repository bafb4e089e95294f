//! Weekly quiz generation.
//!
//! States: check-cache, generate, validate, backfill, persist. The cache
//! check and the round loop live here; persistence stays with the handler.
//! Whatever the model delivers, the result is always exactly
//! [`QUESTION_COUNT`] questions locked to the target year.

use serde_json::Value;
use std::collections::HashSet;

use crate::error::Result;
use crate::model_client::LanguageModel;
use crate::models::{Difficulty, Provenance, QuizQuestion, SourceSummary};
use crate::utils::text::{has_other_year, normalize_ws, question_key};

/// Questions per quiz.
pub const QUESTION_COUNT: usize = 20;

/// Maximum generation rounds against the model.
const MAX_ROUNDS: usize = 5;

/// Batch size for the first round; later rounds ask for less because they
/// only top up the unique set.
const FIRST_BATCH: u32 = 35;
const RETRY_BATCH: u32 = 20;

/// Prior question texts carried into the avoid-list, at most.
const AVOID_LIMIT: usize = 20;

/// Generation parameters for one quiz.
#[derive(Debug, Clone)]
pub struct QuizParams {
    pub year: i32,
    pub difficulty: Difficulty,
    pub seed: String,
    /// Question texts the model must not repeat (stale cache carry-over)
    pub avoid_texts: Vec<String>,
}

/// Return the cached questions when the stored definition is still valid
/// for (year, difficulty): exactly 20 year-locked questions and a
/// provenance summary. `None` means the quiz must be regenerated.
pub fn cached_questions(doc: &Value, year: i32, difficulty: Difficulty) -> Option<Vec<QuizQuestion>> {
    let stored_year = doc.get("year").and_then(Value::as_i64)?;
    if stored_year != i64::from(year) {
        return None;
    }

    let stored_difficulty = Difficulty::normalize(doc.get("difficulty").and_then(Value::as_str));
    if stored_difficulty != difficulty {
        return None;
    }

    let summary = doc.get("sourceSummary")?;
    if !summary.get("modelCount").is_some_and(Value::is_u64)
        || !summary.get("fallbackCount").is_some_and(Value::is_u64)
    {
        return None;
    }

    let strict = filter_to_year(coerce_stored_questions(doc.get("questions")?), year);
    if strict.len() != QUESTION_COUNT {
        return None;
    }
    Some(strict)
}

/// Coerce stored questions leniently, accepting the legacy alias keys
/// (`q`, `choices`, `explain`, `correctIndex`, `source`).
pub fn coerce_stored_questions(raw: &Value) -> Vec<QuizQuestion> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .take(QUESTION_COUNT)
        .filter_map(|item| {
            let question = string_field(item, &["question", "q"]);
            let options = options_field(item);
            if question.is_empty() || options.len() != 4 {
                return None;
            }
            let answer_index = item
                .get("answerIndex")
                .or_else(|| item.get("correctIndex"))
                .and_then(Value::as_i64)
                .unwrap_or(0)
                .clamp(0, 3) as u8;
            let provenance = match item
                .get("provenance")
                .or_else(|| item.get("source"))
                .and_then(Value::as_str)
            {
                Some("fallback") => Provenance::Fallback,
                _ => Provenance::Model,
            };
            Some(QuizQuestion {
                year: item.get("year").and_then(Value::as_i64).unwrap_or(0) as i32,
                question,
                options,
                answer_index,
                explanation: string_field(item, &["explanation", "explain"]),
                provenance,
            })
        })
        .collect()
}

/// Normalize a model reply's question list. Invalid entries are dropped,
/// not repaired.
fn normalize_reply_questions(raw: &Value, max_count: usize) -> Vec<QuizQuestion> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .take(max_count)
        .filter_map(|item| {
            let question = string_field(item, &["question", "q"]);
            let options = options_field(item);
            let answer_index = item.get("answerIndex").and_then(Value::as_i64).unwrap_or(-1);
            let year = item.get("year").and_then(Value::as_i64)?;
            if question.is_empty() || options.len() != 4 || !(0..=3).contains(&answer_index) {
                return None;
            }
            Some(QuizQuestion {
                year: year as i32,
                question,
                options,
                answer_index: answer_index as u8,
                explanation: string_field(item, &["explanation", "explain"]),
                provenance: Provenance::Model,
            })
        })
        .collect()
}

/// Keep only questions strictly locked to `year`: matching year field,
/// exactly 4 options, a valid answer index, and no option mentioning a
/// different 4-digit year.
pub fn filter_to_year(questions: Vec<QuizQuestion>, year: i32) -> Vec<QuizQuestion> {
    questions
        .into_iter()
        .filter(|question| {
            question.year == year
                && question.options.len() == 4
                && question.answer_index <= 3
                && !normalize_ws(&question.question).is_empty()
                && !has_other_year(&question.options, year)
        })
        .collect()
}

fn string_field(item: &Value, keys: &[&str]) -> String {
    for key in keys {
        if let Some(text) = item.get(*key).and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    String::new()
}

fn options_field(item: &Value) -> Vec<String> {
    let raw = item
        .get("options")
        .or_else(|| item.get("choices"))
        .and_then(Value::as_array);
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.iter()
        .take(4)
        .map(|option| {
            option
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| option.to_string())
        })
        .collect()
}

fn round_prompt(params: &QuizParams, round: usize, question_count: u32) -> String {
    let avoid: Vec<&str> = params
        .avoid_texts
        .iter()
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .take(AVOID_LIMIT)
        .collect();
    let instruction_seed = if round == 0 {
        params.seed.clone()
    } else {
        format!("{}_retry_{round}", params.seed)
    };

    let year = params.year;
    let mut lines = vec![
        format!("Generate exactly {question_count} nostalgia quiz questions."),
        format!("Focus year: {year}. ONLY use this exact year."),
        "NO OTHER YEARS are allowed anywhere.".to_string(),
        format!("Difficulty hint: {}.", params.difficulty.as_str()),
        format!("Deterministic seed for this group/week/year: {instruction_seed}."),
        "Difficulty guidelines:".to_string(),
        "easy: basic pop culture and major events, very recognizable questions.".to_string(),
        "medium: balanced mix of pop culture, tech, sports, and world events.".to_string(),
        "hard: deeper or less obvious facts, niche events, second-tier hits, tech details."
            .to_string(),
        "Each question must have year, question, options[4], answerIndex (0-3), explanation."
            .to_string(),
        "Do not repeat any question text within this quiz.".to_string(),
        format!("Question.year MUST be {year} for every item."),
        format!("No option may contain any 4-digit year other than {year}."),
    ];
    if round > 0 {
        lines.push(format!(
            "RETRY {round}: NO OTHER YEARS. If uncertain, rewrite the question to stay in {year}."
        ));
        lines.push(
            "If any question cannot be guaranteed for the exact year, replace it before returning."
                .to_string(),
        );
    }
    if !avoid.is_empty() {
        lines.push("Do not reuse or closely paraphrase any of these prior questions:".to_string());
        for (index, text) in avoid.iter().enumerate() {
            lines.push(format!("{}. {text}", index + 1));
        }
    }
    lines.push("Return ONLY JSON in this exact shape:".to_string());
    lines.push(format!(
        "{{\"questions\":[{{\"year\":{year},\"question\":\"...\",\"options\":[\"a\",\"b\",\"c\",\"d\"],\"answerIndex\":0,\"explanation\":\"...\"}}]}}"
    ));
    lines.join("\n")
}

/// Fixed bank of year-parameterized synthetic questions.
///
/// Options rotate through a shared pool and the answer index is
/// `(year + bank index) % 4`, spreading answers evenly across slots.
fn fallback_bank(year: i32, avoid_texts: &[String]) -> Vec<QuizQuestion> {
    let prompts = [
        format!("Which headline music release in {year} had the biggest cultural impact?"),
        format!("Which live performance from {year} is most associated with that year's sound?"),
        format!("Which soundtrack moment in {year} became widely recognizable?"),
        format!("Which radio trend best matches mainstream listening in {year}?"),
        format!("Which debut act most defined new talent in {year}?"),
        format!("Which collaboration style was most visible in {year}?"),
        format!("Which award-show music moment is most linked to {year}?"),
        format!("Which chart pattern best describes hit songs in {year}?"),
        format!("Which album production style stood out in {year}?"),
        format!("Which genre crossover became common in {year}?"),
        format!("Which tour format gained traction in {year}?"),
        format!("Which music video direction was most typical in {year}?"),
        format!("Which festival talking point was tied to {year}?"),
        format!("Which breakthrough single pattern best fits {year}?"),
        format!("Which vocal trend best reflects top songs in {year}?"),
        format!("Which instrumentation choice was common in {year}?"),
        format!("Which TV-and-music crossover felt most emblematic of {year}?"),
        format!("Which pop-culture music headline best matches {year}?"),
        format!("Which dance-floor trend was strongest in {year}?"),
        format!("Which songwriting theme appeared most often in {year}?"),
        format!("Which chart-climbing strategy was typical in {year}?"),
        format!("Which live-band arrangement was most associated with {year}?"),
        format!("Which remix trend best fits the sound of {year}?"),
        format!("Which artist rollout style became common in {year}?"),
    ];

    let option_pool = [
        format!("A breakthrough mainstream hit from {year}"),
        format!("A crossover success associated with {year}"),
        format!("A live-performance moment discussed in {year}"),
        format!("A chart-dominating release from {year}"),
        format!("A radio staple heavily played in {year}"),
        format!("A soundtrack-driven song surge in {year}"),
        format!("A genre-blending anthem tied to {year}"),
        format!("A festival favorite strongly linked to {year}"),
    ];

    let bank: Vec<QuizQuestion> = prompts
        .iter()
        .enumerate()
        .map(|(index, question)| QuizQuestion {
            year,
            question: question.clone(),
            options: vec![
                option_pool[index % option_pool.len()].clone(),
                option_pool[(index + 2) % option_pool.len()].clone(),
                option_pool[(index + 4) % option_pool.len()].clone(),
                option_pool[(index + 6) % option_pool.len()].clone(),
            ],
            answer_index: (year + index as i32).rem_euclid(4) as u8,
            explanation: format!("Fallback year-locked question for {year}."),
            provenance: Provenance::Fallback,
        })
        .collect();

    let avoid: HashSet<String> = avoid_texts
        .iter()
        .map(|text| question_key(text))
        .filter(|key| !key.is_empty())
        .collect();
    let filtered: Vec<QuizQuestion> = bank
        .iter()
        .filter(|item| !avoid.contains(&question_key(&item.question)))
        .cloned()
        .collect();

    // If avoiding prior questions starves the bank, reuse it whole.
    let pool = if filtered.len() >= QUESTION_COUNT {
        filtered
    } else {
        bank
    };
    pool.into_iter().take(QUESTION_COUNT).collect()
}

fn filler_question(year: i32, pad: usize) -> QuizQuestion {
    QuizQuestion {
        year,
        question: format!("Year {year} music memory check #{pad}"),
        options: vec![
            format!("Notable release in {year}"),
            format!("Popular radio trend in {year}"),
            format!("Major live performance in {year}"),
            format!("Breakout artist moment in {year}"),
        ],
        answer_index: 0,
        explanation: format!("Fallback filler for strict year {year}."),
        provenance: Provenance::Fallback,
    }
}

/// Run the generate/validate/backfill stages and return exactly
/// [`QUESTION_COUNT`] questions plus the provenance summary.
///
/// Model failure at any round abandons the model path entirely; the
/// deterministic backfill then carries the whole quiz.
pub async fn generate_questions(
    model: &dyn LanguageModel,
    params: &QuizParams,
) -> Result<(Vec<QuizQuestion>, SourceSummary)> {
    let mut accepted: Vec<QuizQuestion> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for round in 0..MAX_ROUNDS {
        if accepted.len() >= QUESTION_COUNT {
            break;
        }
        let request_count = if round == 0 { FIRST_BATCH } else { RETRY_BATCH };
        let prompt = round_prompt(params, round, request_count);

        let reply = match model.chat_json(&prompt, 4200, 0.9).await {
            Ok(reply) => reply,
            Err(error) => {
                log::error!("quiz generation round {round} failed: {error}");
                accepted.clear();
                seen.clear();
                break;
            }
        };

        let raw_count = reply
            .get("questions")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let normalized = normalize_reply_questions(
            reply.get("questions").unwrap_or(&Value::Null),
            (request_count as usize).max(40),
        );
        let filtered = filter_to_year(normalized, params.year);
        log::info!(
            "quiz round {round}: requested={request_count} raw={raw_count} year_locked={} unique_before={}",
            filtered.len(),
            accepted.len()
        );

        for question in filtered {
            let key = question_key(&question.question);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.insert(key);
            accepted.push(question);
            if accepted.len() >= QUESTION_COUNT {
                break;
            }
        }
        log::info!("quiz round {round}: unique_after={}", accepted.len());
    }

    accepted.truncate(QUESTION_COUNT);
    let model_count = accepted.len() as u32;

    if accepted.len() < QUESTION_COUNT {
        let accepted_texts: Vec<String> =
            accepted.iter().map(|q| q.question.clone()).collect();
        for fallback in fallback_bank(params.year, &accepted_texts) {
            if accepted.len() >= QUESTION_COUNT {
                break;
            }
            let key = question_key(&fallback.question);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.insert(key);
            accepted.push(fallback);
        }
    }

    let mut pad = 1;
    while accepted.len() < QUESTION_COUNT {
        let filler = filler_question(params.year, pad);
        let key = question_key(&filler.question);
        if seen.insert(key) {
            accepted.push(filler);
        }
        pad += 1;
    }

    let fallback_count = accepted.len() as u32 - model_count;
    Ok((
        accepted,
        SourceSummary {
            model_count,
            fallback_count,
        },
    ))
}
