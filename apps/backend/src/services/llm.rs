//! Client for the OpenAI-compatible model behind the generation endpoints.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{ApiError, Result};
use crate::models::DbCard;
use crate::services::analytics::SessionStats;

const SYSTEM_PROMPT: &str = "You are an expert study assistant helping a student learn with flashcards.";
const JSON_INSTRUCTION: &str = "Respond with a single JSON object matching this shape and nothing else:";

/// Chat-completions client
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Whether an API key is configured
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Free-form text completion
    pub async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.complete(prompt, false).await
    }

    /// Structured completion decoded into `T`
    pub async fn generate_object<T: DeserializeOwned>(&self, prompt: &str) -> Result<T> {
        let content = self.complete(prompt, true).await?;
        decode(&content)
    }

    async fn complete(&self, prompt: &str, json_mode: bool) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ApiError::Upstream("generation service is not configured".to_string()))?;

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Upstream(format!("generation request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "Generation service returned an error: {}", message);
            return Err(ApiError::Upstream(format!(
                "generation service returned status {}",
                status
            )));
        }

        let response: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("unreadable generation response: {}", e)))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ApiError::Upstream("generation response was empty".to_string()))
    }
}

/// Strip surrounding code fences or prose from a model reply.
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

/// Decode a model reply into `T`.
pub fn decode<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_json::from_str(extract_json(content))
        .map_err(|e| ApiError::Upstream(format!("unexpected generation response shape: {}", e)))
}

// === Structured Shapes ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardSet {
    pub flashcards: Vec<GeneratedFlashcard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFlashcard {
    pub front: String,
    pub back: String,
    pub difficulty: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
    ShortAnswer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSet {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    pub explanation: String,
    pub difficulty: Level,
    pub topic: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyAdjustment {
    Increase,
    Decrease,
    Maintain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptivePlan {
    pub recommendations: Vec<CardRecommendation>,
    pub overall_strategy: OverallStrategy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecommendation {
    pub card_id: String,
    pub next_review_hours: f64,
    pub difficulty_adjustment: DifficultyAdjustment,
    pub focus_reason: String,
    pub study_tip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStrategy {
    pub focus_areas: Vec<String>,
    pub recommended_session_length: f64,
    pub difficulty_distribution: DifficultyDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyDistribution {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    FocusArea,
    StudyMethod,
    DifficultyAdjustment,
    TimeManagement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

// === Prompts ===

fn describe_cards(cards: &[DbCard]) -> String {
    cards
        .iter()
        .map(|card| {
            format!(
                "[{}] Q: {}\nA: {}\nDifficulty: {}",
                card.id, card.front_text, card.back_text, card.difficulty_level
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn describe_sessions(sessions: &[SessionStats]) -> String {
    if sessions.is_empty() {
        return "No completed sessions yet.".to_string();
    }
    sessions
        .iter()
        .map(|s| {
            format!(
                "- {} on {}: {} cards, {}% accuracy, {} seconds",
                s.deck_title,
                s.finished_at.date_naive(),
                s.cards_studied,
                s.accuracy,
                s.seconds
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn flashcards_prompt(content: &str, subject: &str, count: u32) -> String {
    format!(
        "Generate {count} flashcards about {subject} from the material below. \
         Each has a concise question on the front, a complete answer on the back, \
         a difficulty of easy, medium or hard, and optional tags.\n\n{content}\n\n\
         {JSON_INSTRUCTION} {{\"flashcards\": [{{\"front\": string, \"back\": string, \
         \"difficulty\": \"easy\"|\"medium\"|\"hard\", \"tags\": [string]}}]}}"
    )
}

pub fn quiz_prompt(cards: &[DbCard], count: u32, types: &[String], difficulty: &str) -> String {
    format!(
        "Write a {count}-question quiz from these flashcards. Question types: {}. \
         Overall difficulty: {difficulty}. Multiple choice questions have 4 options. \
         Every question carries an explanation of its answer.\n\n{}\n\n\
         {JSON_INSTRUCTION} {{\"questions\": [{{\"type\": \"multiple_choice\"|\"true_false\"|\
         \"fill_blank\"|\"short_answer\", \"question\": string, \"options\": [string], \
         \"correct_answer\": string, \"explanation\": string, \
         \"difficulty\": \"easy\"|\"medium\"|\"hard\", \"topic\": string}}]}}",
        types.join(", "),
        describe_cards(cards)
    )
}

pub fn adaptive_prompt(cards: &[DbCard], sessions: &[SessionStats]) -> String {
    format!(
        "Plan adaptive review for this deck. Cards:\n{}\n\nRecent sessions:\n{}\n\n\
         For each card that needs attention give hours until its next review, whether its \
         difficulty should increase, decrease or stay, why, and a study tip. \
         Then give an overall strategy.\n\n\
         {JSON_INSTRUCTION} {{\"recommendations\": [{{\"card_id\": string, \
         \"next_review_hours\": number, \"difficulty_adjustment\": \"increase\"|\"decrease\"|\"maintain\", \
         \"focus_reason\": string, \"study_tip\": string}}], \"overall_strategy\": \
         {{\"focus_areas\": [string], \"recommended_session_length\": number, \
         \"difficulty_distribution\": {{\"easy\": number, \"medium\": number, \"hard\": number}}}}}}",
        describe_cards(cards),
        describe_sessions(sessions)
    )
}

pub fn recommendations_prompt(sessions: &[SessionStats]) -> String {
    format!(
        "Recent study sessions:\n{}\n\n\
         Give 3 to 5 actionable recommendations to improve this student's studying.\n\n\
         {JSON_INSTRUCTION} {{\"recommendations\": [{{\"type\": \"focus_area\"|\"study_method\"|\
         \"difficulty_adjustment\"|\"time_management\", \"title\": string, \
         \"description\": string, \"priority\": \"high\"|\"medium\"|\"low\"}}]}}",
        describe_sessions(sessions)
    )
}

pub fn explain_prompt(concept: &str, context: Option<&str>, difficulty: &str) -> String {
    let context = context
        .map(|c| format!("\nContext: {}", c))
        .unwrap_or_default();
    format!(
        "Explain the concept \"{concept}\" at a {difficulty} level.{context}\n\
         Start with a plain definition, give an example, and end with a quick self-check question."
    )
}

pub fn study_guide_prompt(topic: &str, cards: &[DbCard]) -> String {
    format!(
        "Create a study guide for {topic} using these flashcards:\n\n{}\n\n\
         Organise it into sections with key points, connections between ideas and a short review checklist.",
        describe_cards(cards)
    )
}
