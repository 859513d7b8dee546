// SPDX-License-Identifier: MIT

//! Gemini API client for the survey chat.
//!
//! Two call shapes against `generateContent`:
//! - a conversational call (system instruction + history) for the next
//!   assistant message
//! - a forced function-calling call that extracts structured roommate
//!   preferences from the same history

use crate::error::AppError;
use crate::models::{Message, MessageRole};
use serde::{Deserialize, Serialize};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Tool the extraction call is forced to invoke.
pub const EXTRACTION_TOOL: &str = "record_roommate_preferences";

const CHAT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that is trying to \
understand the users needs and preferences in what they are looking for in a roommate. \
Ask one question at a time and keep the conversation friendly and short.";

const EXTRACTION_SYSTEM_INSTRUCTION: &str = "You extract roommate lifestyle preferences \
from a survey conversation. Record every preference the user has clearly stated so far. \
Leave out anything the user has not mentioned. Set survey_complete to true only once \
budget, cleanliness, smoking, pets and schedule have all been covered.";

/// Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new client for the configured model.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: GEMINI_API_BASE.to_string(),
            api_key,
            model,
        }
    }

    /// Override the API base URL (tests).
    #[doc(hidden)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Generate the next assistant message for the given history.
    pub async fn chat_reply(&self, history: &[Message]) -> Result<String, AppError> {
        let request = GenerateContentRequest {
            system_instruction: Some(SystemInstruction::from_text(CHAT_SYSTEM_INSTRUCTION)),
            contents: history.iter().map(Content::from_message).collect(),
            tools: None,
            tool_config: None,
        };

        let response = self.generate_content(&request).await?;

        let reply = response.concatenated_text();
        if reply.is_empty() {
            return Err(AppError::ModelApi(
                "Model returned an empty reply".to_string(),
            ));
        }

        Ok(reply)
    }

    /// Run the extraction call over the history.
    ///
    /// Returns the extracted characteristics (possibly empty) and whether
    /// the model considers the survey complete.
    pub async fn extract_characteristics(
        &self,
        history: &[Message],
    ) -> Result<Extraction, AppError> {
        let request = GenerateContentRequest {
            system_instruction: Some(SystemInstruction::from_text(EXTRACTION_SYSTEM_INSTRUCTION)),
            contents: history.iter().map(Content::from_message).collect(),
            tools: Some(vec![Tool {
                function_declarations: vec![extraction_tool_declaration()],
            }]),
            tool_config: Some(ToolConfig {
                function_calling_config: FunctionCallingConfig {
                    mode: "ANY".to_string(),
                    allowed_function_names: vec![EXTRACTION_TOOL.to_string()],
                },
            }),
        };

        let response = self.generate_content(&request).await?;

        let Some(mut args) = response.function_call_args(EXTRACTION_TOOL) else {
            // The model declined to call the tool. Treat as "nothing new".
            tracing::debug!("Extraction call returned no function call");
            return Ok(Extraction::default());
        };

        let survey_complete = args
            .remove("survey_complete")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        Ok(Extraction {
            characteristics: args,
            survey_complete,
        })
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, AppError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::ModelApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ModelApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ModelApi(format!("JSON parse error: {}", e)))
    }
}

/// Result of an extraction call.
#[derive(Debug, Default)]
pub struct Extraction {
    pub characteristics: serde_json::Map<String, serde_json::Value>,
    pub survey_complete: bool,
}

/// Schema for the preference-recording tool.
fn extraction_tool_declaration() -> FunctionDeclaration {
    FunctionDeclaration {
        name: EXTRACTION_TOOL.to_string(),
        description: "Record roommate lifestyle preferences the user has stated".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "religion": { "type": "string" },
                "monthly_budget": {
                    "type": "number",
                    "description": "Maximum monthly rent budget in USD"
                },
                "hobbies": { "type": "array", "items": { "type": "string" } },
                "cleanliness": {
                    "type": "string",
                    "description": "How tidy the user wants shared spaces kept"
                },
                "smoking": { "type": "string" },
                "pets": { "type": "string" },
                "sleep_schedule": { "type": "string" },
                "guests": { "type": "string" },
                "notes": { "type": "string" },
                "survey_complete": {
                    "type": "boolean",
                    "description": "True once all core topics have been covered"
                }
            }
        }),
    }
}

// ─── Wire types (Gemini REST, camelCase) ─────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<TextPart>,
}

impl SystemInstruction {
    fn from_text(text: &str) -> Self {
        Self {
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<TextPart>,
}

impl Content {
    fn from_message(message: &Message) -> Self {
        // Gemini calls the assistant side "model"
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        };
        Self {
            role: role.to_string(),
            parts: vec![TextPart {
                text: message.content.clone(),
            }],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    function_calling_config: FunctionCallingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FunctionCallingConfig {
    mode: String,
    allowed_function_names: Vec<String>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn concatenated_text(&self) -> String {
        let Some(candidate) = self.candidates.first() else {
            return String::new();
        };

        let mut out = String::new();
        for part in &candidate.content.parts {
            if let Some(text) = &part.text {
                out.push_str(text);
                out.push('\n');
            }
        }
        out.trim_end().to_string()
    }

    /// Arguments of the named function call, if present.
    fn function_call_args(
        &self,
        name: &str,
    ) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.candidates
            .first()?
            .content
            .parts
            .iter()
            .filter_map(|p| p.function_call.as_ref())
            .find(|fc| fc.name == name)
            .and_then(|fc| fc.args.as_object().cloned())
    }
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}
