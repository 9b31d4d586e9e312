use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of a multipart submission, already read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    File(UploadedFile),
    Value { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Transport filename; this is what extraction dispatches on.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Everything one `/doc-chat` request carried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingTurn {
    pub text: String,
    pub model_name: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub incognito: bool,
    /// User-facing label; may differ from the uploaded file's own name.
    pub file_name: Option<String>,
    pub file: Option<UploadedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_text: String,
    pub user_id: String,
    pub file_name: Option<String>,
    pub model_name: String,
    pub ai_response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReply {
    #[serde(rename = "userText")]
    pub user_text: String,
    #[serde(rename = "aiText")]
    pub ai_text: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub system_instruction: Option<GeminiContent>,
    pub contents: Vec<GeminiContent>,
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiCandidate {
    pub content: GeminiContent,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
