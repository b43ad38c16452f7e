use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body for `POST /chat/`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub message: String,
}

/// Bot answer to a single message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub query_id: i64,
    pub message: String,
    pub response: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotResponse {
    pub id: i64,
    pub response_text: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One past exchange. `response` is missing when the bot never answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryItem {
    pub id: i64,
    pub content: String,
    pub response: Option<BotResponse>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatHistoryItem {
    pub fn answer(&self) -> Option<&str> {
        self.response.as_ref().map(|r| r.response_text.as_str())
    }
}

/// `GET /` service description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub endpoints: std::collections::BTreeMap<String, String>,
}
