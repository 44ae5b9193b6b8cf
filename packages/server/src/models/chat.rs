use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const SYSTEM_SENDER: &str = "system";

/// Append-only record of what was said and announced during a match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatLog {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    pub player_id: String,
    pub player_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub message_type: ChatMessageType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatMessageType {
    Public, // プレイヤーの発言
    System, // 進行アナウンス
}

impl ChatLog {
    /// Position marker for [`ChatLog::since`].
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn announce(&mut self, content: String) {
        self.push(ChatMessage::system(content));
    }

    /// Messages appended after `mark`; an out-of-range mark yields nothing.
    pub fn since(&self, mark: usize) -> &[ChatMessage] {
        self.messages.get(mark..).unwrap_or_default()
    }
}

impl ChatMessage {
    pub fn from_player(player_id: String, player_name: String, content: String) -> Self {
        Self::build(player_id, player_name, content, ChatMessageType::Public)
    }

    pub fn system(content: String) -> Self {
        Self::build(
            SYSTEM_SENDER.to_string(),
            "System".to_string(),
            content,
            ChatMessageType::System,
        )
    }

    fn build(
        player_id: String,
        player_name: String,
        content: String,
        message_type: ChatMessageType,
    ) -> Self {
        ChatMessage {
            message_id: Uuid::new_v4().to_string(),
            player_id,
            player_name,
            content,
            timestamp: Utc::now(),
            message_type,
        }
    }
}
