//! Chat message types

use serde::{Deserialize, Serialize};

/// Role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[serde(alias = "human")]
    User,
    #[serde(alias = "ai")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a role name, case-insensitively, accepting the `human`/`ai`
    /// aliases some callers use.
    pub fn parse(role: &str) -> Option<Self> {
        match role.trim().to_lowercase().as_str() {
            "system" => Some(Role::System),
            "user" | "human" => Some(Role::User),
            "assistant" | "ai" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// Chat message for LLM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a message from a raw `{role, content}` pair.
    ///
    /// Returns `None` for roles outside system/user/assistant.
    pub fn from_parts(role: &str, content: impl Into<String>) -> Option<Self> {
        Role::parse(role).map(|role| Self {
            role,
            content: content.into(),
        })
    }

    /// Get the role as a string (for API compatibility)
    pub fn role_str(&self) -> &'static str {
        self.role.as_str()
    }
}

/// Build the message list sent for one invocation.
///
/// With history, the prompt becomes the final user turn after the history;
/// without it, the prompt is sent on its own.
pub fn build_conversation(prompt: &str, history: Option<&[ChatMessage]>) -> Vec<ChatMessage> {
    let mut messages = history.map(|h| h.to_vec()).unwrap_or_default();
    messages.push(ChatMessage::user(prompt));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_user_message() {
        let msg = ChatMessage::user("Hello");
        assert_eq!(msg.role_str(), "user");
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_role_aliases() {
        assert_eq!(Role::parse("Human"), Some(Role::User));
        assert_eq!(Role::parse("AI"), Some(Role::Assistant));
        assert_eq!(Role::parse("tool"), None);

        let parsed: ChatMessage =
            serde_json::from_str(r#"{"role": "ai", "content": "Once upon a time"}"#).unwrap();
        assert_eq!(parsed, ChatMessage::assistant("Once upon a time"));
    }

    #[test]
    fn test_from_parts_skips_unknown_roles() {
        assert!(ChatMessage::from_parts("narrator", "...").is_none());
        assert_eq!(
            ChatMessage::from_parts("system", "Be terse"),
            Some(ChatMessage::system("Be terse"))
        );
    }

    #[test]
    fn test_conversation_appends_prompt_last() {
        let history = vec![
            ChatMessage::system("You are an editor."),
            ChatMessage::user("Chapter one?"),
            ChatMessage::assistant("A storm."),
        ];
        let messages = build_conversation("Chapter two?", Some(&history));
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[3], ChatMessage::user("Chapter two?"));

        let bare = build_conversation("Just this", None);
        assert_eq!(bare, vec![ChatMessage::user("Just this")]);
    }
}
