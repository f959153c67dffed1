//! Shared data model: chat messages and DCE tasks.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image reference, tool-call record, or other non-text payload
/// riding alongside a message. Kept opaque at this layer; the
/// Prompt Assembler and LLM Client pass it through unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    Image { reference: String },
    ToolCall { name: String, arguments: String },
}

/// A single turn in a conversation. Immutable once appended to a
/// Conversation — callers that need to "edit" history replace the
/// whole message list instead (see `Conversation::set_messages`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Message {
            role,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Message::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::new(MessageRole::Assistant, content)
    }
}

/// A unit of work tracked by a Companion. Equality (and therefore
/// duplicate detection when appending new tasks) is by description
/// only — two tasks with the same description are the same task even
/// if their files/functions/notes differ, matching the "non-duplicate
/// by description" rule the Task Builder relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        Task {
            description: description.into(),
            files: Vec::new(),
            functions: Vec::new(),
            dependencies: Vec::new(),
            notes: Vec::new(),
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.description == other.description
    }
}

impl Eq for Task {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_equality_ignores_files_and_notes() {
        let mut a = Task::new("New method `Foo` was added.");
        a.files.push("pkg/x.go".to_string());

        let mut b = Task::new("New method `Foo` was added.");
        b.notes.push("unrelated note".to_string());

        assert_eq!(a, b);
    }

    #[test]
    fn message_role_round_trips_through_json() {
        let msg = Message::user("hello");
        let json = serde_json::to_string(&msg).expect("serialize");
        let back: Message = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(msg, back);
    }
}
