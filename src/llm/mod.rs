// Answer generation module
// Prompt assembly from retrieved metadata and recent turns, plus the chat client

pub mod openai;


use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

use crate::http::HttpError;
use crate::memory::Turn;
use crate::retrieval::SearchResult;

pub use openai::ChatClient;

const SYSTEM_INSTRUCTIONS: &str = "You are a data assistant that answers questions about business \
metadata. Use only the metadata provided in the context. Always name the table and column \
(as table.column) that hold the data you describe. If the context does not contain enough \
information to answer, say so plainly instead of guessing.";

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("Chat request failed: {0}")]
    Request(#[from] HttpError),

    #[error("Failed to decode chat response: {0}")]
    Decode(String),

    #[error("Chat response contained no answer")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered chat messages sent to the answer model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Prompt {
    messages: Vec<ChatMessage>,
}

impl Prompt {
    /// Build the prompt for `question`.
    ///
    /// The system message carries the answering rules, prior turns follow as
    /// alternating user/assistant messages (oldest first), and the final user
    /// message lists the retrieved metadata as `table.column: doc` lines ahead
    /// of the question itself.
    #[inline]
    pub fn assemble(question: &str, matches: &[SearchResult], history: &[Turn]) -> Self {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::new(Role::System, SYSTEM_INSTRUCTIONS));

        for turn in history {
            messages.push(ChatMessage::new(Role::User, turn.query.as_str()));
            messages.push(ChatMessage::new(Role::Assistant, turn.answer.as_str()));
        }

        messages.push(ChatMessage::new(
            Role::User,
            format_question(question, matches),
        ));

        Self { messages }
    }

    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }
}

fn format_question(question: &str, matches: &[SearchResult]) -> String {
    let mut content = String::from("Context:\n");
    if matches.is_empty() {
        content.push_str("(no matching metadata found)\n");
    }
    for m in matches {
        let _ = writeln!(content, "- {}.{}: {}", m.table, m.column, m.doc);
    }
    let _ = write!(content, "\nQuestion: {}", question);
    content
}

/// Produces an answer for an assembled prompt.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, prompt: &Prompt) -> Result<String, LlmError>;
}

impl<T: AnswerGenerator + ?Sized> AnswerGenerator for &T {
    #[inline]
    fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        (**self).generate(prompt)
    }
}

impl<T: AnswerGenerator + ?Sized> AnswerGenerator for Box<T> {
    #[inline]
    fn generate(&self, prompt: &Prompt) -> Result<String, LlmError> {
        (**self).generate(prompt)
    }
}
