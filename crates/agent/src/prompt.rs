//! Prompt builder: fixed system instruction + intent + profile context.

use agentforge_core::message::ChatMessage;
use serde::Serialize;
use serde_json::Value;

use crate::profile::{NormalizedProfile, normalize_profile};

/// The system instruction sent with every prompt. Not configurable.
pub const SYSTEM_PROMPT: &str = "You are an expert, pragmatic assistant. \
Answer briefly, precisely and actionably. \
Use the user's context to personalize the answer and avoid unfounded assumptions.";

/// Label placed above the serialized profile in the user message.
pub const CONTEXT_LABEL: &str = "User context (JSON):";

/// A fully built prompt. Rebuilt on every run, never cached.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPrompt {
    pub system: String,
    /// `Intent: <trimmed intent>`, without the context block
    pub user: String,
    pub context: NormalizedProfile,
    /// Exactly two messages: system, then user with context
    pub messages: Vec<ChatMessage>,
    /// Flattened `SYSTEM:` / `USER:` form of `messages`
    pub text: String,
}

pub fn generate_prompt(profile: &Value, intent: &str) -> GeneratedPrompt {
    let system = SYSTEM_PROMPT.to_string();
    let context = normalize_profile(profile);
    let user = format!("Intent: {}", intent.trim()).trim().to_string();

    let user_with_context = format!("{user}\n\n{CONTEXT_LABEL}\n{}", context.to_pretty_json());
    let text = format!("SYSTEM:\n{system}\n\nUSER:\n{user_with_context}");

    let messages = vec![
        ChatMessage::system(system.clone()),
        ChatMessage::user(user_with_context),
    ];

    GeneratedPrompt {
        system,
        user,
        context,
        messages,
        text,
    }
}
