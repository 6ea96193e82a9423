//! The AgentForge prompt pipeline.
//!
//! A run goes through four steps, in order:
//!
//! 1. **Normalize** the agent profile into a canonical key order
//! 2. **Build** the two-message prompt (system instruction, intent + context)
//! 3. **Dispatch** it through the retrying completion client
//! 4. **Record** token usage and estimated cost (failures only logged)

pub mod profile;
pub mod prompt;
pub mod runner;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use profile::{NormalizedProfile, normalize_profile};
pub use prompt::{CONTEXT_LABEL, GeneratedPrompt, SYSTEM_PROMPT, generate_prompt};
pub use runner::{PromptRunner, RunAgentPrompt, RunAgentPromptResult};
