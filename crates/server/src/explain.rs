//! Pluggable explanation text.
//!
//! The engine only produces [`ExplanationFacts`]; turning them into prose
//! (usually via an LLM) is somebody else's job. A provider that fails never
//! fails the recommendation: the pair just comes back without text.

use pipeline::ExplanationFacts;

/// Fixed text for cold-start pairs, which carry no personal signal
pub const COLD_START_EXPLANATION: &str = "**Why this pair?**\n\n\
     - The movie and books are highly rated by many users.\n\
     - These books are selected to give you a variety of top choices to start your reading journey!";

/// Turns structured facts into user-facing text
pub trait ExplanationProvider: Send + Sync {
    fn explain(&self, facts: &ExplanationFacts) -> anyhow::Result<String>;
}

impl<F> ExplanationProvider for F
where
    F: Fn(&ExplanationFacts) -> anyhow::Result<String> + Send + Sync,
{
    fn explain(&self, facts: &ExplanationFacts) -> anyhow::Result<String> {
        self(facts)
    }
}

/// Provider that returns the generation prompt itself.
///
/// Handy for inspecting what an LLM-backed provider would be sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptEcho;

impl ExplanationProvider for PromptEcho {
    fn explain(&self, facts: &ExplanationFacts) -> anyhow::Result<String> {
        Ok(facts.to_prompt())
    }
}
