//! Prompt assembly for the career counselor

use cg_core::{ChatTurn, Role, ScoredChunk, UserProfile};

/// Separator placed between retrieved chunks
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const GROUNDED_HEADER: &str = "You are a helpful and knowledgeable career counselor assistant.\n\
Answer questions based on the context provided.";

const UNGROUNDED_HEADER: &str = "You are a helpful career counselor assistant.\n\
Answer the following question about career guidance:";

/// Build the generator prompt
///
/// With context the chunks are concatenated in retrieval order; without
/// it the prompt asks for a general career-guidance answer. Profile and
/// history sections are omitted when empty.
pub fn build_prompt(
    question: &str,
    context: &[ScoredChunk],
    profile: Option<&UserProfile>,
    history: &[ChatTurn],
) -> String {
    let mut prompt = String::new();

    if context.is_empty() {
        prompt.push_str(UNGROUNDED_HEADER);
    } else {
        prompt.push_str(GROUNDED_HEADER);
        prompt.push_str("\n\nContext:\n");
        let joined = context
            .iter()
            .map(|scored| scored.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);
        prompt.push_str(&joined);
    }

    if let Some(profile) = profile.filter(|p| !p.is_empty()) {
        prompt.push_str("\n\nStudent profile:");
        let background = profile.educational_background.trim();
        if !background.is_empty() {
            prompt.push_str(&format!("\nEducational background: {}", background));
        }
        let interests: Vec<&str> = profile
            .interests
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .collect();
        if !interests.is_empty() {
            prompt.push_str(&format!("\nInterests: {}", interests.join(", ")));
        }
    }

    if !history.is_empty() {
        prompt.push_str("\n\nConversation so far:");
        for turn in history {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            prompt.push_str(&format!("\n{}: {}", speaker, turn.text));
        }
    }

    prompt.push_str(&format!("\n\nQuestion:\n{}\n\nAnswer:", question.trim()));
    prompt
}
