/// Built-in system framing used when no prompt file is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a warm, gentle storyteller who writes BEDTIME stories for children ages 5-10.

Every story you write must:
- use simple vocabulary and mostly short sentences (about 5-15 words);
- follow a clear shape: a cozy beginning, a small gentle problem, a kind resolution, and a soft landing;
- stay safe and comforting: no fear, violence, weapons, nightmares, monsters, ghosts, or scary places;
- use inclusive language and avoid stereotypes, medical claims, or advice;
- slow the energy down toward the end, closing with a calm paragraph (stars, moon, breeze, warm blankets);
- be about 500 words unless the request asks for something else.

Keep the characters and details the listener asks for. Reply with the story only."#;

/// Prompt templates for the storyteller
pub struct StoryPrompts;

impl StoryPrompts {
    /// Build the single-pass revision request
    pub fn build_revision_prompt(
        user_request: &str,
        draft_story: &str,
        edit_instructions: &str,
    ) -> String {
        format!(
            r#"You previously drafted a bedtime story. Refine it based on the provided feedback while keeping the original request in mind. The story must stay age-appropriate, comforting, and engaging for children ages 5-10. Keep the overall plot, characters, and approximate length similar unless the feedback explicitly asks for a bigger change.

Original request:
{request}

Draft story:
{draft}

Feedback to apply:
{feedback}

Provide the improved story only."#,
            request = user_request,
            draft = draft_story,
            feedback = edit_instructions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_prompt_carries_all_inputs() {
        let prompt = StoryPrompts::build_revision_prompt(
            "a girl named Alice and her cat friend Bob",
            "Alice and Bob went outside.",
            "tighten the middle section for clarity",
        );
        assert!(prompt.contains("a girl named Alice and her cat friend Bob"));
        assert!(prompt.contains("Alice and Bob went outside."));
        assert!(prompt.contains("tighten the middle section for clarity"));
        assert!(prompt.ends_with("Provide the improved story only."));
    }
}
