use crate::ReviewOptions;

/// Prompt templates for the judge
pub struct JudgePrompts;

impl JudgePrompts {
    /// System framing for the judge: rubric, constraints and response format
    pub fn system_prompt() -> &'static str {
        r#"You are a careful children's literature JUDGE for BEDTIME stories (ages 5-10).
Evaluate a single story and produce:
- rubric SCORES (0-5 integers) for: age_fit, safety_sensitivity, clarity_structure,
  tone_bedtime, engagement_creativity, length_fit;
- a list of concise ISSUES (if any);
- a single EDIT_INSTRUCTIONS block with a compact revision plan.

ENFORCE THESE CONSTRAINTS:
- Age fit (5-10): simple vocabulary; mostly short sentences (~5-15 words); concrete imagery; avoid complex metaphors, sarcasm, or adult topics.
- Safety & sensitivity: no fear/violence/weaponry/gore/nightmares; no spooky entities (monster/ghost/haunted); no stereotypes; inclusive language; no medical/health claims or prescriptive advice.
- Structure & clarity: Beginning -> gentle problem -> kind resolution -> soft landing; easy to follow; no cliffhangers.
- Bedtime tone: calming, decelerating energy; soothing final paragraph (stars, moon, breeze, cozy). Avoid overstimulation.
- Engagement & creativity: light whimsy; mild sensory details; charming but gentle.
- Length fit: near the target length within +/-15%.

READINESS RULE (for your own reasoning):
- Consider a story READY if ALL scores >= 4 AND there are NO safety concerns.
- If the story is NOT ready: include at least one issue and provide clear, specific edit_instructions for ONE revision pass (at most 120 words).
- If the story IS ready: issues may be empty and edit_instructions may be very brief, but must not be empty unless every score is 5.

## Required Response Format

Respond with a single JSON object and nothing else:
{"scores": {"age_fit": 0, "safety_sensitivity": 0, "clarity_structure": 0, "tone_bedtime": 0, "engagement_creativity": 0, "length_fit": 0}, "issues": ["issue1"], "edit_instructions": "Compact revision plan"}"#
    }

    /// Build the per-draft review request
    pub fn build_review_prompt(user_request: &str, story: &str, options: &ReviewOptions) -> String {
        format!(
            r#"Review the following bedtime story REQUEST and DRAFTED STORY.
Assess how well the story fulfills the request and is suitable for ages 5-10.
Apply your rubric, readiness rule, and the response format you were given.

User request: {request}
Child age: {age}
Tone preset: {tone}
Target length (words): {length}
Draft story word count (approx): {words}

--- DRAFT STORY START ---
{story}
--- DRAFT STORY END ---"#,
            request = user_request,
            age = options.child_age,
            tone = options.tone,
            length = options.length_target,
            words = word_count(story),
            story = story,
        )
    }
}

pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_prompt_includes_context() {
        let options = ReviewOptions {
            child_age: 6,
            tone: "playful".into(),
            length_target: 300,
        };
        let prompt = JudgePrompts::build_review_prompt("a cat story", "Bob the cat naps.", &options);
        assert!(prompt.contains("User request: a cat story"));
        assert!(prompt.contains("Child age: 6"));
        assert!(prompt.contains("Tone preset: playful"));
        assert!(prompt.contains("Target length (words): 300"));
        assert!(prompt.contains("word count (approx): 4"));
        assert!(prompt.contains("--- DRAFT STORY START ---\nBob the cat naps.\n"));
    }

    #[test]
    fn test_system_prompt_names_every_axis() {
        let prompt = JudgePrompts::system_prompt();
        for axis in crate::RubricAxis::ALL {
            assert!(prompt.contains(axis.name()), "missing {axis}");
        }
    }

    #[test]
    fn test_system_prompt_asks_for_json() {
        // JSON mode requires the word "JSON" somewhere in the messages
        assert!(JudgePrompts::system_prompt().contains("single JSON object"));
    }
}
