mod feedback;
pub mod judge;
mod prompts;
mod readiness;
mod rubric;

pub use feedback::{FeedbackParseError, StoryFeedback, EDIT_INSTRUCTIONS_WORD_CAP};
pub use judge::{CritiqueError, ReviewOptions, StoryCritic, StoryJudge};
pub use prompts::JudgePrompts;
pub use readiness::{is_ready, ReadinessThreshold, RubricError};
pub use rubric::{RubricAxis, RubricScores, ScoreError, MAX_SCORE};
