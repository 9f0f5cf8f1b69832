mod error;
mod outcome;
mod pipeline;
mod stage;
mod state;

pub use error::{ErrorKind, PipelineError};
pub use outcome::PipelineResult;
pub use pipeline::{Pipeline, PipelineConfig, DEFAULT_CALL_TIMEOUT};
pub use stage::{IllegalTransition, PipelineStage, StageMachine, TransitionRecord};
pub use state::PipelineState;
