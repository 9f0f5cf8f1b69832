use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bedtime_agent::{GenerationError, StoryGenerator};
use bedtime_critic::{is_ready, CritiqueError, ReadinessThreshold, StoryCritic};
use bedtime_logging::{LogEvent, Logger};

use crate::error::{ErrorKind, PipelineError};
use crate::outcome::PipelineResult;
use crate::stage::PipelineStage;
use crate::state::PipelineState;

/// Default limit on a single collaborator call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub threshold: ReadinessThreshold,
    /// Applied to each generate, review and revise call separately
    pub call_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: ReadinessThreshold::default(),
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        }
    }
}

/// Drives a single request through draft, judgement and at most one revision
pub struct Pipeline<'a> {
    generator: &'a dyn StoryGenerator,
    critic: &'a dyn StoryCritic,
    logger: Arc<Logger>,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        generator: &'a dyn StoryGenerator,
        critic: &'a dyn StoryCritic,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            generator,
            critic,
            logger,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one request with the configured threshold
    pub async fn run(&self, user_request: &str) -> PipelineResult {
        self.run_with_threshold(user_request, self.config.threshold)
            .await
    }

    pub async fn run_with_threshold(
        &self,
        user_request: &str,
        threshold: ReadinessThreshold,
    ) -> PipelineResult {
        self.run_with_cancel(user_request, threshold, CancellationToken::new())
            .await
    }

    /// Run one request to a terminal stage.
    ///
    /// `cancel` belongs to this run alone; cancelling it leaves other runs on
    /// the same pipeline untouched. Collaborator failures come back as
    /// [`PipelineResult::Failed`] with the draft and feedback produced so far.
    pub async fn run_with_cancel(
        &self,
        user_request: &str,
        threshold: ReadinessThreshold,
        cancel: CancellationToken,
    ) -> PipelineResult {
        let mut state = PipelineState::new(user_request);
        let run_id = state.run_id.to_string();

        self.logger.log(&LogEvent::RunStarted {
            run_id: run_id.clone(),
            request: user_request.to_string(),
            threshold: threshold.value(),
        });

        match self.drive(&mut state, threshold, &cancel, &run_id).await {
            Ok(()) => self.complete(state, &run_id),
            Err(PipelineError::Cancelled) => {
                let stage = state.stage();
                info!(%run_id, %stage, "Run cancelled");
                let _ = state.advance(PipelineStage::Cancelled, None);
                self.logger.log(&LogEvent::RunCancelled {
                    run_id,
                    stage: stage.to_string(),
                });
                let duration = state.elapsed();
                PipelineResult::cancelled(
                    stage,
                    state.draft_story,
                    state.judge_feedback,
                    duration,
                )
            }
            Err(e) => {
                let stage = state.stage();
                let error = e.to_string();
                warn!(%run_id, %stage, error = %error, "Run failed");
                let _ = state.advance(PipelineStage::Failed, Some(&error));
                self.logger.log(&LogEvent::RunFailed {
                    run_id,
                    stage: stage.to_string(),
                    error: error.clone(),
                });
                let duration = state.elapsed();
                PipelineResult::failed(
                    e.kind(),
                    stage,
                    error,
                    state.draft_story,
                    state.judge_feedback,
                    duration,
                )
            }
        }
    }

    async fn drive(
        &self,
        state: &mut PipelineState,
        threshold: ReadinessThreshold,
        cancel: &CancellationToken,
        run_id: &str,
    ) -> Result<(), PipelineError> {
        self.logger.log(&LogEvent::DraftStarted {
            run_id: run_id.to_string(),
        });
        let started = Instant::now();
        let draft = self
            .guarded(
                self.generator
                    .generate(&mut state.history, &state.user_request),
                GenerationError::Timeout,
                cancel,
            )
            .await?;
        self.logger.log(&LogEvent::DraftCompleted {
            run_id: run_id.to_string(),
            words: draft.split_whitespace().count(),
            duration_secs: started.elapsed().as_secs_f64(),
        });
        state.draft_story = Some(draft.clone());
        state.advance(PipelineStage::Evaluating, None)?;

        self.logger.log(&LogEvent::JudgeStarted {
            run_id: run_id.to_string(),
        });
        let feedback = self
            .guarded(
                self.critic.review(&state.user_request, &draft),
                CritiqueError::Timeout,
                cancel,
            )
            .await?;
        state.advance(PipelineStage::Deciding, None)?;

        let ready = is_ready(&feedback, threshold);
        self.logger.log(&LogEvent::JudgeCompleted {
            run_id: run_id.to_string(),
            scores: feedback.scores.summary(),
            min_score: feedback.scores.min(),
            issues: feedback.issues.len(),
            ready,
            verdict: feedback.short_description(threshold),
        });

        let instructions = feedback.edit_instructions.clone();
        state.judge_feedback = Some(feedback);

        if ready {
            debug!(%run_id, "Draft accepted as is");
            state.finalize(draft, false)?;
            return Ok(());
        }

        state.advance(PipelineStage::Revising, Some("below threshold"))?;
        self.logger.log(&LogEvent::RevisionStarted {
            run_id: run_id.to_string(),
            instructions_preview: instructions.chars().take(100).collect(),
        });
        let started = Instant::now();
        let revised = self
            .guarded(
                self.generator.revise(
                    &mut state.history,
                    &state.user_request,
                    &draft,
                    &instructions,
                ),
                GenerationError::Timeout,
                cancel,
            )
            .await?;
        self.logger.log(&LogEvent::RevisionCompleted {
            run_id: run_id.to_string(),
            words: revised.split_whitespace().count(),
            duration_secs: started.elapsed().as_secs_f64(),
        });
        state.finalize(revised, true)?;
        Ok(())
    }

    fn complete(&self, state: PipelineState, run_id: &str) -> PipelineResult {
        let stage = state.stage();
        let duration = state.elapsed();
        let transitions = state.machine().transitions().to_vec();
        let partial_draft = state.draft_story.clone();

        match state.into_completed() {
            Some((final_story, judge_feedback, revised)) => {
                self.logger.log(&LogEvent::RunCompleted {
                    run_id: run_id.to_string(),
                    revised,
                    duration_secs: duration.as_secs_f64(),
                });
                PipelineResult::completed(
                    final_story,
                    judge_feedback,
                    revised,
                    transitions,
                    duration,
                )
            }
            None => PipelineResult::failed(
                ErrorKind::Internal,
                stage,
                "Run ended without a final story".to_string(),
                partial_draft,
                None,
                duration,
            ),
        }
    }

    /// Await a collaborator call under the per-call timeout, giving up early on cancellation
    async fn guarded<T, E, F>(
        &self,
        call: F,
        on_timeout: impl FnOnce(Duration) -> E,
        cancel: &CancellationToken,
    ) -> Result<T, PipelineError>
    where
        F: Future<Output = Result<T, E>>,
        PipelineError: From<E>,
    {
        let timed = async {
            match self.config.call_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(on_timeout(limit)),
                },
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = timed => result.map_err(PipelineError::from),
        }
    }
}
