//! Pipeline stages and their legal transitions.
//!
//! ```text
//! Generating → Evaluating → Deciding → Revising → Done
//!                                    ↘ Done
//! any non-terminal stage → Failed | Cancelled
//! ```
//!
//! There is no edge back into `Evaluating` or `Revising`, so a run performs
//! at most one revision.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Writing the first draft.
    Generating,
    /// Scoring the draft against the rubric.
    Evaluating,
    /// Applying the readiness policy.
    Deciding,
    /// Rewriting the draft once from the edit instructions.
    Revising,
    /// Final story chosen; terminal.
    Done,
    /// A collaborator failed; terminal.
    Failed,
    /// Cancelled at a suspension point; terminal.
    Cancelled,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generating => write!(f, "Generating"),
            Self::Evaluating => write!(f, "Evaluating"),
            Self::Deciding => write!(f, "Deciding"),
            Self::Revising => write!(f, "Revising"),
            Self::Done => write!(f, "Done"),
            Self::Failed => write!(f, "Failed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

fn is_legal_transition(from: PipelineStage, to: PipelineStage) -> bool {
    use PipelineStage::*;

    if matches!(to, Failed | Cancelled) && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Generating, Evaluating)
            | (Evaluating, Deciding)
            | (Deciding, Revising)
            | (Deciding, Done)
            | (Revising, Done)
    )
}

/// A single recorded stage transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PipelineStage,
    pub to: PipelineStage,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Illegal stage transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: PipelineStage,
    pub to: PipelineStage,
}

/// Tracks the current stage of one run and rejects illegal transitions.
#[derive(Debug)]
pub struct StageMachine {
    current: PipelineStage,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl StageMachine {
    /// Every run starts at `Generating`.
    pub fn new() -> Self {
        Self {
            current: PipelineStage::Generating,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    pub fn advance(
        &mut self,
        to: PipelineStage,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.current, to) {
            return Err(IllegalTransition {
                from: self.current,
                to,
            });
        }

        tracing::debug!(from = %self.current, to = %to, "Stage transition");

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Stages visited, starting with `Generating`.
    pub fn path(&self) -> Vec<PipelineStage> {
        std::iter::once(PipelineStage::Generating)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}
