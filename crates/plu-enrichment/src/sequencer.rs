//! Stepwise loading sequencer
//!
//! A small timed state machine choosing which loading caption to show while
//! enrichment runs:
//!
//! ```text
//! CheckingZone --(dwell, rnu)--------> RnuCopy
//!      |
//!      +------(dwell, non-rnu)-------> CheckingAnalysis --(dwell, analysis)--> FetchingAnalysis
//! ```
//!
//! Each step holds for a minimum dwell time. At every dwell boundary the
//! latest known branch inputs are re-read; an unknown branch keeps the
//! current step. `non_rnu_source` stays on `CheckingAnalysis`.

use crate::progress::EnrichmentStatus;
use crate::scope::ViewScope;
use crate::tracker::EnrichmentSnapshot;
use plu_core::{BranchInputs, ConversationBranch, SequencerTimings};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Displayed loading step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingStep {
    /// `step1_checking_zone`
    CheckingZone,
    /// `step2a_rnu_copy`
    RnuCopy,
    /// `step2b_checking_analysis`
    CheckingAnalysis,
    /// `step2c_fetching_analysis`
    FetchingAnalysis,
}

impl LoadingStep {
    /// Caption shown for this step
    #[must_use]
    pub fn copy(&self) -> &'static str {
        match self {
            Self::CheckingZone => "Vérification de la zone...",
            Self::RnuCopy => "Récupération du RNU...",
            Self::CheckingAnalysis => "Vérification de la présence d'analyse...",
            Self::FetchingAnalysis => "Récupération de l'analyse correspondante...",
        }
    }

    /// No further step can follow
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::RnuCopy | Self::FetchingAnalysis)
    }

    /// Steps `branch` walks through, in order
    #[must_use]
    pub fn sequence_for(branch: ConversationBranch) -> &'static [LoadingStep] {
        match branch {
            ConversationBranch::Rnu => &[Self::CheckingZone, Self::RnuCopy],
            ConversationBranch::NonRnuAnalysis => &[
                Self::CheckingZone,
                Self::CheckingAnalysis,
                Self::FetchingAnalysis,
            ],
            ConversationBranch::NonRnuSource => &[Self::CheckingZone, Self::CheckingAnalysis],
        }
    }
}

impl std::fmt::Display for LoadingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.copy())
    }
}

/// Pure step machine; time is passed in as elapsed since mount
#[derive(Debug, Clone)]
pub struct LoadingSequencer {
    timings: SequencerTimings,
    step: LoadingStep,
    entered_at: Duration,
}

impl LoadingSequencer {
    #[must_use]
    pub fn new(timings: SequencerTimings) -> Self {
        Self {
            timings,
            step: LoadingStep::CheckingZone,
            entered_at: Duration::ZERO,
        }
    }

    #[inline]
    #[must_use]
    pub fn step(&self) -> LoadingStep {
        self.step
    }

    /// Elapsed time at which the current step's dwell ends
    #[must_use]
    pub fn dwell_deadline(&self) -> Option<Duration> {
        let dwell = match self.step {
            LoadingStep::CheckingZone => self.timings.zone_check_dwell(),
            LoadingStep::CheckingAnalysis => self.timings.analysis_check_dwell(),
            LoadingStep::RnuCopy | LoadingStep::FetchingAnalysis => return None,
        };
        Some(self.entered_at + dwell)
    }

    /// Take at most one transition given the latest inputs.
    ///
    /// Returns the new step when one was entered.
    pub fn advance(&mut self, elapsed: Duration, inputs: BranchInputs) -> Option<LoadingStep> {
        let deadline = self.dwell_deadline()?;
        if elapsed < deadline {
            return None;
        }

        let next = match (self.step, inputs.resolve()) {
            (LoadingStep::CheckingZone, Some(ConversationBranch::Rnu)) => LoadingStep::RnuCopy,
            (LoadingStep::CheckingZone, Some(_)) => LoadingStep::CheckingAnalysis,
            (LoadingStep::CheckingAnalysis, Some(ConversationBranch::NonRnuAnalysis))
                if inputs.has_analysis == Some(true) =>
            {
                LoadingStep::FetchingAnalysis
            }
            _ => return None,
        };

        self.step = next;
        self.entered_at = elapsed;
        Some(next)
    }
}

/// Drive a [`LoadingSequencer`] from tracker snapshots inside `scope`.
///
/// The returned receiver starts at `CheckingZone`. The task wakes on dwell
/// deadlines and on snapshot changes, stops at a final step, once
/// enrichment completes, or when the scope is cancelled; nothing is
/// published after cancellation.
#[must_use]
pub fn spawn_sequencer(
    scope: &ViewScope,
    timings: SequencerTimings,
    mut snapshots: watch::Receiver<EnrichmentSnapshot>,
) -> watch::Receiver<LoadingStep> {
    let (tx, rx) = watch::channel(LoadingStep::CheckingZone);
    let token = scope.token();

    scope.spawn(async move {
        let started = Instant::now();
        let mut sequencer = LoadingSequencer::new(timings);
        let mut inputs_open = true;

        loop {
            let (inputs, status) = {
                let snapshot = snapshots.borrow_and_update();
                (snapshot.data.branch_inputs(), snapshot.status)
            };
            if status == EnrichmentStatus::Complete {
                break;
            }

            if let Some(step) = sequencer.advance(started.elapsed(), inputs) {
                if token.is_cancelled() {
                    break;
                }
                tracing::debug!(?step, elapsed_ms = started.elapsed().as_millis(), "loading step");
                if tx.send(step).is_err() {
                    break;
                }
            }
            if sequencer.step().is_final() {
                break;
            }

            // A passed deadline only matters again when inputs change
            let deadline = sequencer
                .dwell_deadline()
                .map(|d| started + d)
                .filter(|at| *at > Instant::now());

            tokio::select! {
                () = token.cancelled() => break,
                () = sleep_until(deadline) => {}
                changed = snapshots.changed(), if inputs_open => {
                    if changed.is_err() {
                        inputs_open = false;
                    }
                }
            }
        }
    });

    rx
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
