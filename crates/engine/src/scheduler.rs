use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use premia_core::Classification;

/// Progress shown while nothing has settled yet starts here and ramps toward
/// 99 as the session timeout approaches.
const PROGRESS_BASE: f64 = 30.0;
const PROGRESS_CEILING_WHILE_POLLING: f64 = 99.0;

/// Session-level lifecycle. `Settled` and `Errored` are terminal; a new
/// proposal id means a new scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Initializing,
    Polling,
    FastPathBackground,
    Settled,
    Errored,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::Errored)
    }
}

/// How a settled session ended, for the consumer's analytics hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettleOutcome {
    HasResults,
    NoResults,
}

/// What the polling loop should do after one fetch-and-classify cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollDirective {
    Continue,
    Settle(SettleOutcome),
}

/// The per-session stop-condition and progress machine.
///
/// Pure over injected `Instant`s: the driving loop owns the timers, this
/// type owns the decisions, so every rule is testable without sleeping.
#[derive(Debug)]
pub struct PollingScheduler {
    session_timeout: Duration,
    fast_path_background: Option<Duration>,
    started_at: Instant,
    phase: SessionPhase,
    fast_path_since: Option<Instant>,
    progress: u8,
}

impl PollingScheduler {
    pub fn new(
        session_timeout: Duration,
        fast_path_background: Option<Duration>,
        now: Instant,
    ) -> Self {
        Self {
            session_timeout,
            fast_path_background,
            started_at: now,
            phase: SessionPhase::Initializing,
            fast_path_since: None,
            progress: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Loading indicator contract: shown while the primary poll loop runs,
    /// never toggled back on by background polling or terminal states.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SessionPhase::Initializing | SessionPhase::Polling)
    }

    /// The insurer directory is in hand; polling begins.
    pub fn begin_polling(&mut self) {
        debug_assert_eq!(self.phase, SessionPhase::Initializing);
        self.phase = SessionPhase::Polling;
    }

    /// Session-terminal failure; absorbing.
    pub fn fail(&mut self) {
        self.phase = SessionPhase::Errored;
    }

    /// Apply one cycle's classification and decide whether to keep polling.
    ///
    /// Stop conditions, in order: every relevant quote finalized; session
    /// timeout elapsed (the no-quotes outcome, regardless of partial state);
    /// fast-path background window exhausted. The fast path itself is not a
    /// stop: the first `Active` quote merely moves the session into silent
    /// background polling.
    pub fn observe(&mut self, classification: &Classification, now: Instant) -> PollDirective {
        match self.phase {
            SessionPhase::Polling => {
                if classification.all_finalized {
                    return self.settle(outcome_of(classification));
                }
                if now.duration_since(self.started_at) >= self.session_timeout {
                    return self.settle(SettleOutcome::NoResults);
                }
                if self.fast_path_background.is_some() && classification.has_active() {
                    self.phase = SessionPhase::FastPathBackground;
                    self.fast_path_since = Some(now);
                }
                PollDirective::Continue
            }
            SessionPhase::FastPathBackground => {
                if classification.all_finalized {
                    return self.settle(outcome_of(classification));
                }
                let deadline_passed = match (self.fast_path_since, self.fast_path_background) {
                    (Some(since), Some(window)) => now.duration_since(since) >= window,
                    _ => true,
                };
                if deadline_passed {
                    return self.settle(outcome_of(classification));
                }
                PollDirective::Continue
            }
            SessionPhase::Initializing | SessionPhase::Settled | SessionPhase::Errored => {
                PollDirective::Continue
            }
        }
    }

    fn settle(&mut self, outcome: SettleOutcome) -> PollDirective {
        self.phase = SessionPhase::Settled;
        self.progress = 100;
        PollDirective::Settle(outcome)
    }

    /// Monotonically non-decreasing progress percentage for the session.
    ///
    /// While polling: the larger of a time ramp (base toward 99 at the
    /// timeout) and a finalized-fraction floor (base toward 100 as relevant
    /// quotes finalize). Settling forces 100.
    pub fn progress(&mut self, classification: &Classification, now: Instant) -> u8 {
        let candidate = match self.phase {
            SessionPhase::Initializing => 0.0,
            SessionPhase::Polling | SessionPhase::FastPathBackground => {
                let elapsed = now.duration_since(self.started_at).as_secs_f64();
                let rate = (PROGRESS_CEILING_WHILE_POLLING - PROGRESS_BASE)
                    / self.session_timeout.as_secs_f64();
                let time_ramp =
                    (PROGRESS_BASE + elapsed * rate).min(PROGRESS_CEILING_WHILE_POLLING);
                let finalized_floor = PROGRESS_BASE
                    + classification.finalized_fraction() * (100.0 - PROGRESS_BASE);
                time_ramp.max(finalized_floor)
            }
            SessionPhase::Settled => 100.0,
            SessionPhase::Errored => f64::from(self.progress),
        };

        let candidate = candidate.clamp(0.0, 100.0).floor() as u8;
        self.progress = self.progress.max(candidate);
        self.progress
    }
}

fn outcome_of(classification: &Classification) -> SettleOutcome {
    if classification.has_displayable() {
        SettleOutcome::HasResults
    } else {
        SettleOutcome::NoResults
    }
}
