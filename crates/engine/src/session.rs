use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use premia_core::{
    classify, Classification, InstallmentSelections, InsurerDirectory, ProductId, ProposalId,
    Quote, QuoteId, SessionError, SourceError, VerticalConfig,
};
use premia_source::QuoteSource;

use crate::display::{build_display_quotes, DisplayQuote};
use crate::events::SessionEvents;
use crate::scheduler::{PollDirective, PollingScheduler, SessionPhase, SettleOutcome};

/// One published observation of a running (or finished) aggregation session.
/// Consumers receive these through the watch channel handed out by
/// [`crate::AggregationEngine::subscribe`]; the latest snapshot always
/// supersedes earlier ones.
#[derive(Clone, Debug, Serialize)]
pub struct EngineSnapshot {
    pub proposal_id: ProposalId,
    pub results: Vec<DisplayQuote>,
    pub is_loading: bool,
    pub error: Option<SessionError>,
    pub progress: u8,
    pub phase: SessionPhase,
    pub settle_outcome: Option<SettleOutcome>,
    pub observed_at: DateTime<Utc>,
}

impl EngineSnapshot {
    pub(crate) fn initial(proposal_id: ProposalId) -> Self {
        Self {
            proposal_id,
            results: Vec::new(),
            is_loading: true,
            error: None,
            progress: 0,
            phase: SessionPhase::Initializing,
            settle_outcome: None,
            observed_at: Utc::now(),
        }
    }
}

/// State shared between the session task and the engine facade: the
/// installment selections, the session's insurer directory, and whatever the
/// last cycle classified, so a selection change can republish immediately
/// without waiting for the next poll.
pub(crate) struct SessionShared {
    pub(crate) selections: InstallmentSelections,
    pub(crate) directory: InsurerDirectory,
    pub(crate) displayable: Vec<Quote>,
    pub(crate) last_snapshot: EngineSnapshot,
}

impl SessionShared {
    pub(crate) fn new(proposal_id: ProposalId) -> Self {
        Self {
            selections: InstallmentSelections::new(),
            directory: InsurerDirectory::default(),
            displayable: Vec::new(),
            last_snapshot: EngineSnapshot::initial(proposal_id),
        }
    }
}

/// Mutex guard that survives a poisoned lock; the protected state is only
/// ever replaced wholesale, so observing a half-finished write is impossible.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a spawned session task owns. Built by the engine on
/// `subscribe`, torn down by aborting the task; a stale task that still gets
/// to run compares its `epoch` against `current_epoch` before publishing.
pub(crate) struct SessionRuntime {
    pub(crate) session_id: Uuid,
    pub(crate) proposal_id: ProposalId,
    pub(crate) epoch: u64,
    pub(crate) current_epoch: Arc<AtomicU64>,
    pub(crate) config: VerticalConfig,
    pub(crate) source: Arc<dyn QuoteSource>,
    pub(crate) events: Arc<dyn SessionEvents>,
    pub(crate) shared: Arc<Mutex<SessionShared>>,
    pub(crate) sender: Arc<watch::Sender<EngineSnapshot>>,
}

/// Drive one aggregation session from first fetch to a terminal phase.
pub(crate) async fn run(rt: SessionRuntime) {
    let session_id = rt.session_id.to_string();
    info!(
        event_name = "session.started",
        session_id = %session_id,
        proposal_id = %rt.proposal_id.0,
        poll_interval_secs = rt.config.poll_interval_secs,
        session_timeout_secs = rt.config.session_timeout_secs,
        "quote aggregation session started"
    );

    let mut scheduler = PollingScheduler::new(
        rt.config.session_timeout(),
        rt.config.fast_path_background(),
        Instant::now(),
    );

    // The directory is fetched exactly once; failing here is session-fatal,
    // auth or not, because nothing can render without it.
    match rt.source.fetch_insurer_directory().await {
        Ok(insurers) => {
            lock(&rt.shared).directory = InsurerDirectory::new(insurers);
        }
        Err(error) => {
            warn!(
                event_name = "session.directory_fetch_failed",
                session_id = %session_id,
                error = %error,
                "insurer directory fetch failed; session cannot start"
            );
            let session_error = SessionError::from(error);
            if session_error.requires_reauthentication() {
                rt.events.on_auth_error();
            }
            scheduler.fail();
            publish_terminal_error(&rt, &scheduler, session_error);
            return;
        }
    }
    scheduler.begin_polling();

    let allowed: BTreeSet<ProductId> = rt.config.allowed_product_ids.iter().cloned().collect();
    let mut known_quotes: Vec<Quote> = Vec::new();
    let mut transient_error: Option<SessionError> = None;

    loop {
        match rt.source.fetch_proposal_products(&rt.proposal_id).await {
            Ok(incoming) => {
                known_quotes = reconcile(&session_id, known_quotes, incoming);
                transient_error = None;
            }
            Err(SourceError::Unauthorized) => {
                warn!(
                    event_name = "session.auth_rejected",
                    session_id = %session_id,
                    proposal_id = %rt.proposal_id.0,
                    "credential rejected mid-session; stopping without retry"
                );
                rt.events.on_auth_error();
                scheduler.fail();
                publish_terminal_error(&rt, &scheduler, SessionError::Auth);
                return;
            }
            Err(SourceError::Unreachable(detail)) => {
                warn!(
                    event_name = "session.poll_failed",
                    session_id = %session_id,
                    error = %detail,
                    "poll cycle failed; retrying on the next interval"
                );
                transient_error = Some(SessionError::Network(detail));
            }
        }

        let classification = classify(&known_quotes, &allowed, rt.config.display_policy);
        let now = Instant::now();
        let directive = scheduler.observe(&classification, now);
        let progress = scheduler.progress(&classification, now);
        let outcome = match directive {
            PollDirective::Settle(outcome) => Some(outcome),
            PollDirective::Continue => None,
        };

        publish_cycle(&rt, &scheduler, &classification, progress, transient_error.clone(), outcome);

        match directive {
            PollDirective::Settle(outcome) => {
                info!(
                    event_name = settle_event(&classification, outcome),
                    session_id = %session_id,
                    proposal_id = %rt.proposal_id.0,
                    relevant = classification.relevant.len(),
                    displayable = classification.displayable.len(),
                    "quote aggregation session settled"
                );
                rt.events.on_settled(outcome);
                return;
            }
            PollDirective::Continue => {
                debug!(
                    event_name = "session.poll_cycle",
                    session_id = %session_id,
                    phase = ?scheduler.phase(),
                    relevant = classification.relevant.len(),
                    displayable = classification.displayable.len(),
                    progress = progress,
                    "poll cycle completed"
                );
                tokio::time::sleep(rt.config.poll_interval()).await;
            }
        }
    }
}

/// Apply one poll's records over what the session already knows. The backend
/// promises terminal states never revert; if a record regresses anyway, the
/// terminal record already shown to the user is kept.
fn reconcile(session_id: &str, previous: Vec<Quote>, incoming: Vec<Quote>) -> Vec<Quote> {
    let mut prior: HashMap<QuoteId, Quote> =
        previous.into_iter().map(|quote| (quote.id.clone(), quote)).collect();

    incoming
        .into_iter()
        .map(|quote| match prior.remove(&quote.id) {
            Some(known) if !known.state.may_become(quote.state) => {
                warn!(
                    event_name = "session.quote_state_regressed",
                    session_id = %session_id,
                    quote_id = %quote.id.0,
                    from = ?known.state,
                    to = ?quote.state,
                    "terminal quote state regressed upstream; keeping the terminal record"
                );
                known
            }
            _ => quote,
        })
        .collect()
}

fn settle_event(classification: &Classification, outcome: SettleOutcome) -> &'static str {
    match outcome {
        SettleOutcome::HasResults => "session.settled",
        SettleOutcome::NoResults if classification.all_relevant_failed() => {
            "session.settled_all_failed"
        }
        SettleOutcome::NoResults if classification.relevant.is_empty() => "session.settled_empty",
        SettleOutcome::NoResults => "session.settled_no_results",
    }
}

fn publish_cycle(
    rt: &SessionRuntime,
    scheduler: &PollingScheduler,
    classification: &Classification,
    progress: u8,
    transient_error: Option<SessionError>,
    outcome: Option<SettleOutcome>,
) {
    let snapshot = {
        let mut shared = lock(&rt.shared);
        shared.displayable = classification.displayable.clone();
        let results = build_display_quotes(
            &shared.displayable,
            &shared.directory,
            &rt.config.coverage_fields,
            &shared.selections,
        );
        let snapshot = EngineSnapshot {
            proposal_id: rt.proposal_id.clone(),
            results,
            is_loading: scheduler.is_loading(),
            error: if outcome.is_some() { None } else { transient_error },
            progress,
            phase: scheduler.phase(),
            settle_outcome: outcome,
            observed_at: Utc::now(),
        };
        shared.last_snapshot = snapshot.clone();
        snapshot
    };
    send_if_current(rt, snapshot);
}

fn publish_terminal_error(rt: &SessionRuntime, scheduler: &PollingScheduler, error: SessionError) {
    let snapshot = {
        let mut shared = lock(&rt.shared);
        let mut snapshot = shared.last_snapshot.clone();
        snapshot.is_loading = false;
        snapshot.phase = scheduler.phase();
        snapshot.error = Some(error);
        snapshot.observed_at = Utc::now();
        shared.last_snapshot = snapshot.clone();
        snapshot
    };
    send_if_current(rt, snapshot);
}

/// Last line of defence against a superseded session racing its teardown:
/// only the session whose epoch is still current may publish.
fn send_if_current(rt: &SessionRuntime, snapshot: EngineSnapshot) {
    if rt.current_epoch.load(Ordering::SeqCst) != rt.epoch {
        debug!(
            event_name = "session.stale_publish_discarded",
            session_id = %rt.session_id,
            "snapshot from a superseded session discarded"
        );
        return;
    }
    let _ = rt.sender.send(snapshot);
}

#[cfg(test)]
mod tests {
    use super::reconcile;
    use premia_core::domain::coverage::CoverageSnapshots;
    use premia_core::{InsurerId, ProductId, Quote, QuoteId, QuoteState};

    fn quote(id: &str, state: QuoteState) -> Quote {
        Quote {
            id: QuoteId(id.to_owned()),
            insurer_id: InsurerId(format!("ins-{id}")),
            product_id: ProductId("mtpl".to_owned()),
            state,
            premiums: Vec::new(),
            coverage: CoverageSnapshots::default(),
            error_message: None,
            policy_id: None,
        }
    }

    #[test]
    fn forward_transitions_adopt_the_incoming_record() {
        let merged = reconcile(
            "s-1",
            vec![quote("q1", QuoteState::Waiting)],
            vec![quote("q1", QuoteState::Active)],
        );
        assert_eq!(merged[0].state, QuoteState::Active);
    }

    #[test]
    fn terminal_states_survive_an_upstream_regression() {
        let merged = reconcile(
            "s-1",
            vec![quote("q1", QuoteState::Active)],
            vec![quote("q1", QuoteState::Waiting)],
        );
        assert_eq!(merged[0].state, QuoteState::Active);

        let merged = reconcile(
            "s-1",
            vec![quote("q1", QuoteState::Failed)],
            vec![quote("q1", QuoteState::Active)],
        );
        assert_eq!(merged[0].state, QuoteState::Failed);
    }

    #[test]
    fn new_quotes_flow_through_untouched() {
        let merged = reconcile(
            "s-1",
            vec![quote("q1", QuoteState::Waiting)],
            vec![quote("q1", QuoteState::Waiting), quote("q2", QuoteState::Active)],
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].id, QuoteId("q2".to_owned()));
    }
}
