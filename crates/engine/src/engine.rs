use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use premia_core::{ProposalId, QuoteId, VerticalConfig};
use premia_source::QuoteSource;

use crate::display::build_display_quotes;
use crate::events::SessionEvents;
use crate::session::{self, lock, EngineSnapshot, SessionRuntime, SessionShared};

/// Composition root of the polling engine.
///
/// One engine instance serves one consumer surface (a result-list screen).
/// `subscribe` starts a session for a proposal and hands back a watch
/// receiver of [`EngineSnapshot`]s; subscribing again, with any proposal id,
/// first tears the previous session down so no two sessions ever poll
/// concurrently for the same consumer. Dropping the engine cancels whatever
/// is still running.
///
/// All collaborators are explicit constructor inputs; the engine reads no
/// ambient state.
pub struct AggregationEngine {
    source: Arc<dyn QuoteSource>,
    events: Arc<dyn SessionEvents>,
    config: VerticalConfig,
    epoch: Arc<AtomicU64>,
    active: Mutex<Option<ActiveSession>>,
}

struct ActiveSession {
    session_id: Uuid,
    proposal_id: ProposalId,
    epoch: u64,
    handle: JoinHandle<()>,
    shared: Arc<Mutex<SessionShared>>,
    sender: Arc<watch::Sender<EngineSnapshot>>,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl AggregationEngine {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        config: VerticalConfig,
        events: Arc<dyn SessionEvents>,
    ) -> Self {
        Self {
            source,
            events,
            config,
            epoch: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    /// Start polling a proposal. Must be called from within a tokio runtime;
    /// the session is driven by a spawned task, not by the returned receiver.
    pub fn subscribe(&self, proposal_id: ProposalId) -> watch::Receiver<EngineSnapshot> {
        let mut active = lock(&self.active);

        // Invalidate the previous epoch before aborting so a mid-publish
        // task loses the race even on another worker thread.
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = active.take() {
            previous.handle.abort();
            info!(
                event_name = "engine.session_superseded",
                session_id = %previous.session_id,
                proposal_id = %previous.proposal_id.0,
                "previous aggregation session torn down"
            );
        }

        let session_id = Uuid::new_v4();
        let (sender, receiver) = watch::channel(EngineSnapshot::initial(proposal_id.clone()));
        let sender = Arc::new(sender);
        let shared = Arc::new(Mutex::new(SessionShared::new(proposal_id.clone())));

        let runtime = SessionRuntime {
            session_id,
            proposal_id: proposal_id.clone(),
            epoch,
            current_epoch: Arc::clone(&self.epoch),
            config: self.config.clone(),
            source: Arc::clone(&self.source),
            events: Arc::clone(&self.events),
            shared: Arc::clone(&shared),
            sender: Arc::clone(&sender),
        };
        let handle = tokio::spawn(session::run(runtime));

        *active = Some(ActiveSession { session_id, proposal_id, epoch, handle, shared, sender });
        receiver
    }

    /// Record the consumer's installment choice for a quote and republish the
    /// result list immediately. The choice is session-scoped and keeps
    /// winning over the default first-installment selection on every later
    /// poll, regardless of poll timing.
    pub fn select_installment(&self, quote_id: &QuoteId, installment_count: u32) {
        let active = lock(&self.active);
        let Some(session) = active.as_ref() else {
            debug!(
                event_name = "engine.selection_without_session",
                quote_id = %quote_id.0,
                "installment selected with no active session; ignoring"
            );
            return;
        };

        let snapshot = {
            let mut shared = lock(&session.shared);
            shared.selections.select(quote_id.clone(), installment_count);
            let results = build_display_quotes(
                &shared.displayable,
                &shared.directory,
                &self.config.coverage_fields,
                &shared.selections,
            );
            let mut snapshot = shared.last_snapshot.clone();
            snapshot.results = results;
            snapshot.observed_at = Utc::now();
            shared.last_snapshot = snapshot.clone();
            snapshot
        };

        debug!(
            event_name = "engine.installment_selected",
            session_id = %session.session_id,
            quote_id = %quote_id.0,
            installment_count = installment_count,
            "installment selection applied"
        );

        if self.epoch.load(Ordering::SeqCst) == session.epoch {
            let _ = session.sender.send(snapshot);
        }
    }

    /// Tear down the running session, if any, cancelling its timers. Safe to
    /// call repeatedly; dropping the engine does the same.
    pub fn dispose(&self) {
        let mut active = lock(&self.active);
        if let Some(previous) = active.take() {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            previous.handle.abort();
            info!(
                event_name = "engine.session_disposed",
                session_id = %previous.session_id,
                proposal_id = %previous.proposal_id.0,
                "aggregation session disposed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::AggregationEngine;
    use crate::events::NoopEvents;
    use premia_core::{
        Insurer, ProductVertical, ProposalId, Quote, QuoteId, SourceError, VerticalConfig,
    };
    use premia_source::QuoteSource;

    struct EmptySource;

    #[async_trait]
    impl QuoteSource for EmptySource {
        async fn fetch_proposal_products(
            &self,
            _proposal: &ProposalId,
        ) -> Result<Vec<Quote>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_insurer_directory(&self) -> Result<Vec<Insurer>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn engine() -> AggregationEngine {
        AggregationEngine::new(
            Arc::new(EmptySource),
            VerticalConfig::defaults_for(ProductVertical::MotorLiability),
            Arc::new(NoopEvents),
        )
    }

    #[test]
    fn selecting_without_a_session_is_a_no_op() {
        let engine = engine();
        engine.select_installment(&QuoteId("q1".to_owned()), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_is_idempotent() {
        let engine = engine();
        let _rx = engine.subscribe(ProposalId("p-1".to_owned()));
        engine.dispose();
        engine.dispose();
    }
}
