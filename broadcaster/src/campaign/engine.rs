//! Campaign orchestration.
//!
//! A run walks the batches sequentially; only the sends inside one batch run
//! concurrently. Per initiator the run moves through:
//!
//! ```text
//! Idle → Dispatching → Reporting → Idle                    (no failures)
//!                                → AwaitingRetryDecision   (failures persisted)
//! AwaitingRetryDecision --retry--> Dispatching
//! AwaitingRetryDecision --cancel-> Idle
//! ```
//!
//! `Dispatching` and `Reporting` live in memory for the duration of a run.
//! `AwaitingRetryDecision` is derived from the campaign state store, so a
//! pending retry survives a restart.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::campaign::batcher::plan_batches;
use crate::campaign::dispatcher::Dispatcher;
use crate::campaign::stats::Tally;
use crate::campaign::{
    ButtonRows, CampaignReport, CampaignState, DispatchOutcome, InitiatorId, Payload,
    RecipientId, SkipReason,
};
use crate::error::CampaignError;
use crate::store::{CampaignStateStore, RecipientStore};
use crate::transport::Transport;

/// Where an initiator's campaign currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Dispatching,
    Reporting,
    AwaitingRetryDecision,
}

/// Tuning knobs for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Maximum sends in flight at once
    pub concurrency_limit: usize,
    /// Recipients per batch
    pub batch_size: usize,
    /// Pause after each dispatched batch
    pub batch_pause: Duration,
    /// Attempts per recipient before a retryable failure becomes terminal
    pub max_attempts: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            concurrency_limit: 25,
            batch_size: 200,
            batch_pause: Duration::from_millis(250),
            max_attempts: 3,
        }
    }
}

type ActiveRuns = Mutex<HashMap<InitiatorId, RunState>>;

fn lock_runs(runs: &ActiveRuns) -> MutexGuard<'_, HashMap<InitiatorId, RunState>> {
    runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Marks an initiator's run active; the mark is removed when dropped.
struct ActiveRun<'a> {
    runs: &'a ActiveRuns,
    initiator: InitiatorId,
}

impl<'a> ActiveRun<'a> {
    fn begin(runs: &'a ActiveRuns, initiator: InitiatorId) -> Result<Self, CampaignError> {
        let mut active = lock_runs(runs);
        if active.contains_key(&initiator) {
            return Err(CampaignError::CampaignInProgress(initiator));
        }
        active.insert(initiator, RunState::Dispatching);
        Ok(Self { runs, initiator })
    }

    fn advance(&self, state: RunState) {
        lock_runs(self.runs).insert(self.initiator, state);
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        lock_runs(self.runs).remove(&self.initiator);
    }
}

/// Bulk broadcast engine: runs campaigns, retries their failures, cancels them.
pub struct BroadcastEngine {
    recipients: Arc<dyn RecipientStore>,
    states: Arc<dyn CampaignStateStore>,
    dispatcher: Dispatcher,
    settings: DispatchSettings,
    active: ActiveRuns,
}

impl BroadcastEngine {
    pub fn new(
        transport: Arc<dyn Transport>,
        recipients: Arc<dyn RecipientStore>,
        states: Arc<dyn CampaignStateStore>,
        settings: DispatchSettings,
    ) -> Self {
        let dispatcher =
            Dispatcher::new(transport, settings.concurrency_limit, settings.max_attempts);
        Self {
            recipients,
            states,
            dispatcher,
            settings,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Send `payload` to every recipient in the recipient store.
    pub async fn broadcast(
        &self,
        initiator: InitiatorId,
        payload: Payload,
        buttons: ButtonRows,
    ) -> Result<CampaignReport, CampaignError> {
        let run = ActiveRun::begin(&self.active, initiator)?;
        let recipients = self.recipients.list().await?;
        let report = self.dispatch(&run, payload, &recipients, buttons).await?;
        audit(initiator, "campaign_sent", &report);
        Ok(report)
    }

    /// Send `payload` to an explicit recipient sequence.
    pub async fn run_campaign(
        &self,
        initiator: InitiatorId,
        payload: Payload,
        recipients: Vec<RecipientId>,
        buttons: ButtonRows,
    ) -> Result<CampaignReport, CampaignError> {
        let run = ActiveRun::begin(&self.active, initiator)?;
        let report = self.dispatch(&run, payload, &recipients, buttons).await?;
        audit(initiator, "campaign_sent", &report);
        Ok(report)
    }

    /// Re-send the stored payload to the initiator's pending failures only.
    pub async fn retry_campaign(
        &self,
        initiator: InitiatorId,
    ) -> Result<CampaignReport, CampaignError> {
        let run = ActiveRun::begin(&self.active, initiator)?;
        let state = match self.states.load(initiator).await? {
            Some(state) if !state.failed.is_empty() => state,
            _ => return Err(CampaignError::NoPendingFailures(initiator)),
        };

        info!(
            initiator = initiator,
            pending = state.failed.len(),
            saved_at = %state.timestamp,
            "campaign_retry_started"
        );

        let report = self
            .dispatch(&run, state.payload, &state.failed, state.buttons)
            .await?;
        audit(initiator, "campaign_retried", &report);
        Ok(report)
    }

    /// Drop the initiator's pending failures. Refused while a run is active.
    pub async fn cancel_campaign(&self, initiator: InitiatorId) -> Result<(), CampaignError> {
        let _run = ActiveRun::begin(&self.active, initiator)?;
        self.states.clear(initiator).await?;
        info!(
            initiator = initiator,
            action = "campaign_cancelled",
            "operator_action"
        );
        Ok(())
    }

    /// Pending failures awaiting a retry decision, if any.
    pub async fn pending_campaign(
        &self,
        initiator: InitiatorId,
    ) -> Result<Option<CampaignState>, CampaignError> {
        Ok(self.states.load(initiator).await?)
    }

    pub async fn run_state(&self, initiator: InitiatorId) -> RunState {
        let active = lock_runs(&self.active).get(&initiator).copied();
        if let Some(state) = active {
            return state;
        }
        match self.states.load(initiator).await {
            Ok(Some(_)) => RunState::AwaitingRetryDecision,
            Ok(None) => RunState::Idle,
            Err(e) => {
                warn!(initiator = initiator, error = %e, "run_state_lookup_failed");
                RunState::Idle
            }
        }
    }

    async fn dispatch(
        &self,
        run: &ActiveRun<'_>,
        payload: Payload,
        recipients: &[RecipientId],
        buttons: ButtonRows,
    ) -> Result<CampaignReport, CampaignError> {
        let initiator = run.initiator;
        let blocked: HashSet<RecipientId> = self.recipients.blocked_set().await?;
        let batches = plan_batches(recipients, &blocked, self.settings.batch_size);

        info!(
            initiator = initiator,
            payload_type = payload.kind().as_str(),
            total_recipients = recipients.len(),
            batches = batches.len(),
            blocked_known = blocked.len(),
            "campaign_started"
        );

        let mut tally = Tally::new();
        for batch in &batches {
            tally.record_all(
                batch
                    .blocked
                    .iter()
                    .map(|&id| (id, DispatchOutcome::Skipped(SkipReason::Blocked))),
            );
            if batch.is_idle() {
                debug!(initiator = initiator, batch = batch.index, "batch_fully_blocked");
                continue;
            }

            let outcomes = self
                .dispatcher
                .dispatch_batch(&batch.targets, &payload, &buttons)
                .await;
            let succeeded = outcomes
                .iter()
                .filter(|(_, outcome)| *outcome == DispatchOutcome::Success)
                .count();
            tally.record_all(outcomes);

            info!(
                initiator = initiator,
                batch = batch.index,
                targets = batch.targets.len(),
                blocked = batch.blocked.len(),
                succeeded = succeeded,
                "batch_dispatched"
            );

            if !self.settings.batch_pause.is_zero() {
                sleep(self.settings.batch_pause).await;
            }
        }

        run.advance(RunState::Reporting);
        let report = tally.into_report();
        self.persist(initiator, payload, &report, buttons).await;

        info!(
            initiator = initiator,
            total_recipients = report.total_recipients,
            succeeded = report.succeeded,
            skipped_blocked = report.skipped_blocked,
            skipped_unreachable = report.skipped_unreachable,
            failed = report.failed_count(),
            "campaign_completed"
        );
        Ok(report)
    }

    /// Keep failures for a later retry, or forget the campaign when none remain.
    async fn persist(
        &self,
        initiator: InitiatorId,
        payload: Payload,
        report: &CampaignReport,
        buttons: ButtonRows,
    ) {
        let result = if report.has_failures() {
            let state = CampaignState::new(initiator, payload, report.failed.clone(), buttons);
            self.states.save(state).await
        } else {
            self.states.clear(initiator).await
        };

        if let Err(e) = result {
            error!(
                initiator = initiator,
                failed = report.failed_count(),
                error = %e,
                "campaign_state_persist_failed"
            );
        }
    }
}

fn audit(initiator: InitiatorId, action: &'static str, report: &CampaignReport) {
    info!(
        initiator = initiator,
        action = action,
        sent = report.succeeded,
        not_sent = report.not_sent(),
        "operator_action"
    );
}
