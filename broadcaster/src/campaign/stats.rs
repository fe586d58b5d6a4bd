//! Outcome tally for one run.

use chrono::Utc;

use crate::campaign::{CampaignReport, DispatchOutcome, RecipientId, SkipReason};

/// Running count of outcomes, fed batch by batch.
#[derive(Debug, Default)]
pub struct Tally {
    total: usize,
    succeeded: usize,
    skipped_blocked: usize,
    skipped_unreachable: usize,
    failed: Vec<RecipientId>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, recipient: RecipientId, outcome: DispatchOutcome) {
        self.total += 1;
        match outcome {
            DispatchOutcome::Success => self.succeeded += 1,
            DispatchOutcome::Skipped(SkipReason::Blocked) => self.skipped_blocked += 1,
            DispatchOutcome::Skipped(SkipReason::Unreachable) => self.skipped_unreachable += 1,
            DispatchOutcome::Failed => self.failed.push(recipient),
        }
    }

    pub fn record_all<I>(&mut self, outcomes: I)
    where
        I: IntoIterator<Item = (RecipientId, DispatchOutcome)>,
    {
        for (recipient, outcome) in outcomes {
            self.record(recipient, outcome);
        }
    }

    pub fn recorded(&self) -> usize {
        self.total
    }

    pub fn into_report(self) -> CampaignReport {
        CampaignReport {
            total_recipients: self.total,
            succeeded: self.succeeded,
            skipped_blocked: self.skipped_blocked,
            skipped_unreachable: self.skipped_unreachable,
            failed: self.failed,
            generated_at: Utc::now(),
        }
    }
}
