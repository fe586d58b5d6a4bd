//! Campaign delivery engine.
//!
//! ## Flow
//!
//! ```text
//! payload + recipients → plan_batches → Dispatcher (per batch, bounded)
//!                      → classify (per failed attempt) → Tally → CampaignReport
//!                      → CampaignStateStore (pending failures for retry)
//! ```

pub mod batcher;
pub mod classifier;
pub mod dispatcher;
pub mod engine;
pub mod stats;
pub mod types;

pub use batcher::{plan_batches, Batch};
pub use classifier::{classify, Decision};
pub use dispatcher::Dispatcher;
pub use engine::{BroadcastEngine, DispatchSettings, RunState};
pub use stats::Tally;
pub use types::{
    ActionButton, ButtonRows, CampaignReport, CampaignState, DispatchOutcome, InitiatorId, Media,
    Payload, PayloadKind, RecipientId, SkipReason,
};
