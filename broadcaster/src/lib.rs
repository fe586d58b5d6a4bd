//! Broadcaster - resumable bulk broadcast delivery engine.
//!
//! Fans a single payload out to a large recipient set through a rate-limited
//! messaging channel, tolerating partial failure and keeping the recipients
//! that did not succeed for an operator-triggered retry.
//!
//! ## Architecture
//!
//! ```text
//! Control API → BroadcastEngine → Batcher → Dispatcher → Transport (Telegram)
//!                     ↑                         ↓
//!              RecipientStore            Classifier → Tally → CampaignStateStore
//! ```

pub mod campaign;
pub mod config;
pub mod error;
pub mod store;
pub mod transport;
pub mod web;

// Re-export commonly used types
pub use campaign::{
    ActionButton, BroadcastEngine, CampaignReport, CampaignState, DispatchSettings, Payload,
    RunState,
};
pub use config::Config;
pub use error::{CampaignError, StoreError};
pub use store::{CampaignStateStore, FileStateStore, JsonRecipientStore, MemoryStore, RecipientStore};
pub use transport::{TelegramTransport, Transport, TransportError};
pub use web::AppState;
