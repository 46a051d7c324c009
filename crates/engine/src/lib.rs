pub mod display;
pub mod engine;
pub mod events;
pub mod scheduler;
pub mod session;

pub use display::{build_display_quotes, DisplayQuote};
pub use engine::AggregationEngine;
pub use events::{NoopEvents, RecordingEvents, SessionEvents};
pub use scheduler::{PollDirective, PollingScheduler, SessionPhase, SettleOutcome};
pub use session::EngineSnapshot;
