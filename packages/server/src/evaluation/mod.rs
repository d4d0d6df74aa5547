//! Evaluation records and what happens when they are saved.

pub mod queue;
pub mod ranking;
pub mod service;
pub mod signals;

pub use queue::{DisabledQueue, MqTaskQueue, QueueError, TaskQueue};
pub use service::{EvaluationService, SaveOutcome};
pub use signals::SignalDispatcher;
