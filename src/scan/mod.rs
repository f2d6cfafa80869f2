pub mod context;
pub mod cooldown;
pub mod orchestrator;
pub mod progress;
pub mod queue;
pub mod render;
pub mod worker;

pub use context::ScanContext;
pub use orchestrator::{Admission, DispatchError, ScanOrchestrator, SchedulerSnapshot};
pub use worker::ScanWorker;
