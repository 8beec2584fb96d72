//! Run orchestration for the ADE engine.
//!
//! [`run`] turns a [`RunRequest`](ade_model::RunRequest) into a
//! [`RunResult`](ade_model::RunResult): it builds the registry, reads the
//! input, drives the run through its phases and fires lifecycle hooks along
//! the way.

pub mod engine;
pub mod events;
pub mod hooks;
pub mod phase;

pub use engine::{ENGINE_VERSION, run, run_with_package};
pub use events::{EventLog, RunEvent, read_events};
pub use hooks::{HookDispatcher, HookView, Replaced};
pub use phase::{RunMachine, RunPhase};
