//! # blippy-runtime
//!
//! The agentic loop subsystem: the pub/sub broker with busy-flag turn
//! exclusivity, the streaming agent loop, the autonomous runner with its
//! recursion bound, the trigger scheduler, and the store adapters that bind
//! the tool seams to persistence.

#![deny(unsafe_code)]

pub mod adapters;
pub mod broker;
pub mod errors;
pub mod history;
pub mod runner;
pub mod scheduler;
pub mod turn;

pub use adapters::{
    RunnerHandle, StoreAgentFiles, StoreChannelLister, StoreRootLister, StoreTriggerCreator,
};
pub use broker::{Broker, Subscription, MAILBOX_CAPACITY};
pub use errors::{Result, RuntimeError};
pub use history::build_history_inputs;
pub use runner::{RunOptions, RunOutcome, Runner, AUTONOMOUS_INSTRUCTIONS};
pub use scheduler::{next_cron_occurrence, Scheduler};
pub use turn::{AgentLoop, TurnOptions};
