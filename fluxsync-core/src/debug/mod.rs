//! Inspection utilities
//!
//! - **Action logging**: glob-filtered tracing output and an in-memory ring
//!   buffer of recent actions with their delivery counts

pub mod action_logger;

pub use action_logger::{
    glob_match, ActionLog, ActionLogConfig, ActionLogEntry, ActionLoggerConfig,
    ActionLoggerMiddleware,
};
