//! Interactive terminal client for a brokerage trading API.
//!
//! Input flows through [`app::reducer::Dispatcher`], which owns the six
//! views and turns key presses and finished requests into
//! [`app::commands::Command`]s for the orchestrator to run.

pub mod app;
pub mod keys;
pub mod logging;
pub mod persist;
pub mod selector;
pub mod settings;
pub mod views;
