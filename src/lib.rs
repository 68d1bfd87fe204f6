//! atalho - in-surface text-expansion engine
//!
//! This library implements the runtime "shortcuts" engine for a productivity
//! shell that embeds third-party single-page sites in sandboxed document
//! views. One [`engine::Engine`] instance runs per embedded surface and owns
//! the activation state machine, suggestion ranking and keyword substitution.
//! Expansions either splice the surface text directly or emit an
//! [`bridge::Signal::InsertionRequest`] across the sandbox boundary, where
//! the privileged [`executor::ActionExecutor`] performs the clipboard-mediated
//! multi-message sequence.

pub mod bridge;
pub mod clipboard;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod executor;
pub mod keywords;
pub mod locator;
pub mod logging;
pub mod session;
pub mod splice;
pub mod suggest;
pub mod surface;
pub mod toast;
pub mod utils;
