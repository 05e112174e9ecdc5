//! Application layer for Bookswap chat
//!
//! Pure state machines and generic runtime for UI and relay orchestration,
//! enabling deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (focus, input editing, commands) owning the
//!   conversation [`Coordinator`](bookswap_client::Coordinator)
//! - [`Bridge`]: Transport binding (encodes outbound events, decodes inbound)
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod command;
mod driver;
mod event;
mod input;
mod runtime;
mod state;

pub use action::AppAction;
pub use app::App;
pub use bridge::Bridge;
pub use command::{Command, CommandError};
pub use driver::Driver;
pub use event::AppEvent;
pub use input::KeyInput;
pub use runtime::Runtime;
pub use state::{ConnectionState, Focus, ImageViewer};
