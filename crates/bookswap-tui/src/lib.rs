//! Terminal UI for Bookswap chat
//!
//! A thin shell over [`bookswap_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`bookswap_app::Runtime`].
//!
//! This crate only handles terminal rendering and the relay socket.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod terminal;
pub mod ui;

pub use bookswap_app::{App, AppAction, AppEvent, Bridge, Driver, KeyInput, Runtime};
pub use terminal::{TerminalDriver, TerminalError};
