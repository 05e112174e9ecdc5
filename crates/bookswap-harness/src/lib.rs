//! Deterministic simulation harness for Bookswap chat testing.
//!
//! In-memory implementations of the relay and the [`bookswap_app::Driver`]
//! trait for deterministic, reproducible testing of the full client stack.
//!
//! # Relay Model
//!
//! [`SimRelay`] is a reference implementation of the relay's socket
//! contract: presence, directory, threads, and message create/edit/delete
//! fan-out to both participants. Thread replies can be held and released out
//! of order, and failures injected per intent.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! App/Coordinator invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_driver;
pub mod sim_relay;

pub use invariants::{
    ClientSnapshot, CursorsInBounds, EditTargetOwned, Invariant, InvariantRegistry,
    InvariantResult, MessageSnapshot, StagedImagesBounded, SystemSnapshot, ThreadMatchesSelection,
    UniqueMessageIds, Violation,
};
pub use sim_driver::{SimDriver, SimDriverError, SimStep};
pub use sim_relay::{ConnectionId, SharedSimRelay, SimRelay, create_shared_relay};
