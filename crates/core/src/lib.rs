//! Decision layer for validating fishing-vessel export declarations against
//! landing records.
//!
//! Everything here is synchronous, side-effect-free logic over in-memory
//! snapshots; the only I/O seams are the [`reference::ReferenceDataLoader`]
//! and [`eod::EodRepository`] traits implemented by collaborator crates.
//! This crate has zero internal deps so it can be used by the API layer,
//! the refresh worker, and any future CLI tooling alike.

pub mod eod;
pub mod error;
pub mod reconciliation;
pub mod reference;
pub mod risk;
pub mod types;
pub mod vessel;

pub use error::CoreError;
