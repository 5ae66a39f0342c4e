//! # oxo-types
//!
//! Wire format types for the oxo remote game record protocol.
//!
//! This crate provides the foundational types used across all oxo crates:
//! - [`PlayerId`], [`RecordHandle`], [`ProgramId`], [`SubscriptionId`] - Identity types
//! - [`GameRecord`], [`Phase`], [`Cell`], [`Board`] - The remote record and its codec
//! - [`Command`] - Outbound commands (InitGame, Join, KeepAlive, Move)
//! - [`ProtocolError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod error;
mod frame;
mod ids;
mod record;

pub use command::Command;
pub use error::ProtocolError;
pub use ids::{PlayerId, ProgramId, RecordHandle, SubscriptionId};
pub use record::{Board, Cell, GameRecord, Phase, BOARD_CELLS};
