//! # oxo-client
//!
//! Client session controller for the oxo remote game record protocol.
//!
//! This is the library applications use to play against a remote game
//! record. A [`Session`] mirrors the authoritative state, submits commands
//! through the pluggable [`Ledger`] collaborator, runs the keep-alive loop
//! and notifies listeners on every change.
//!
//! ## Features
//!
//! - **Ledger Abstraction**: Pluggable remote backend ([`Ledger`], with an
//!   in-memory [`MockLedger`] that executes the game itself)
//! - **Pure View Derivation**: Uses oxo-core for side-effect-free logic
//! - **Keep-Alive Loop**: A cancellable periodic task bound to the session
//! - **Change Events**: Synchronous listener callbacks on every update
//!
//! ## Example
//!
//! ```ignore
//! use oxo_client::{MockLedger, Session, SessionConfig};
//!
//! let ledger = Arc::new(MockLedger::new());
//! let config = SessionConfig::new(program_id);
//! let session = Session::create(ledger, config, identity).await?;
//!
//! session.on_change(|view| println!("{:?}", view.phase));
//! session.make_move(0, 0).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod events;
pub mod ledger;
pub mod session;

pub use config::{SessionConfig, DEFAULT_KEEP_ALIVE_PERIOD, RECORD_SPACE};
pub use events::{ChangeListener, ListenerId};
pub use ledger::{Ledger, LedgerError, MockLedger, SnapshotCallback};
pub use session::{Session, SessionError};
