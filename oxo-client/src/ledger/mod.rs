//! The remote ledger collaborator.
//!
//! Everything the session needs from the underlying ledger - record
//! allocation, signed command submission, snapshot fetch and change
//! notifications - sits behind the [`Ledger`] trait. The protocol logic is
//! driven against the in-memory [`MockLedger`] in tests and demos; a real
//! backend implements the same five operations.

mod mock;

pub use mock::MockLedger;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use oxo_types::{PlayerId, ProgramId, RecordHandle, SubscriptionId};

/// Ledger errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Record allocation failed.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// The remote authority refused a command.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// Transient transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// No record exists at the given handle.
    #[error("unknown record: {0}")]
    UnknownRecord(String),

    /// No live subscription with the given id.
    #[error("unknown subscription: {0}")]
    UnknownSubscription(String),
}

/// Callback invoked with the raw record payload after every committed change.
pub type SnapshotCallback = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// Interface to the remote ledger holding game records.
///
/// Implementations handle transport, signing and confirmation; the session
/// only sees these operations. All of them suspend until the remote side
/// answers - there is no timeout at this layer.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Allocate a fresh record of `size` bytes owned by the `owner` program,
    /// paid for by `payer`.
    async fn allocate_record(
        &self,
        payer: &PlayerId,
        owner: &ProgramId,
        size: usize,
    ) -> Result<RecordHandle, LedgerError>;

    /// Submit a signed command against `targets` to `program`.
    ///
    /// With `confirm` set the call resolves only once the ledger has
    /// committed the command; a refusal by the authority surfaces as
    /// [`LedgerError::CommandRejected`].
    async fn submit_command(
        &self,
        signer: &PlayerId,
        targets: &[RecordHandle],
        program: &ProgramId,
        payload: &[u8],
        confirm: bool,
    ) -> Result<(), LedgerError>;

    /// Fetch the current raw payload of a record.
    async fn fetch_snapshot(&self, handle: &RecordHandle) -> Result<Vec<u8>, LedgerError>;

    /// Subscribe to change notifications for a record.
    ///
    /// The callback receives the raw payload after every committed change.
    async fn subscribe(
        &self,
        handle: &RecordHandle,
        callback: SnapshotCallback,
    ) -> Result<SubscriptionId, LedgerError>;

    /// Release a subscription. Releasing an unknown id is an error.
    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), LedgerError>;
}
