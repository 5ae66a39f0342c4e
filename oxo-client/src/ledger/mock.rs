//! In-memory ledger with a working game authority, for tests and demos.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use oxo_types::{
    Board, Cell, Command, GameRecord, Phase, PlayerId, ProgramId, RecordHandle, SubscriptionId,
};

use super::{Ledger, LedgerError, SnapshotCallback};

/// In-memory [`Ledger`] that executes game commands itself.
///
/// The mock is a stand-in for the whole remote side: it validates and
/// applies `InitGame`/`Join`/`KeepAlive`/`Move` the way the deployed program
/// would, re-encodes the record into its fixed-size buffer and notifies
/// subscribers synchronously. Clones share state, so a test can hold one
/// handle for inspection while sessions drive another.
#[derive(Clone, Default)]
pub struct MockLedger {
    inner: Arc<Mutex<MockLedgerInner>>,
}

#[derive(Default)]
struct MockLedgerInner {
    records: HashMap<RecordHandle, RecordSlot>,
    subscriptions: HashMap<SubscriptionId, (RecordHandle, SnapshotCallback)>,
    submitted: Vec<Command>,
    fail_next_allocate: Option<String>,
    fail_next_submit: Option<String>,
    fail_next_fetch: Option<String>,
}

struct RecordSlot {
    space: usize,
    payload: Vec<u8>,
    state: Option<GameRecord>,
}

impl MockLedger {
    /// Create a new empty mock ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands accepted or refused so far, in submission order.
    pub fn submitted_commands(&self) -> Vec<Command> {
        let inner = self.inner.lock().unwrap();
        inner.submitted.clone()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.subscriptions.len()
    }

    /// Decoded state of a record, if it has been initialized.
    pub fn record_state(&self, handle: &RecordHandle) -> Option<GameRecord> {
        let inner = self.inner.lock().unwrap();
        inner.records.get(handle).and_then(|slot| slot.state.clone())
    }

    /// Cause the next `allocate_record` to fail with the given error.
    pub fn fail_next_allocate(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_allocate = Some(error.to_string());
    }

    /// Cause the next `submit_command` to fail with a network error.
    pub fn fail_next_submit(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_submit = Some(error.to_string());
    }

    /// Cause the next `fetch_snapshot` to fail with a network error.
    pub fn fail_next_fetch(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_fetch = Some(error.to_string());
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn allocate_record(
        &self,
        _payer: &PlayerId,
        _owner: &ProgramId,
        size: usize,
    ) -> Result<RecordHandle, LedgerError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_allocate.take() {
            return Err(LedgerError::Allocation(error));
        }

        let handle = RecordHandle::random();
        inner.records.insert(
            handle,
            RecordSlot {
                space: size,
                payload: vec![0; size],
                state: None,
            },
        );
        Ok(handle)
    }

    async fn submit_command(
        &self,
        signer: &PlayerId,
        targets: &[RecordHandle],
        _program: &ProgramId,
        payload: &[u8],
        _confirm: bool,
    ) -> Result<(), LedgerError> {
        let command = Command::from_payload(payload)
            .map_err(|e| LedgerError::CommandRejected(format!("undecodable command: {e}")))?;

        // Apply under the lock, notify outside it: a callback may re-enter
        // the ledger through session code.
        let notifications = {
            let mut inner = self.inner.lock().unwrap();

            if let Some(error) = inner.fail_next_submit.take() {
                return Err(LedgerError::Network(error));
            }

            inner.submitted.push(command);

            let handle = *targets
                .first()
                .ok_or_else(|| LedgerError::CommandRejected("no target record".into()))?;
            let slot = inner
                .records
                .get_mut(&handle)
                .ok_or_else(|| LedgerError::UnknownRecord(handle.to_string()))?;

            apply(slot, signer, command)?;

            let payload = slot.payload.clone();
            inner
                .subscriptions
                .values()
                .filter(|(target, _)| *target == handle)
                .map(|(_, callback)| (Arc::clone(callback), payload.clone()))
                .collect::<Vec<_>>()
        };

        for (callback, payload) in notifications {
            callback(payload);
        }
        Ok(())
    }

    async fn fetch_snapshot(&self, handle: &RecordHandle) -> Result<Vec<u8>, LedgerError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_fetch.take() {
            return Err(LedgerError::Network(error));
        }

        inner
            .records
            .get(handle)
            .map(|slot| slot.payload.clone())
            .ok_or_else(|| LedgerError::UnknownRecord(handle.to_string()))
    }

    async fn subscribe(
        &self,
        handle: &RecordHandle,
        callback: SnapshotCallback,
    ) -> Result<SubscriptionId, LedgerError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.records.contains_key(handle) {
            return Err(LedgerError::UnknownRecord(handle.to_string()));
        }

        let id = SubscriptionId::new();
        inner.subscriptions.insert(id, (*handle, callback));
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .subscriptions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| LedgerError::UnknownSubscription(id.to_string()))
    }
}

/// Execute one command against a record, as the deployed program would.
fn apply(slot: &mut RecordSlot, signer: &PlayerId, command: Command) -> Result<(), LedgerError> {
    match command {
        Command::InitGame => {
            if slot.state.is_some() {
                return Err(rejected("record already initialized"));
            }
            slot.state = Some(GameRecord::new(*signer));
        }
        Command::Join(timestamp) => {
            let state = initialized(slot)?;
            if state.phase != Phase::Waiting {
                return Err(rejected("game is not awaiting a second player"));
            }
            if state.player_x == *signer {
                return Err(rejected("cannot join your own game"));
            }
            state.player_o = Some(*signer);
            // Stamp both slots: a game must not start with a stale marker.
            state.keep_alive = [timestamp, timestamp];
            state.phase = Phase::XTurn;
        }
        Command::KeepAlive(timestamp) => {
            let state = initialized(slot)?;
            let seat = seat(state, signer)?;
            state.keep_alive[seat] = timestamp;
        }
        Command::Move(x, y) => {
            let state = initialized(slot)?;
            let seat = seat(state, signer)?;
            match (state.phase, seat) {
                (Phase::XTurn, 0) | (Phase::OTurn, 1) => {}
                (Phase::XTurn, _) | (Phase::OTurn, _) => return Err(rejected("not your turn")),
                _ => return Err(rejected("game is not in progress")),
            }
            if x >= 3 || y >= 3 {
                return Err(rejected("move out of bounds"));
            }
            let (x, y) = (x as usize, y as usize);
            if state.board.cell(x, y) != Cell::Empty {
                return Err(rejected("cell already claimed"));
            }
            let mark = if seat == 0 { Cell::X } else { Cell::O };
            state.board.set(x, y, mark);
            state.phase = next_phase(&state.board, mark, state.phase);
        }
    }

    let Some(state) = slot.state.as_ref() else {
        return Err(rejected("record not initialized"));
    };
    let encoded = state
        .encode()
        .map_err(|e| rejected(&format!("record re-encoding failed: {e}")))?;
    if encoded.len() > slot.space {
        return Err(rejected("record space exhausted"));
    }
    let mut payload = encoded;
    payload.resize(slot.space, 0);
    slot.payload = payload;
    Ok(())
}

fn initialized(slot: &mut RecordSlot) -> Result<&mut GameRecord, LedgerError> {
    slot.state
        .as_mut()
        .ok_or_else(|| rejected("record not initialized"))
}

/// Seat index of the signer: 0 for player X, 1 for player O.
fn seat(state: &GameRecord, signer: &PlayerId) -> Result<usize, LedgerError> {
    if state.player_x == *signer {
        Ok(0)
    } else if state.player_o.as_ref() == Some(signer) {
        Ok(1)
    } else {
        Err(rejected("signer is not a player in this game"))
    }
}

fn next_phase(board: &Board, mark: Cell, phase: Phase) -> Phase {
    if wins(board, mark) {
        if mark == Cell::X {
            Phase::XWon
        } else {
            Phase::OWon
        }
    } else if board.cells().iter().all(|&cell| cell != Cell::Empty) {
        Phase::Draw
    } else if phase == Phase::XTurn {
        Phase::OTurn
    } else {
        Phase::XTurn
    }
}

fn wins(board: &Board, mark: Cell) -> bool {
    const LINES: [[usize; 3]; 8] = [
        [0, 1, 2],
        [3, 4, 5],
        [6, 7, 8],
        [0, 3, 6],
        [1, 4, 7],
        [2, 5, 8],
        [0, 4, 8],
        [2, 4, 6],
    ];
    LINES
        .iter()
        .any(|line| line.iter().all(|&i| board.cells()[i] == mark))
}

fn rejected(msg: &str) -> LedgerError {
    LedgerError::CommandRejected(msg.to_string())
}
