//! The session controller.
//!
//! A [`Session`] mirrors one remote game record for one player: it issues
//! commands against the record, keeps the peer informed through the
//! keep-alive loop, and folds pushed snapshots into a fresh
//! [`SessionView`] for its listeners.
//!
//! ```text
//! Application → Session → Ledger → remote program
//!                  ↓
//!             oxo-core (pure view derivation)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::task::JoinHandle;

use oxo_core::{derive, SessionView};
use oxo_types::{
    Command, GameRecord, PlayerId, ProtocolError, RecordHandle, SubscriptionId,
};

use crate::config::SessionConfig;
use crate::events::{ListenerId, ListenerSet};
use crate::ledger::{Ledger, LedgerError, SnapshotCallback};

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The ledger collaborator failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A fetched record payload could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The join command was submitted but the record does not reflect it.
    #[error("join rejected: {0}")]
    JoinRejected(String),
}

/// One player's live attachment to a remote game record.
///
/// A session is an exclusive-owner object: it is not `Clone`, and all
/// mutation funnels through the snapshot-apply path. Dropping the session
/// aborts its keep-alive task; the subscription itself is released by the
/// keep-alive loop when it observes abandonment or a finished game.
pub struct Session {
    inner: Arc<SessionInner>,
    keep_alive_task: JoinHandle<()>,
}

struct SessionInner {
    ledger: Arc<dyn Ledger>,
    config: SessionConfig,
    identity: PlayerId,
    record: RecordHandle,
    is_player_x: bool,
    abandoned: AtomicBool,
    view: Mutex<SessionView>,
    subscription: Mutex<Option<SubscriptionId>>,
    listeners: Mutex<ListenerSet>,
}

impl Session {
    /// Create a new game: allocate a record, initialize it, take the X seat.
    ///
    /// Allocation and submission failures propagate to the caller; nothing
    /// is retried.
    pub async fn create(
        ledger: Arc<dyn Ledger>,
        config: SessionConfig,
        identity: PlayerId,
    ) -> Result<Self, SessionError> {
        let record = ledger
            .allocate_record(&identity, &config.program, config.record_space)
            .await?;
        submit_raw(
            ledger.as_ref(),
            &identity,
            record,
            &config,
            Command::InitGame,
            config.confirm_commands,
        )
        .await?;
        tracing::info!("created game record {record}");
        Self::attach(ledger, config, identity, record, true).await
    }

    /// Join an existing game as player O.
    ///
    /// The join command is submitted without inspecting the record first; a
    /// record that was not waiting for an opponent surfaces as a rejection
    /// from the authority, or as [`SessionError::JoinRejected`] when the
    /// post-join fetch does not list the joining identity.
    pub async fn join(
        ledger: Arc<dyn Ledger>,
        config: SessionConfig,
        identity: PlayerId,
        record: RecordHandle,
    ) -> Result<Self, SessionError> {
        submit_raw(
            ledger.as_ref(),
            &identity,
            record,
            &config,
            Command::Join(now_ms()),
            config.confirm_commands,
        )
        .await?;
        let session = Self::attach(ledger, config, identity, record, false).await?;
        if session.view().player_o != Some(identity) {
            return Err(SessionError::JoinRejected(
                "record does not list us as player O".into(),
            ));
        }
        tracing::info!("joined game record {record}");
        Ok(session)
    }

    /// Shared tail of [`create`](Self::create) and [`join`](Self::join):
    /// populate the initial view, subscribe, start the keep-alive loop.
    async fn attach(
        ledger: Arc<dyn Ledger>,
        config: SessionConfig,
        identity: PlayerId,
        record: RecordHandle,
        is_player_x: bool,
    ) -> Result<Self, SessionError> {
        let raw = ledger.fetch_snapshot(&record).await?;
        let decoded = GameRecord::decode(&raw)?;
        let derivation = derive(&decoded, is_player_x, now_ms());

        let inner = Arc::new(SessionInner {
            ledger,
            config,
            identity,
            record,
            is_player_x,
            abandoned: AtomicBool::new(derivation.peer_vanished),
            view: Mutex::new(derivation.view),
            subscription: Mutex::new(None),
            listeners: Mutex::new(ListenerSet::default()),
        });

        subscribe_changes(&inner).await?;
        let keep_alive_task = tokio::spawn(keep_alive_loop(Arc::downgrade(&inner)));

        Ok(Self {
            inner,
            keep_alive_task,
        })
    }

    /// Submit a move at 0-indexed board coordinates.
    ///
    /// Legality is entirely the remote authority's call; an illegal move
    /// surfaces as [`LedgerError::CommandRejected`].
    pub async fn make_move(&self, x: u8, y: u8) -> Result<(), SessionError> {
        self.inner
            .submit(Command::Move(x, y), self.inner.config.confirm_commands)
            .await
    }

    /// Send a keep-alive marker carrying `now`, or an explicit override.
    ///
    /// The override `0` tells the peer we are gone for good.
    pub async fn keep_alive(&self, timestamp_override: Option<u64>) -> Result<(), SessionError> {
        let timestamp = timestamp_override.unwrap_or_else(now_ms);
        self.inner.submit(Command::KeepAlive(timestamp), false).await
    }

    /// Abandon the game.
    ///
    /// Latches the local flag, then best-effort signals the peer with a zero
    /// keep-alive. Delivery failure is logged, never returned; the keep-alive
    /// loop releases the subscription on its next tick.
    pub async fn abandon(&self) {
        self.inner.abandoned.store(true, Ordering::Relaxed);
        if let Err(e) = self.keep_alive(Some(0)).await {
            tracing::warn!("abandon signal not delivered: {e}");
        }
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> SessionView {
        self.inner.view.lock().unwrap().clone()
    }

    /// Re-fetch the record and rebuild the view.
    pub async fn refresh(&self) -> Result<SessionView, SessionError> {
        let raw = self.inner.ledger.fetch_snapshot(&self.inner.record).await?;
        Ok(self.inner.apply_snapshot(&raw)?)
    }

    /// Register a change listener, fired on every replaced view.
    ///
    /// Multiple listeners are supported; no ordering is guaranteed between
    /// them.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SessionView) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().unwrap().add(Arc::new(listener))
    }

    /// Remove a previously registered listener. Unknown ids are ignored.
    pub fn remove_change_listener(&self, id: ListenerId) {
        self.inner.listeners.lock().unwrap().remove(id);
    }

    /// Whether this session holds the X seat.
    pub fn is_player_x(&self) -> bool {
        self.inner.is_player_x
    }

    /// Handle of the mirrored record.
    pub fn record_handle(&self) -> RecordHandle {
        self.inner.record
    }

    /// Whether the session has been abandoned, locally or by peer timeout.
    pub fn abandoned(&self) -> bool {
        self.inner.abandoned.load(Ordering::Relaxed)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.keep_alive_task.abort();
    }
}

impl SessionInner {
    async fn submit(&self, command: Command, confirm: bool) -> Result<(), SessionError> {
        submit_raw(
            self.ledger.as_ref(),
            &self.identity,
            self.record,
            &self.config,
            command,
            confirm,
        )
        .await
    }

    /// Change-notification bridge: decode a raw snapshot, derive the view,
    /// latch abandonment, publish, notify listeners.
    fn apply_snapshot(&self, raw: &[u8]) -> Result<SessionView, ProtocolError> {
        let record = GameRecord::decode(raw)?;
        let derivation = derive(&record, self.is_player_x, now_ms());
        if derivation.peer_vanished {
            self.abandoned.store(true, Ordering::Relaxed);
            tracing::info!("peer keep-alive went stale, marking session abandoned");
        }

        let view = derivation.view;
        *self.view.lock().unwrap() = view.clone();

        let listeners = self.listeners.lock().unwrap().current();
        for listener in listeners {
            listener(&view);
        }
        Ok(view)
    }

    /// Release the change subscription, if held. Safe to call repeatedly.
    async fn release_subscription(&self) {
        let id = self.subscription.lock().unwrap().take();
        if let Some(id) = id {
            if let Err(e) = self.ledger.unsubscribe(id).await {
                tracing::warn!("unsubscribe failed: {e}");
            }
        }
    }
}

async fn submit_raw(
    ledger: &dyn Ledger,
    signer: &PlayerId,
    record: RecordHandle,
    config: &SessionConfig,
    command: Command,
    confirm: bool,
) -> Result<(), SessionError> {
    let payload = command.to_payload()?;
    ledger
        .submit_command(signer, &[record], &config.program, &payload, confirm)
        .await?;
    Ok(())
}

/// Subscribe to record change notifications.
///
/// A second call while the subscription is held is a no-op, never an error.
async fn subscribe_changes(inner: &Arc<SessionInner>) -> Result<(), SessionError> {
    if inner.subscription.lock().unwrap().is_some() {
        return Ok(());
    }

    let weak = Arc::downgrade(inner);
    let callback: SnapshotCallback = Arc::new(move |raw: Vec<u8>| {
        if let Some(inner) = weak.upgrade() {
            if let Err(e) = inner.apply_snapshot(&raw) {
                // Nothing upstream to surface this to; keep the last good view.
                tracing::error!("dropping undecodable snapshot: {e}");
            }
        }
    });
    let id = inner.ledger.subscribe(&inner.record, callback).await?;
    *inner.subscription.lock().unwrap() = Some(id);
    Ok(())
}

/// Periodic keep-alive driver.
///
/// Runs until the session is abandoned, the game reaches a terminal phase,
/// or the session itself is dropped. The subscription is released on both
/// terminal paths. A failed send is logged and the loop keeps going.
async fn keep_alive_loop(inner: Weak<SessionInner>) {
    let period = match inner.upgrade() {
        Some(strong) => strong.config.keep_alive_period,
        None => return,
    };
    let mut tick = tokio::time::interval(period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tick.tick().await;
        let Some(strong) = inner.upgrade() else {
            return;
        };

        if strong.abandoned.load(Ordering::Relaxed) {
            strong.release_subscription().await;
            tracing::debug!("keep-alive loop stopped: session abandoned");
            return;
        }

        let phase = strong.view.lock().unwrap().phase;
        if phase.is_terminal() {
            strong.release_subscription().await;
            tracing::debug!("keep-alive loop stopped: game finished ({phase:?})");
            return;
        }

        if let Err(e) = strong.submit(Command::KeepAlive(now_ms()), false).await {
            tracing::warn!("keep-alive send failed: {e}");
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
