//! Change-listener registry for session views.

use std::sync::Arc;

use oxo_core::SessionView;

/// Callback invoked with each replaced session view.
pub type ChangeListener = Arc<dyn Fn(&SessionView) + Send + Sync>;

/// Handle identifying a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The registered listeners of one session.
///
/// There is no ordering guarantee between listeners. Emission happens on a
/// snapshot of the registry so a listener may add or remove listeners
/// without deadlocking.
#[derive(Default)]
pub(crate) struct ListenerSet {
    next_id: u64,
    entries: Vec<(u64, ChangeListener)>,
}

impl ListenerSet {
    pub(crate) fn add(&mut self, listener: ChangeListener) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, listener));
        ListenerId(id)
    }

    /// Remove a listener. Unknown ids are ignored.
    pub(crate) fn remove(&mut self, id: ListenerId) {
        self.entries.retain(|(entry_id, _)| *entry_id != id.0);
    }

    /// Snapshot of the current listeners, for emission outside the lock.
    pub(crate) fn current(&self) -> Vec<ChangeListener> {
        self.entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
