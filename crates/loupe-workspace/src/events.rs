//! Workspace event types and the listener registry.
//!
//! Listeners run synchronously, in registration order, on the same
//! call stack as the mutation that produced the event. No internal
//! lock is held while a listener runs, so a listener may re-enter the
//! workspace; the state it observes already reflects the mutation.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;

use url::Url;

use crate::project::ProjectId;
use crate::source_file::SourceFile;
use crate::workspace::Workspace;

/// Everything the workspace announces about its registry.
///
/// The `WorkingCopy*` events are produced by [`SourceFile`]'s editing
/// state; the rest are produced by registry mutations.
#[derive(Clone, Debug)]
pub enum WorkspaceEvent {
    SourceFileAdded(Arc<SourceFile>),
    SourceFileRemoved(Arc<SourceFile>),
    SourceFileRenamed {
        file: Arc<SourceFile>,
        old_url: Url,
    },
    WorkingCopyChanged(Arc<SourceFile>),
    WorkingCopyCommitted {
        file: Arc<SourceFile>,
        content: Arc<str>,
    },
    WorkingCopyCommittedByUser {
        file: Arc<SourceFile>,
        content: Arc<str>,
    },
    ProjectAdded(ProjectId),
    ProjectRemoved(ProjectId),
}

/// Identifier handed out by [`EventListeners::subscribe`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    callback: Arc<dyn Fn(&WorkspaceEvent) + Send + Sync>,
}

/// Registration-ordered listener set.
pub(crate) struct EventListeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<ListenerEntry>>,
}

impl EventListeners {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&WorkspaceEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .expect("listener registry lock poisoned")
            .push(ListenerEntry {
                id,
                callback: Arc::new(callback),
            });
        id
    }

    pub(crate) fn unsubscribe(&self, id: ListenerId) {
        self.entries
            .lock()
            .expect("listener registry lock poisoned")
            .retain(|entry| entry.id != id);
    }

    /// Invoke every listener, in registration order, on this call
    /// stack. The registry lock is released before the first callback
    /// runs so listeners can subscribe, unsubscribe, or re-enter the
    /// workspace.
    pub(crate) fn dispatch(&self, event: &WorkspaceEvent) {
        let callbacks: Vec<_> = self
            .entries
            .lock()
            .expect("listener registry lock poisoned")
            .iter()
            .map(|entry| Arc::clone(&entry.callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("listener registry lock poisoned")
            .len()
    }
}

/// RAII handle for a registered listener. Dropping it (or calling
/// [`unsubscribe`](Subscription::unsubscribe)) removes the listener.
#[must_use = "dropping the subscription immediately removes the listener"]
pub struct Subscription {
    workspace: Weak<Workspace>,
    id: ListenerId,
}

impl Subscription {
    pub(crate) fn new(workspace: Weak<Workspace>, id: ListenerId) -> Self {
        Self { workspace, id }
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(workspace) = self.workspace.upgrade() {
            workspace.listeners().unsubscribe(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_runs_in_registration_order() {
        let listeners = EventListeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        listeners.subscribe(move |_| first.lock().unwrap().push("first"));
        let second = Arc::clone(&seen);
        listeners.subscribe(move |_| second.lock().unwrap().push("second"));

        listeners.dispatch(&WorkspaceEvent::ProjectAdded(ProjectId::new("p")));

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let listeners = EventListeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        let id = listeners.subscribe(move |_| first.lock().unwrap().push("first"));
        let second = Arc::clone(&seen);
        listeners.subscribe(move |_| second.lock().unwrap().push("second"));

        listeners.unsubscribe(id);
        listeners.dispatch(&WorkspaceEvent::ProjectRemoved(ProjectId::new("p")));

        assert_eq!(*seen.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn listener_may_subscribe_during_dispatch() {
        let listeners = Arc::new(EventListeners::new());
        let reentrant = Arc::clone(&listeners);
        listeners.subscribe(move |_| {
            reentrant.subscribe(|_| {});
        });

        listeners.dispatch(&WorkspaceEvent::ProjectAdded(ProjectId::new("p")));
        assert_eq!(listeners.len(), 2);
    }
}
