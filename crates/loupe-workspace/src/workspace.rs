//! The process-wide aggregator of projects.
//!
//! A [`Workspace`] owns the set of registered projects, multiplexes
//! artifact lookups across them, and is the single dispatch point for
//! registry events. It is an ordinary injectable object; callers that
//! want the process-wide instance go through
//! [`Workspace::instance`] / [`Workspace::remove_instance`], which
//! exist so tests can rebuild the registry from empty state.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;

use tokio::sync::oneshot;
use url::Url;

use crate::events::EventListeners;
use crate::events::Subscription;
use crate::events::WorkspaceEvent;
use crate::project::Project;
use crate::project::ProjectId;
use crate::project::ProjectType;
use crate::source_file::SourceFile;

static INSTANCE: Mutex<Option<Arc<Workspace>>> = Mutex::new(None);

/// Registry of projects and hub for their events.
pub struct Workspace {
    self_weak: Weak<Workspace>,
    /// Registered projects in `add_project` order. Lookups scan in this
    /// order, so the project registered first wins URL collisions.
    projects: Mutex<Vec<Arc<dyn Project>>>,
    listeners: EventListeners,
    has_resource_content_trackers: AtomicBool,
}

impl Workspace {
    /// Create an independent workspace. Most consumers share the
    /// process-wide one from [`Workspace::instance`]; tests and
    /// embedders construct their own.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            self_weak: self_weak.clone(),
            projects: Mutex::new(Vec::new()),
            listeners: EventListeners::new(),
            has_resource_content_trackers: AtomicBool::new(false),
        })
    }

    /// The process-wide workspace, created on first use.
    pub fn instance() -> Arc<Workspace> {
        INSTANCE
            .lock()
            .expect("workspace holder lock poisoned")
            .get_or_insert_with(Workspace::new)
            .clone()
    }

    /// Replace the process-wide workspace with a fresh, empty one and
    /// return it.
    pub fn instance_force_new() -> Arc<Workspace> {
        let fresh = Workspace::new();
        *INSTANCE.lock().expect("workspace holder lock poisoned") = Some(Arc::clone(&fresh));
        fresh
    }

    /// Drop the process-wide workspace. The next [`Workspace::instance`]
    /// call rebuilds from empty state. Handles obtained earlier keep
    /// working; they just no longer refer to the shared instance.
    pub fn remove_instance() {
        INSTANCE
            .lock()
            .expect("workspace holder lock poisoned")
            .take();
    }

    /// Register a project.
    ///
    /// # Panics
    ///
    /// Panics when a project with the same id is already registered;
    /// that is a programming error, not a recoverable condition. The
    /// existing registration is left untouched.
    pub fn add_project(&self, project: Arc<dyn Project>) {
        let duplicate = {
            let projects = self.projects.lock().expect("projects lock poisoned");
            projects.iter().any(|existing| existing.id() == project.id())
        };
        assert!(!duplicate, "project already registered: {}", project.id());
        let id = project.id().clone();
        self.projects
            .lock()
            .expect("projects lock poisoned")
            .push(project);
        tracing::debug!(project = %id, "project added");
        self.dispatch(&WorkspaceEvent::ProjectAdded(id));
    }

    /// Deregister a project. Silent no-op when it is not registered.
    ///
    /// This only deletes the registration and fires
    /// [`WorkspaceEvent::ProjectRemoved`]; the project's own store keeps
    /// its entities. Full teardown goes through
    /// [`ProjectStore::remove_project`](crate::ProjectStore::remove_project),
    /// which calls back into this method exactly once.
    pub fn remove_project(&self, project: &dyn Project) {
        self.remove_project_by_id(project.id());
    }

    pub(crate) fn remove_project_by_id(&self, id: &ProjectId) {
        let removed = {
            let mut projects = self.projects.lock().expect("projects lock poisoned");
            let before = projects.len();
            projects.retain(|existing| existing.id() != id);
            projects.len() != before
        };
        if removed {
            tracing::debug!(project = %id, "project removed");
            self.dispatch(&WorkspaceEvent::ProjectRemoved(id.clone()));
        }
    }

    #[must_use]
    pub fn project(&self, id: &ProjectId) -> Option<Arc<dyn Project>> {
        self.projects
            .lock()
            .expect("projects lock poisoned")
            .iter()
            .find(|project| project.id() == id)
            .cloned()
    }

    #[must_use]
    pub fn projects(&self) -> Vec<Arc<dyn Project>> {
        self.projects.lock().expect("projects lock poisoned").clone()
    }

    #[must_use]
    pub fn projects_for_type(&self, project_type: ProjectType) -> Vec<Arc<dyn Project>> {
        self.projects
            .lock()
            .expect("projects lock poisoned")
            .iter()
            .filter(|project| project.project_type() == project_type)
            .cloned()
            .collect()
    }

    /// Direct lookup through one named project.
    #[must_use]
    pub fn source_file(&self, project_id: &ProjectId, url: &Url) -> Option<Arc<SourceFile>> {
        self.project(project_id)?.source_file_for_url(url)
    }

    /// First artifact with the given URL, scanning projects in
    /// registration order. The same URL may live in several projects at
    /// once (say, a network script and its filesystem-mapped copy);
    /// pass `project_type` to disambiguate.
    #[must_use]
    pub fn source_file_for_url(
        &self,
        url: &Url,
        project_type: Option<ProjectType>,
    ) -> Option<Arc<SourceFile>> {
        self.projects()
            .iter()
            .filter(|project| project_type.is_none_or(|t| project.project_type() == t))
            .find_map(|project| project.source_file_for_url(url))
    }

    /// All artifacts in projects of the given type, in
    /// project-registration order, then entity-list order.
    #[must_use]
    pub fn source_files_for_project_type(
        &self,
        project_type: ProjectType,
    ) -> Vec<Arc<SourceFile>> {
        self.projects_for_type(project_type)
            .iter()
            .flat_map(|project| project.source_files())
            .collect()
    }

    /// All artifacts across every registered project.
    #[must_use]
    pub fn source_files(&self) -> Vec<Arc<SourceFile>> {
        self.projects()
            .iter()
            .flat_map(|project| project.source_files())
            .collect()
    }

    /// Resolve to the artifact at `url` as soon as it exists.
    ///
    /// Returns immediately when a matching artifact is already
    /// registered; otherwise waits for the first matching
    /// [`WorkspaceEvent::SourceFileAdded`]. A second add of the same
    /// URL after resolution has no effect on the caller.
    ///
    /// There is deliberately no timeout: the wait is unbounded when no
    /// matching artifact ever arrives. Dropping the returned future
    /// deregisters the one-shot listener; `None` is returned only when
    /// the workspace itself is torn down mid-wait.
    pub async fn wait_for_source_file(
        &self,
        url: &Url,
        project_type: Option<ProjectType>,
    ) -> Option<Arc<SourceFile>> {
        if let Some(existing) = self.source_file_for_url(url, project_type) {
            return Some(existing);
        }

        let (sender, receiver) = oneshot::channel();
        let slot = Mutex::new(Some(sender));
        let wanted = url.clone();
        let subscription = self.on_event(move |event| {
            let WorkspaceEvent::SourceFileAdded(file) = event else {
                return;
            };
            if file.url() != wanted {
                return;
            }
            if let Some(wanted_type) = project_type {
                let matches = file
                    .project()
                    .is_some_and(|project| project.project_type() == wanted_type);
                if !matches {
                    return;
                }
            }
            if let Some(sender) = slot.lock().expect("pending-file lock poisoned").take() {
                let _ = sender.send(Arc::clone(file));
            }
        });

        // the artifact may have arrived between the lookup above and
        // the subscription taking effect
        if let Some(existing) = self.source_file_for_url(url, project_type) {
            return Some(existing);
        }

        let resolved = receiver.await.ok();
        subscription.unsubscribe();
        resolved
    }

    /// Register a listener for every workspace event. Listeners run
    /// synchronously in registration order on the mutating call stack.
    pub fn on_event<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&WorkspaceEvent) + Send + Sync + 'static,
    {
        let id = self.listeners.subscribe(callback);
        Subscription::new(self.self_weak.clone(), id)
    }

    pub fn set_has_resource_content_trackers(&self, value: bool) {
        self.has_resource_content_trackers
            .store(value, Ordering::Relaxed);
    }

    /// Process-wide flag consulted by external tooling that tracks
    /// resource content on its own; the registry only stores it.
    #[must_use]
    pub fn has_resource_content_trackers(&self) -> bool {
        self.has_resource_content_trackers.load(Ordering::Relaxed)
    }

    pub(crate) fn listeners(&self) -> &EventListeners {
        &self.listeners
    }

    pub(crate) fn dispatch(&self, event: &WorkspaceEvent) {
        self.listeners.dispatch(event);
    }
}
