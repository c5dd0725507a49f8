//! Registry bookkeeping shared by every project variant.
//!
//! A [`ProjectStore`] keeps an insertion-ordered list of artifacts
//! plus a URL-keyed index into that list, giving O(1) lookup and O(1)
//! removal. Removal swaps the last element into the vacated slot, so
//! list order is NOT preserved across removals; consumers that cached
//! an ordered snapshot must not assume it stays ordered.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;

use rustc_hash::FxHashMap;
use url::Url;

use crate::events::WorkspaceEvent;
use crate::project::ProjectId;
use crate::source_file::SourceFile;
use crate::urls;
use crate::workspace::Workspace;

struct IndexedFile {
    file: Arc<SourceFile>,
    /// Position of `file` in [`StoreInner::files`]; rewritten whenever
    /// a swap-removal moves the entity.
    index: usize,
}

#[derive(Default)]
struct StoreInner {
    files: Vec<Arc<SourceFile>>,
    by_url: FxHashMap<Url, IndexedFile>,
}

/// URL-keyed artifact registry owned by one project.
///
/// Mutations fire the corresponding workspace event after every
/// internal lock is released, so listeners observe a store that
/// already reflects the mutation and may re-enter it.
pub struct ProjectStore {
    workspace: Weak<Workspace>,
    project_id: ProjectId,
    inner: Mutex<StoreInner>,
}

impl ProjectStore {
    pub fn new(workspace: &Arc<Workspace>, project_id: ProjectId) -> Self {
        Self {
            workspace: Arc::downgrade(workspace),
            project_id,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// The workspace this store reports to. `None` after the workspace
    /// has been dropped.
    #[must_use]
    pub fn workspace(&self) -> Option<Arc<Workspace>> {
        self.workspace.upgrade()
    }

    #[must_use]
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register an artifact. Returns `false` without mutating anything
    /// (and without firing an event) when the URL is already present
    /// in this project.
    pub fn add_source_file(&self, file: Arc<SourceFile>) -> bool {
        let url = file.url();
        {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            if inner.by_url.contains_key(&url) {
                return false;
            }
            let index = inner.files.len();
            inner.files.push(Arc::clone(&file));
            inner.by_url.insert(
                url.clone(),
                IndexedFile {
                    file: Arc::clone(&file),
                    index,
                },
            );
        }
        tracing::debug!(project = %self.project_id, url = %url, "source file added");
        self.dispatch(WorkspaceEvent::SourceFileAdded(file));
        true
    }

    /// Deregister the artifact at `url`. Silent no-op when absent.
    ///
    /// The last list element is swapped into the removed slot and its
    /// recorded index rewritten, so removal is O(1) and ordering across
    /// removals is not stable.
    pub fn remove_source_file(&self, url: &Url) {
        let removed = {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            let Some(removed) = inner.by_url.remove(url) else {
                return;
            };
            inner.files.swap_remove(removed.index);
            if removed.index < inner.files.len() {
                let moved_url = inner.files[removed.index].url();
                if let Some(moved) = inner.by_url.get_mut(&moved_url) {
                    moved.index = removed.index;
                }
            }
            removed.file
        };
        tracing::debug!(project = %self.project_id, url = %url, "source file removed");
        self.dispatch(WorkspaceEvent::SourceFileRemoved(removed));
    }

    #[must_use]
    pub fn source_file_for_url(&self, url: &Url) -> Option<Arc<SourceFile>> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .by_url
            .get(url)
            .map(|indexed| Arc::clone(&indexed.file))
    }

    /// Snapshot of the current artifact list. Subsequent mutations are
    /// not reflected in the returned vector.
    #[must_use]
    pub fn source_files(&self) -> Vec<Arc<SourceFile>> {
        self.inner
            .lock()
            .expect("store lock poisoned")
            .files
            .clone()
    }

    /// Re-key the artifact under the URL derived from `new_name`
    /// (parent scope preserved; see [`urls::rename_url`]) and fire
    /// [`WorkspaceEvent::SourceFileRenamed`]. The entity itself is
    /// mutated in place, never replaced.
    ///
    /// Returns the new URL, or `None` when the file is not registered
    /// here or the target URL is already taken by another artifact.
    /// Renaming to the current name succeeds without firing an event.
    pub fn rename_source_file(&self, file: &Arc<SourceFile>, new_name: &str) -> Option<Url> {
        let (old_url, new_url) = {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            let old_url = file.url();
            let registered = inner
                .by_url
                .get(&old_url)
                .is_some_and(|indexed| Arc::ptr_eq(&indexed.file, file));
            if !registered {
                return None;
            }
            let new_url = urls::rename_url(&old_url, new_name);
            if new_url == old_url {
                return Some(new_url);
            }
            if inner.by_url.contains_key(&new_url) {
                return None;
            }
            let indexed = inner
                .by_url
                .remove(&old_url)
                .expect("registration checked above");
            file.set_url(new_url.clone());
            inner.by_url.insert(new_url.clone(), indexed);
            (old_url, new_url)
        };
        tracing::debug!(
            project = %self.project_id,
            old = %old_url,
            new = %new_url,
            "source file renamed"
        );
        self.dispatch(WorkspaceEvent::SourceFileRenamed {
            file: Arc::clone(file),
            old_url,
        });
        Some(new_url)
    }

    /// Deregister the owning project from the workspace, then clear
    /// this store. Clearing happens even though the project is no
    /// longer registered, so lingering entity handles stop resolving
    /// through it.
    ///
    /// This is the public teardown entry point;
    /// [`Workspace::remove_project`] alone deletes only the
    /// registration and leaves the store populated.
    pub fn remove_project(&self) {
        if let Some(workspace) = self.workspace.upgrade() {
            workspace.remove_project_by_id(&self.project_id);
        }
        let mut inner = self.inner.lock().expect("store lock poisoned");
        inner.files.clear();
        inner.by_url.clear();
    }

    fn dispatch(&self, event: WorkspaceEvent) {
        if let Some(workspace) = self.workspace.upgrade() {
            workspace.dispatch(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use crate::testing::StubProject;
    use crate::ProjectType;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn assert_indices_consistent(store: &ProjectStore) {
        let inner = store.inner.lock().unwrap();
        assert_eq!(inner.files.len(), inner.by_url.len());
        for (position, file) in inner.files.iter().enumerate() {
            let indexed = inner
                .by_url
                .get(&file.url())
                .expect("every listed file is indexed");
            assert_eq!(indexed.index, position);
            assert!(Arc::ptr_eq(&indexed.file, file));
        }
    }

    #[test]
    fn add_then_lookup() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        let store = project.store();

        let file = project.make_file("http://host/a.js", "");
        assert!(store.add_source_file(Arc::clone(&file)));

        assert_eq!(store.len(), 1);
        let found = store.source_file_for_url(&url("http://host/a.js")).unwrap();
        assert!(Arc::ptr_eq(&found, &file));
        assert_indices_consistent(store);
    }

    #[test]
    fn duplicate_add_is_rejected_without_mutation() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        let store = project.store();

        let original = project.make_file("http://host/a.js", "");
        assert!(store.add_source_file(Arc::clone(&original)));
        let impostor = project.make_file("http://host/a.js", "");
        assert!(!store.add_source_file(impostor));

        assert_eq!(store.len(), 1);
        let found = store.source_file_for_url(&url("http://host/a.js")).unwrap();
        assert!(Arc::ptr_eq(&found, &original));
    }

    #[test]
    fn duplicate_add_fires_no_event() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        let adds = Arc::new(Mutex::new(0usize));
        let seen = Arc::clone(&adds);
        let _subscription = workspace.on_event(move |event| {
            if matches!(event, WorkspaceEvent::SourceFileAdded(_)) {
                *seen.lock().unwrap() += 1;
            }
        });

        project
            .store()
            .add_source_file(project.make_file("http://host/a.js", ""));
        project
            .store()
            .add_source_file(project.make_file("http://host/a.js", ""));

        assert_eq!(*adds.lock().unwrap(), 1);
    }

    #[test]
    fn swap_removal_repairs_indices() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        let store = project.store();

        for name in ["a", "b", "c", "d"] {
            store.add_source_file(project.make_file(&format!("http://host/{name}.js"), ""));
        }

        // removing from the middle moves d.js into b.js's slot
        store.remove_source_file(&url("http://host/b.js"));

        assert_eq!(store.len(), 3);
        assert!(store.source_file_for_url(&url("http://host/b.js")).is_none());
        assert!(store.source_file_for_url(&url("http://host/d.js")).is_some());
        assert_indices_consistent(store);

        // removing the (now-moved) last element still works
        store.remove_source_file(&url("http://host/c.js"));
        assert_eq!(store.len(), 2);
        assert_indices_consistent(store);
    }

    #[test]
    fn removal_event_carries_removed_entity() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        let store = project.store();

        let file = project.make_file("http://host/a.js", "");
        store.add_source_file(Arc::clone(&file));

        let removed = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&removed);
        let _subscription = workspace.on_event(move |event| {
            if let WorkspaceEvent::SourceFileRemoved(file) = event {
                *seen.lock().unwrap() = Some(Arc::clone(file));
            }
        });

        store.remove_source_file(&url("http://host/a.js"));
        let removed = removed.lock().unwrap().take().unwrap();
        assert!(Arc::ptr_eq(&removed, &file));
    }

    #[test]
    fn removing_absent_url_is_noop() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        let store = project.store();

        store.add_source_file(project.make_file("http://host/a.js", ""));
        store.remove_source_file(&url("http://host/missing.js"));

        assert_eq!(store.len(), 1);
        assert_indices_consistent(store);
    }

    #[test]
    fn rename_rekeys_same_entity() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        let store = project.store();

        let file = project.make_file("http://host/dir/a.js", "");
        store.add_source_file(Arc::clone(&file));

        let renames = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&renames);
        let _subscription = workspace.on_event(move |event| {
            if let WorkspaceEvent::SourceFileRenamed { old_url, file } = event {
                seen.lock()
                    .unwrap()
                    .push((old_url.clone(), file.url()));
            }
        });

        let new_url = store.rename_source_file(&file, "b.js").unwrap();
        assert_eq!(new_url.as_str(), "http://host/dir/b.js");
        assert_eq!(file.url(), new_url);

        assert!(store.source_file_for_url(&url("http://host/dir/a.js")).is_none());
        let found = store.source_file_for_url(&new_url).unwrap();
        assert!(Arc::ptr_eq(&found, &file));
        assert_indices_consistent(store);

        assert_eq!(
            *renames.lock().unwrap(),
            vec![(url("http://host/dir/a.js"), url("http://host/dir/b.js"))]
        );
    }

    #[test]
    fn rename_onto_occupied_url_is_rejected() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        let store = project.store();

        let a = project.make_file("http://host/a.js", "");
        store.add_source_file(Arc::clone(&a));
        store.add_source_file(project.make_file("http://host/b.js", ""));

        assert!(store.rename_source_file(&a, "b.js").is_none());
        assert_eq!(a.url(), url("http://host/a.js"));
        assert_indices_consistent(store);
    }

    #[test]
    fn rename_of_unregistered_file_is_rejected() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        let stray = project.make_file("http://host/a.js", "");

        assert!(project.store().rename_source_file(&stray, "b.js").is_none());
    }

    #[test]
    fn remove_project_deregisters_and_clears() {
        let workspace = Workspace::new();
        let project = StubProject::new(&workspace, "p", ProjectType::Network);
        workspace.add_project(project.clone());
        project
            .store()
            .add_source_file(project.make_file("http://host/a.js", ""));

        project.store().remove_project();

        assert!(workspace.project(&ProjectId::new("p")).is_none());
        assert!(project.store().is_empty());
    }
}
