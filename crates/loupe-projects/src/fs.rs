//! Filesystem-backed project.
//!
//! Artifacts are the files under a root directory, keyed by `file://`
//! URLs. Discovery honors ignore files and the exclusion list from
//! [`loupe_conf::Settings`]; content is read from disk on demand, and
//! an optional watcher keeps the registry in sync with external
//! changes.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;

use anyhow::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use loupe_conf::Settings;
use loupe_workspace::ContentType;
use loupe_workspace::FileContent;
use loupe_workspace::FileMetadata;
use loupe_workspace::Project;
use loupe_workspace::ProjectError;
use loupe_workspace::ProjectId;
use loupe_workspace::ProjectStore;
use loupe_workspace::ProjectType;
use loupe_workspace::SearchMatch;
use loupe_workspace::SourceFile;
use loupe_workspace::Workspace;
use url::Url;

use crate::paths;
use crate::search::search_in_content;
use crate::walk::walk_root;
use crate::walk::WalkOptions;
use crate::watcher::FsWatcher;
use crate::watcher::WatchEvent;

pub struct FileSystemProject {
    self_weak: Weak<FileSystemProject>,
    id: ProjectId,
    display_name: String,
    root: Utf8PathBuf,
    store: ProjectStore,
    settings: Mutex<Settings>,
    watcher: Mutex<Option<FsWatcher>>,
}

impl FileSystemProject {
    /// Create a project rooted at `root`. The project id is derived
    /// from the root path, so two projects over the same directory
    /// collide when registered.
    pub fn new(workspace: &Arc<Workspace>, root: Utf8PathBuf, settings: Settings) -> Arc<Self> {
        let id = ProjectId::new(format!("filesystem:{root}"));
        let display_name = root
            .file_name()
            .map_or_else(|| root.as_str().to_owned(), str::to_owned);
        Arc::new_cyclic(|self_weak| Self {
            self_weak: self_weak.clone(),
            store: ProjectStore::new(workspace, id.clone()),
            id,
            display_name,
            root,
            settings: Mutex::new(settings),
            watcher: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Discover the files under the root and register each one.
    /// Returns how many artifacts were newly registered.
    pub fn populate(&self) -> usize {
        let (excluded, options) = {
            let settings = self.settings.lock().expect("settings lock poisoned");
            (settings.excluded_folders.clone(), WalkOptions::from(&*settings))
        };
        let discovered = walk_root(&self.root, &excluded, &options);
        let added = discovered
            .iter()
            .filter(|path| self.register_path(path).is_some())
            .count();
        tracing::debug!(project = %self.id, added, "populated from disk");
        added
    }

    /// Start watching the root for external changes; pending changes
    /// are applied by [`process_watch_events`](Self::process_watch_events).
    pub fn enable_watching(&self) -> Result<()> {
        let (debounce_ms, excluded) = {
            let settings = self.settings.lock().expect("settings lock poisoned");
            let excluded = settings
                .excluded_folders
                .iter()
                .map(|folder| {
                    if folder.is_absolute() {
                        folder.clone()
                    } else {
                        self.root.join(folder)
                    }
                })
                .collect();
            (settings.watch.debounce_ms, excluded)
        };
        let watcher = FsWatcher::new(&self.root, debounce_ms, excluded)?;
        *self.watcher.lock().expect("watcher lock poisoned") = Some(watcher);
        Ok(())
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .expect("watcher lock poisoned")
            .is_some()
    }

    /// Apply pending watcher events to the store: unknown created or
    /// modified paths are registered, deleted paths deregistered.
    /// Modifications to known files change no registry state, since
    /// content is read from disk on demand anyway. Returns the number
    /// of registry changes applied.
    pub fn process_watch_events(&self) -> usize {
        let events = {
            let guard = self.watcher.lock().expect("watcher lock poisoned");
            match guard.as_ref() {
                Some(watcher) => watcher.try_recv_events(),
                None => return 0,
            }
        };

        let mut changed = 0;
        for event in events {
            match event {
                WatchEvent::Created(path) | WatchEvent::Modified(path) => {
                    if path.is_file() && self.register_path(&path).is_some() {
                        changed += 1;
                    }
                }
                WatchEvent::Deleted(path) => {
                    if let Some(url) = paths::path_to_url(&path) {
                        if self.store.source_file_for_url(&url).is_some() {
                            self.store.remove_source_file(&url);
                            changed += 1;
                        }
                    }
                }
            }
        }
        changed
    }

    fn register_path(&self, path: &Utf8Path) -> Option<Arc<SourceFile>> {
        if self.is_excluded(path) {
            return None;
        }
        let url = paths::path_to_url(path)?;
        if self.store.source_file_for_url(&url).is_some() {
            return None;
        }
        let content_type = path
            .extension()
            .map_or(ContentType::Other, ContentType::from_extension);
        let project: Weak<dyn Project> = self.self_weak.clone();
        let file = SourceFile::new(project, self.id.clone(), url, content_type);
        self.store
            .add_source_file(Arc::clone(&file))
            .then_some(file)
    }

    fn is_excluded(&self, path: &Utf8Path) -> bool {
        let settings = self.settings.lock().expect("settings lock poisoned");
        settings.excluded_folders.iter().any(|folder| {
            let folder = if folder.is_absolute() {
                folder.clone()
            } else {
                self.root.join(folder)
            };
            path.starts_with(&folder)
        })
    }

    fn path_for(&self, file: &SourceFile) -> Result<Utf8PathBuf, ProjectError> {
        let url = file.url();
        paths::url_to_path(&url).ok_or(ProjectError::InvalidPath(url))
    }
}

#[async_trait]
impl Project for FileSystemProject {
    fn id(&self) -> &ProjectId {
        &self.id
    }

    fn project_type(&self) -> ProjectType {
        ProjectType::FileSystem
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }

    fn store(&self) -> &ProjectStore {
        &self.store
    }

    async fn request_file_content(&self, file: &SourceFile) -> Result<FileContent, ProjectError> {
        let path = self.path_for(file)?;
        if file.content_type().is_textual() {
            let text = tokio::fs::read_to_string(path.as_std_path()).await?;
            Ok(FileContent::plain(text))
        } else {
            let bytes = tokio::fs::read(path.as_std_path()).await?;
            Ok(FileContent::base64(BASE64.encode(bytes)))
        }
    }

    async fn request_metadata(&self, file: &SourceFile) -> Option<FileMetadata> {
        let path = self.path_for(file).ok()?;
        let metadata = tokio::fs::metadata(path.as_std_path()).await.ok()?;
        Some(FileMetadata {
            modified: metadata.modified().ok(),
            size: Some(metadata.len()),
        })
    }

    fn mime_type(&self, file: &SourceFile) -> String {
        self.path_for(file)
            .ok()
            .and_then(|path| mime_guess::from_path(path.as_std_path()).first())
            .map_or_else(
                || file.content_type().default_mime_type().to_owned(),
                |mime| mime.to_string(),
            )
    }

    fn full_display_name(&self, file: &SourceFile) -> String {
        match self.path_for(file) {
            Ok(path) => match path.strip_prefix(&self.root) {
                Ok(relative) => format!("{}/{relative}", self.display_name),
                Err(_) => path.to_string(),
            },
            Err(_) => file.name(),
        }
    }

    fn can_set_file_content(&self) -> bool {
        true
    }

    async fn set_file_content(
        &self,
        file: &SourceFile,
        content: &str,
    ) -> Result<(), ProjectError> {
        let path = self.path_for(file)?;
        tokio::fs::write(path.as_std_path(), content).await?;
        Ok(())
    }

    fn can_rename(&self) -> bool {
        true
    }

    async fn rename(
        &self,
        file: &Arc<SourceFile>,
        new_name: &str,
    ) -> Result<Option<Url>, ProjectError> {
        let old_path = self.path_for(file)?;
        let new_path = old_path
            .parent()
            .map_or_else(|| Utf8PathBuf::from(new_name), |parent| parent.join(new_name));
        tokio::fs::rename(old_path.as_std_path(), new_path.as_std_path()).await?;
        Ok(self.store.rename_source_file(file, new_name))
    }

    fn can_create_file(&self) -> bool {
        true
    }

    async fn create_file(
        &self,
        name: &str,
        content: &str,
    ) -> Result<Option<Arc<SourceFile>>, ProjectError> {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent.as_std_path()).await?;
        }
        tokio::fs::write(path.as_std_path(), content).await?;
        Ok(self.register_path(&path))
    }

    fn can_exclude_folder(&self) -> bool {
        true
    }

    fn exclude_folder(&self, folder_url: &Url) {
        let Some(folder) = paths::url_to_path(folder_url) else {
            return;
        };
        {
            let mut settings = self.settings.lock().expect("settings lock poisoned");
            let relative = folder
                .strip_prefix(&self.root)
                .map_or_else(|_| folder.clone(), Utf8Path::to_path_buf);
            if !settings.excluded_folders.contains(&relative) {
                settings.excluded_folders.push(relative);
                if let Err(error) = settings.save_excluded_folders(&self.root) {
                    tracing::warn!(project = %self.id, %error, "failed to persist folder exclusion");
                }
            }
        }
        for file in self.store.source_files() {
            let under_folder = paths::url_to_path(&file.url())
                .is_some_and(|path| path.starts_with(&folder));
            if under_folder {
                self.store.remove_source_file(&file.url());
            }
        }
    }

    async fn delete_file(&self, file: &SourceFile) {
        let url = file.url();
        if let Some(path) = paths::url_to_path(&url) {
            if let Err(error) = tokio::fs::remove_file(path.as_std_path()).await {
                tracing::warn!(project = %self.id, path = %path, %error, "failed to delete from disk");
            }
        }
        self.store.remove_source_file(&url);
    }

    fn remove(&self) {
        self.watcher.lock().expect("watcher lock poisoned").take();
        self.store.remove_project();
    }

    /// Every artifact is locally readable, so all of them are
    /// indexable.
    async fn index_content(&self) -> usize {
        self.store.len()
    }

    async fn search_in_file_content(
        &self,
        file: &SourceFile,
        query: &str,
        case_sensitive: bool,
        is_regex: bool,
    ) -> Vec<SearchMatch> {
        if !file.content_type().is_textual() {
            return Vec::new();
        }
        let Ok(content) = self.request_file_content(file).await else {
            return Vec::new();
        };
        search_in_content(&content.text, query, case_sensitive, is_regex)
    }

    fn find_files_matching(&self, query: &str) -> Vec<Url> {
        let query = query.to_lowercase();
        self.store
            .source_files()
            .iter()
            .map(|file| file.url())
            .filter(|url| url.as_str().to_lowercase().contains(&query))
            .collect()
    }
}
