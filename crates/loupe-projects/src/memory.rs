//! In-memory content-provider project.
//!
//! Serves the producers whose artifacts arrive with their content
//! already in hand: debugger-reported scripts, formatter output,
//! network-loaded resources, injected content scripts, service
//! internals. The variant is picked at construction time; behavior
//! differs only in the reported [`ProjectType`] and whether content
//! writes are accepted.

use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use dashmap::DashMap;
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

use crate::search::search_in_content;

pub struct MemoryProject {
    self_weak: Weak<MemoryProject>,
    id: ProjectId,
    project_type: ProjectType,
    display_name: String,
    writable: bool,
    store: ProjectStore,
    contents: DashMap<Url, Arc<str>>,
}

impl MemoryProject {
    pub fn new(
        workspace: &Arc<Workspace>,
        id: impl Into<String>,
        project_type: ProjectType,
        display_name: impl Into<String>,
    ) -> Arc<Self> {
        Self::build(workspace, id, project_type, display_name, false)
    }

    /// A project that additionally accepts content writes
    /// (`can_set_file_content` reports `true`).
    pub fn writable(
        workspace: &Arc<Workspace>,
        id: impl Into<String>,
        project_type: ProjectType,
        display_name: impl Into<String>,
    ) -> Arc<Self> {
        Self::build(workspace, id, project_type, display_name, true)
    }

    fn build(
        workspace: &Arc<Workspace>,
        id: impl Into<String>,
        project_type: ProjectType,
        display_name: impl Into<String>,
        writable: bool,
    ) -> Arc<Self> {
        let id = ProjectId::new(id);
        Arc::new_cyclic(|self_weak| Self {
            self_weak: self_weak.clone(),
            store: ProjectStore::new(workspace, id.clone()),
            id,
            project_type,
            display_name: display_name.into(),
            writable,
            contents: DashMap::new(),
        })
    }

    /// Register an artifact with its content. Returns `None` when the
    /// URL is already taken in this project, leaving the existing
    /// registration and its content untouched.
    pub fn add_file(
        &self,
        url: Url,
        content_type: ContentType,
        content: impl Into<Arc<str>>,
    ) -> Option<Arc<SourceFile>> {
        if self.store.source_file_for_url(&url).is_some() {
            return None;
        }
        self.contents.insert(url.clone(), content.into());
        let project: Weak<dyn Project> = self.self_weak.clone();
        let file = SourceFile::new(project, self.id.clone(), url, content_type);
        self.store
            .add_source_file(Arc::clone(&file))
            .then_some(file)
    }

    /// Drop the artifact and its content. Silent no-op when absent.
    pub fn remove_file(&self, url: &Url) {
        self.contents.remove(url);
        self.store.remove_source_file(url);
    }
}

#[async_trait]
impl Project for MemoryProject {
    fn id(&self) -> &ProjectId {
        &self.id
    }

    fn project_type(&self) -> ProjectType {
        self.project_type
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }

    fn store(&self) -> &ProjectStore {
        &self.store
    }

    async fn request_file_content(&self, file: &SourceFile) -> Result<FileContent, ProjectError> {
        self.contents
            .get(&file.url())
            .map(|entry| FileContent::plain(Arc::clone(entry.value())))
            .ok_or_else(|| ProjectError::FileNotFound(file.url()))
    }

    async fn request_metadata(&self, _file: &SourceFile) -> Option<FileMetadata> {
        // nothing meaningful to report for purely in-memory artifacts
        None
    }

    fn mime_type(&self, file: &SourceFile) -> String {
        file.content_type().default_mime_type().to_owned()
    }

    fn full_display_name(&self, file: &SourceFile) -> String {
        format!("{}/{}", self.display_name, file.name())
    }

    fn can_set_file_content(&self) -> bool {
        self.writable
    }

    async fn set_file_content(
        &self,
        file: &SourceFile,
        content: &str,
    ) -> Result<(), ProjectError> {
        if !self.writable {
            return Err(ProjectError::Unsupported(self.project_type));
        }
        self.contents.insert(file.url(), Arc::from(content));
        Ok(())
    }

    async fn search_in_file_content(
        &self,
        file: &SourceFile,
        query: &str,
        case_sensitive: bool,
        is_regex: bool,
    ) -> Vec<SearchMatch> {
        let Some(content) = self.contents.get(&file.url()).map(|entry| Arc::clone(entry.value()))
        else {
            return Vec::new();
        };
        search_in_content(&content, query, case_sensitive, is_regex)
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
