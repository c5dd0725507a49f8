//! In-memory project stub shared by this crate's tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;

use async_trait::async_trait;
use url::Url;

use crate::project::FileContent;
use crate::project::FileMetadata;
use crate::project::Project;
use crate::project::ProjectError;
use crate::project::ProjectId;
use crate::project::ProjectType;
use crate::project::SearchMatch;
use crate::source_file::ContentType;
use crate::source_file::SourceFile;
use crate::store::ProjectStore;
use crate::workspace::Workspace;

pub(crate) struct StubProject {
    self_weak: Weak<StubProject>,
    id: ProjectId,
    project_type: ProjectType,
    writable: bool,
    store: ProjectStore,
    contents: Mutex<HashMap<Url, Arc<str>>>,
}

impl StubProject {
    pub(crate) fn new(
        workspace: &Arc<Workspace>,
        id: &str,
        project_type: ProjectType,
    ) -> Arc<Self> {
        Self::build(workspace, id, project_type, false)
    }

    pub(crate) fn writable(
        workspace: &Arc<Workspace>,
        id: &str,
        project_type: ProjectType,
    ) -> Arc<Self> {
        Self::build(workspace, id, project_type, true)
    }

    fn build(
        workspace: &Arc<Workspace>,
        id: &str,
        project_type: ProjectType,
        writable: bool,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            self_weak: self_weak.clone(),
            id: ProjectId::new(id),
            project_type,
            writable,
            store: ProjectStore::new(workspace, ProjectId::new(id)),
            contents: Mutex::new(HashMap::new()),
        })
    }

    /// Create an entity owned by this project without registering it;
    /// tests drive `store().add_source_file` themselves.
    pub(crate) fn make_file(&self, url: &str, content: &str) -> Arc<SourceFile> {
        let parsed = Url::parse(url).expect("test URL must parse");
        let content_type = parsed
            .path()
            .rsplit_once('.')
            .map_or(ContentType::Other, |(_, ext)| {
                ContentType::from_extension(ext)
            });
        self.contents
            .lock()
            .expect("stub contents lock poisoned")
            .insert(parsed.clone(), Arc::from(content));
        let project: Weak<dyn Project> = self.self_weak.clone();
        SourceFile::new(project, self.id.clone(), parsed, content_type)
    }

    pub(crate) fn stored_content(&self, url: &Url) -> Option<String> {
        self.contents
            .lock()
            .expect("stub contents lock poisoned")
            .get(url)
            .map(|text| text.to_string())
    }
}

#[async_trait]
impl Project for StubProject {
    fn id(&self) -> &ProjectId {
        &self.id
    }

    fn project_type(&self) -> ProjectType {
        self.project_type
    }

    fn display_name(&self) -> String {
        self.id.to_string()
    }

    fn store(&self) -> &ProjectStore {
        &self.store
    }

    async fn request_file_content(&self, file: &SourceFile) -> Result<FileContent, ProjectError> {
        self.contents
            .lock()
            .expect("stub contents lock poisoned")
            .get(&file.url())
            .map(|text| FileContent::plain(Arc::clone(text)))
            .ok_or_else(|| ProjectError::FileNotFound(file.url()))
    }

    async fn request_metadata(&self, _file: &SourceFile) -> Option<FileMetadata> {
        None
    }

    fn mime_type(&self, file: &SourceFile) -> String {
        file.content_type().default_mime_type().to_owned()
    }

    fn full_display_name(&self, file: &SourceFile) -> String {
        format!("{}/{}", self.display_name(), file.name())
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
        self.contents
            .lock()
            .expect("stub contents lock poisoned")
            .insert(file.url(), Arc::from(content));
        Ok(())
    }

    async fn search_in_file_content(
        &self,
        file: &SourceFile,
        query: &str,
        case_sensitive: bool,
        _is_regex: bool,
    ) -> Vec<SearchMatch> {
        let Ok(content) = self.request_file_content(file).await else {
            return Vec::new();
        };
        let needle = if case_sensitive {
            query.to_owned()
        } else {
            query.to_lowercase()
        };
        content
            .text
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                if case_sensitive {
                    line.contains(&needle)
                } else {
                    line.to_lowercase().contains(&needle)
                }
            })
            .map(|(index, line)| SearchMatch {
                line_number: index + 1,
                line_content: line.to_owned(),
            })
            .collect()
    }

    fn find_files_matching(&self, query: &str) -> Vec<Url> {
        self.store
            .source_files()
            .iter()
            .map(|file| file.url())
            .filter(|url| url.as_str().contains(query))
            .collect()
    }
}
