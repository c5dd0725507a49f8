//! The polymorphic project contract.
//!
//! A project is a named, typed source of artifacts: a debugger backend,
//! a network loader, a directory on disk. Each variant owns a
//! [`ProjectStore`] holding its registered [`SourceFile`]s and decides
//! which mutating capabilities it supports. Callers consult the
//! capability predicates (`can_rename`, `can_set_file_content`, ...)
//! before invoking the corresponding mutator; invoking a mutator the
//! variant does not support is inert, not an error.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::source_file::SourceFile;
use crate::store::ProjectStore;

/// Identifier of a project, unique within the owning [`Workspace`].
///
/// [`Workspace`]: crate::Workspace
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        ProjectId(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        ProjectId::new(id)
    }
}

/// The six project variants.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ProjectType {
    Debugger,
    Formatter,
    Network,
    FileSystem,
    ContentScripts,
    Service,
}

/// Content of an artifact as returned by its owning project.
///
/// `is_encoded` marks base64-transported payloads (binary artifacts);
/// plain text content leaves it `false`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileContent {
    pub text: Arc<str>,
    pub is_encoded: bool,
}

impl FileContent {
    pub fn plain(text: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            is_encoded: false,
        }
    }

    pub fn base64(data: impl Into<Arc<str>>) -> Self {
        Self {
            text: data.into(),
            is_encoded: true,
        }
    }
}

/// Filesystem-ish metadata for an artifact. Variants that have no
/// notion of timestamps or sizes report `None` fields or no metadata
/// at all.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FileMetadata {
    pub modified: Option<SystemTime>,
    pub size: Option<u64>,
}

/// One matching line from a content search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchMatch {
    /// 1-based line number.
    pub line_number: usize,
    pub line_content: String,
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("no source file at {0}")]
    FileNotFound(Url),
    #[error("{0} cannot be mapped to a local path")]
    InvalidPath(Url),
    #[error("owning project was dropped while the request was in flight")]
    ProjectDropped,
    #[error("{0:?} projects do not support this operation")]
    Unsupported(ProjectType),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A named, typed source of [`SourceFile`]s.
///
/// Rust has no base classes, so the shared bookkeeping the variants
/// would inherit lives in [`ProjectStore`], which every implementor
/// owns and exposes through [`store`](Project::store). The defaulted
/// trait methods are the inherited behavior: registry access delegates
/// to the store, capability predicates answer `false`, and the
/// capability mutators do nothing until a variant overrides them.
#[async_trait]
pub trait Project: Send + Sync {
    fn id(&self) -> &ProjectId;

    fn project_type(&self) -> ProjectType;

    fn display_name(&self) -> String;

    /// The registry bookkeeping this project owns.
    fn store(&self) -> &ProjectStore;

    /// Service projects hold internal artifacts (formatter output,
    /// injected scripts) that general-purpose consumers skip.
    fn is_service_project(&self) -> bool {
        matches!(
            self.project_type(),
            ProjectType::Service | ProjectType::Formatter
        )
    }

    /// Fetch the artifact's content. Never called eagerly by the
    /// registry; consumers go through [`SourceFile::request_content`].
    async fn request_file_content(&self, file: &SourceFile) -> Result<FileContent, ProjectError>;

    /// Fetch the artifact's metadata, if the variant has any.
    async fn request_metadata(&self, file: &SourceFile) -> Option<FileMetadata>;

    fn mime_type(&self, file: &SourceFile) -> String;

    fn full_display_name(&self, file: &SourceFile) -> String;

    fn can_set_file_content(&self) -> bool {
        false
    }

    async fn set_file_content(&self, file: &SourceFile, content: &str)
        -> Result<(), ProjectError>;

    fn can_rename(&self) -> bool {
        false
    }

    /// Rename the artifact in the backing source, then re-key it in the
    /// store. Inert unless the variant supports renaming; returns the
    /// new URL when the rename was performed.
    async fn rename(
        &self,
        file: &Arc<SourceFile>,
        new_name: &str,
    ) -> Result<Option<Url>, ProjectError> {
        let _ = (file, new_name);
        Ok(None)
    }

    fn can_create_file(&self) -> bool {
        false
    }

    /// Create a new artifact in the backing source and register it.
    /// Inert unless the variant supports creation.
    async fn create_file(
        &self,
        name: &str,
        content: &str,
    ) -> Result<Option<Arc<SourceFile>>, ProjectError> {
        let _ = (name, content);
        Ok(None)
    }

    fn can_exclude_folder(&self) -> bool {
        false
    }

    /// Stop tracking everything under the given folder. Inert unless
    /// the variant supports exclusion.
    fn exclude_folder(&self, folder_url: &Url) {
        let _ = folder_url;
    }

    /// Remove the artifact from the backing source and deregister it.
    /// Inert unless the variant supports deletion.
    async fn delete_file(&self, file: &SourceFile) {
        let _ = file;
    }

    /// Tear down the project's external resources. Inert by default;
    /// deregistration itself goes through [`ProjectStore::remove_project`].
    fn remove(&self) {}

    /// Prepare this project's artifacts for content search, returning
    /// how many are indexable. Variants without an indexable backing
    /// source report zero.
    async fn index_content(&self) -> usize {
        0
    }

    async fn search_in_file_content(
        &self,
        file: &SourceFile,
        query: &str,
        case_sensitive: bool,
        is_regex: bool,
    ) -> Vec<SearchMatch>;

    /// URLs of artifacts whose identity matches the query.
    fn find_files_matching(&self, query: &str) -> Vec<Url>;

    fn source_file_for_url(&self, url: &Url) -> Option<Arc<SourceFile>> {
        self.store().source_file_for_url(url)
    }

    fn source_files(&self) -> Vec<Arc<SourceFile>> {
        self.store().source_files()
    }
}
