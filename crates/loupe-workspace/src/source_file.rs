//! The source artifact entity.

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;

use url::Url;

use crate::events::WorkspaceEvent;
use crate::project::FileContent;
use crate::project::FileMetadata;
use crate::project::Project;
use crate::project::ProjectError;
use crate::project::ProjectId;
use crate::urls;

/// Classification of an artifact, used to route it to the right
/// consumers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ContentType {
    Script,
    Stylesheet,
    Document,
    Image,
    Font,
    Other,
}

impl ContentType {
    /// Classify by file extension (lowercase, without the dot).
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        match extension {
            "js" | "mjs" | "cjs" | "ts" | "jsx" | "tsx" => Self::Script,
            "css" => Self::Stylesheet,
            "html" | "htm" | "xhtml" => Self::Document,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "ico" => Self::Image,
            "woff" | "woff2" | "ttf" | "otf" => Self::Font,
            _ => Self::Other,
        }
    }

    /// Fallback mime type when the owning project has nothing better.
    #[must_use]
    pub fn default_mime_type(self) -> &'static str {
        match self {
            Self::Script => "text/javascript",
            Self::Stylesheet => "text/css",
            Self::Document => "text/html",
            Self::Image => "image/png",
            Self::Font => "font/woff2",
            Self::Other => "text/plain",
        }
    }

    /// Whether content of this type is transported as plain text.
    #[must_use]
    pub fn is_textual(self) -> bool {
        !matches!(self, Self::Image | Self::Font)
    }
}

#[derive(Default)]
struct WorkingCopy {
    text: Option<Arc<str>>,
    dirty: bool,
}

/// One named, typed artifact owned by exactly one project.
///
/// The entity carries identity and routing only; content and metadata
/// are fetched on demand through the owning project. Renaming swaps
/// the URL on the same instance, so `Arc<SourceFile>` handles held by
/// consumers stay valid across renames.
pub struct SourceFile {
    self_weak: Weak<SourceFile>,
    project: Weak<dyn Project>,
    project_id: ProjectId,
    content_type: ContentType,
    url: Mutex<Url>,
    working_copy: Mutex<WorkingCopy>,
}

impl SourceFile {
    pub fn new(
        project: Weak<dyn Project>,
        project_id: ProjectId,
        url: Url,
        content_type: ContentType,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            self_weak: self_weak.clone(),
            project,
            project_id,
            content_type,
            url: Mutex::new(url),
            working_copy: Mutex::new(WorkingCopy::default()),
        })
    }

    #[must_use]
    pub fn url(&self) -> Url {
        self.url.lock().expect("url lock poisoned").clone()
    }

    /// Decoded display name: the last path segment of the URL.
    #[must_use]
    pub fn name(&self) -> String {
        urls::display_name(&self.url())
    }

    #[must_use]
    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Non-owning back-reference to the owning project. `None` once the
    /// project has been dropped.
    #[must_use]
    pub fn project(&self) -> Option<Arc<dyn Project>> {
        self.project.upgrade()
    }

    pub async fn request_content(&self) -> Result<FileContent, ProjectError> {
        let project = self.project().ok_or(ProjectError::ProjectDropped)?;
        project.request_file_content(self).await
    }

    pub async fn request_metadata(&self) -> Option<FileMetadata> {
        let project = self.project()?;
        project.request_metadata(self).await
    }

    #[must_use]
    pub fn mime_type(&self) -> String {
        match self.project() {
            Some(project) => project.mime_type(self),
            None => self.content_type.default_mime_type().to_owned(),
        }
    }

    #[must_use]
    pub fn full_display_name(&self) -> String {
        match self.project() {
            Some(project) => project.full_display_name(self),
            None => self.name(),
        }
    }

    /// Current editor-side copy of the content, if one was set.
    #[must_use]
    pub fn working_copy(&self) -> Option<Arc<str>> {
        self.working_copy
            .lock()
            .expect("working copy lock poisoned")
            .text
            .clone()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.working_copy
            .lock()
            .expect("working copy lock poisoned")
            .dirty
    }

    /// Replace the working copy and mark the artifact dirty. Fires
    /// [`WorkspaceEvent::WorkingCopyChanged`].
    pub fn set_working_copy(&self, text: impl Into<Arc<str>>) {
        {
            let mut working_copy = self.working_copy.lock().expect("working copy lock poisoned");
            working_copy.text = Some(text.into());
            working_copy.dirty = true;
        }
        if let Some(me) = self.self_weak.upgrade() {
            self.dispatch(WorkspaceEvent::WorkingCopyChanged(me));
        }
    }

    /// Discard the working copy. Fires
    /// [`WorkspaceEvent::WorkingCopyChanged`] when there was one.
    pub fn reset_working_copy(&self) {
        let had_copy = {
            let mut working_copy = self.working_copy.lock().expect("working copy lock poisoned");
            let had_copy = working_copy.text.take().is_some();
            working_copy.dirty = false;
            had_copy
        };
        if had_copy {
            if let Some(me) = self.self_weak.upgrade() {
                self.dispatch(WorkspaceEvent::WorkingCopyChanged(me));
            }
        }
    }

    /// Commit the working copy back through the owning project when it
    /// accepts content writes, then clear the dirty flag. No-op when
    /// there is nothing to commit. Fires
    /// [`WorkspaceEvent::WorkingCopyCommitted`].
    pub async fn commit_working_copy(&self) -> Result<(), ProjectError> {
        self.commit_inner(false).await
    }

    /// Same as [`commit_working_copy`](Self::commit_working_copy), but
    /// additionally fires
    /// [`WorkspaceEvent::WorkingCopyCommittedByUser`] so consumers can
    /// distinguish explicit saves from programmatic ones.
    pub async fn commit_working_copy_by_user(&self) -> Result<(), ProjectError> {
        self.commit_inner(true).await
    }

    async fn commit_inner(&self, by_user: bool) -> Result<(), ProjectError> {
        let Some(content) = self.working_copy() else {
            return Ok(());
        };
        if let Some(project) = self.project() {
            if project.can_set_file_content() {
                project.set_file_content(self, &content).await?;
            }
        }
        self.working_copy
            .lock()
            .expect("working copy lock poisoned")
            .dirty = false;
        let Some(me) = self.self_weak.upgrade() else {
            return Ok(());
        };
        self.dispatch(WorkspaceEvent::WorkingCopyCommitted {
            file: Arc::clone(&me),
            content: Arc::clone(&content),
        });
        if by_user {
            self.dispatch(WorkspaceEvent::WorkingCopyCommittedByUser { file: me, content });
        }
        Ok(())
    }

    pub(crate) fn set_url(&self, url: Url) {
        *self.url.lock().expect("url lock poisoned") = url;
    }

    fn dispatch(&self, event: WorkspaceEvent) {
        let Some(project) = self.project() else {
            return;
        };
        let Some(workspace) = project.store().workspace() else {
            return;
        };
        workspace.dispatch(&event);
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("url", &self.url().as_str())
            .field("project_id", &self.project_id)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
