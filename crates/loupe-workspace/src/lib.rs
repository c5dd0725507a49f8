//! In-memory registry of source artifacts aggregated from pluggable
//! projects.
//!
//! A [`Workspace`] owns a set of [`Project`]s; each project owns a
//! [`ProjectStore`] of [`SourceFile`] entities keyed by URL. Registry
//! mutations fire [`WorkspaceEvent`]s synchronously, in listener
//! registration order; artifact content and metadata are fetched
//! lazily through the owning project. Concrete project variants live
//! in `loupe-projects`.

mod events;
mod project;
mod source_file;
mod store;
#[cfg(test)]
pub(crate) mod testing;
mod urls;
mod workspace;

pub use events::ListenerId;
pub use events::Subscription;
pub use events::WorkspaceEvent;
pub use project::FileContent;
pub use project::FileMetadata;
pub use project::Project;
pub use project::ProjectError;
pub use project::ProjectId;
pub use project::ProjectType;
pub use project::SearchMatch;
pub use source_file::ContentType;
pub use source_file::SourceFile;
pub use store::ProjectStore;
pub use urls::display_name;
pub use urls::rename_url;
pub use workspace::Workspace;
