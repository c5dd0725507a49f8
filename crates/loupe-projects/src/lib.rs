//! Concrete project variants for the `loupe-workspace` registry.
//!
//! [`MemoryProject`] serves producers whose artifact content arrives
//! in hand (debugger, formatter, network, content scripts, service);
//! [`FileSystemProject`] mirrors a directory on disk with discovery,
//! lazy reads, and optional change watching.

mod fs;
mod memory;
mod paths;
mod search;
mod walk;
mod watcher;

pub use fs::FileSystemProject;
pub use memory::MemoryProject;
pub use paths::path_to_url;
pub use paths::url_to_path;
pub use walk::WalkOptions;
pub use watcher::FsWatcher;
pub use watcher::WatchEvent;
