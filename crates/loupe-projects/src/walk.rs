//! Artifact discovery for filesystem projects.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use ignore::WalkBuilder;
use loupe_conf::Settings;

/// Options controlling directory traversal during discovery.
#[derive(Clone, Debug)]
pub struct WalkOptions {
    /// Include hidden files and directories (those starting with `.`).
    pub include_hidden: bool,
    /// Follow symbolic links.
    pub follow_links: bool,
    /// Honor `.gitignore`, `.ignore` and friends.
    pub respect_ignore_files: bool,
    /// Maximum directory recursion depth. `None` means unlimited.
    pub max_depth: Option<usize>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            follow_links: false,
            respect_ignore_files: true,
            max_depth: None,
        }
    }
}

impl From<&Settings> for WalkOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            include_hidden: settings.include_hidden,
            follow_links: settings.follow_links,
            respect_ignore_files: settings.respect_ignore_files,
            max_depth: None,
        }
    }
}

/// Walk `root` and collect every file that is not under an excluded
/// folder. Exclusions may be absolute or relative to `root`.
///
/// Returns a sorted list of absolute UTF-8 paths; non-UTF-8 paths are
/// skipped.
#[must_use]
pub fn walk_root(
    root: &Utf8Path,
    excluded: &[Utf8PathBuf],
    options: &WalkOptions,
) -> Vec<Utf8PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut builder = WalkBuilder::new(root.as_std_path());
    // standard_filters first, it sets hidden, gitignore, etc.; the
    // individual overrides come after.
    builder
        .standard_filters(options.respect_ignore_files)
        .hidden(!options.include_hidden)
        .follow_links(options.follow_links);

    if let Some(depth) = options.max_depth {
        builder.max_depth(Some(depth));
    }

    if !excluded.is_empty() {
        let excluded: Vec<std::path::PathBuf> = excluded
            .iter()
            .map(|folder| {
                if folder.is_absolute() {
                    folder.clone().into_std_path_buf()
                } else {
                    root.join(folder).into_std_path_buf()
                }
            })
            .collect();
        builder.filter_entry(move |entry| {
            !excluded.iter().any(|folder| entry.path().starts_with(folder))
        });
    }

    let mut files = Vec::new();
    for entry in builder.build().filter_map(Result::ok) {
        if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
            continue;
        }
        let Some(utf8) = Utf8Path::from_path(entry.path()) else {
            continue;
        };
        files.push(utf8.to_owned());
    }

    files.sort();
    files
}
