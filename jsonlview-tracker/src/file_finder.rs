use anyhow::{Result, bail};
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

pub const DEFAULT_EXTENSION: &str = "jsonl";
pub const DEFAULT_CONVENTIONAL_SUBDIR: &str = "chats";
pub const DEFAULT_PROJECTS_SUBPATH: &str = ".qwen/projects";

/// How auto-discovery recognizes log files inside a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryDesc {
    pub extension: String,
    pub conventional_subdir: String,
}

impl DiscoveryDesc {
    pub fn new() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            conventional_subdir: DEFAULT_CONVENTIONAL_SUBDIR.to_string(),
        }
    }
}

impl Default for DiscoveryDesc {
    fn default() -> Self {
        Self::new()
    }
}

/// `~/.qwen/projects`, if a home directory is known
pub fn default_projects_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_PROJECTS_SUBPATH))
}

/// Newest regular file anywhere under `dir`, whatever its name.
pub fn find_latest_file(dir: &Path) -> Result<PathBuf> {
    let mut files = Vec::new();
    collect_files(dir, &|_| true, &mut files);

    match newest(files) {
        Some((path, _)) => {
            log::debug!("find_latest_file: picked {}", path.display());
            Ok(path)
        }
        None => bail!("No files found in directory: {}", dir.display()),
    }
}

/// Newest file with the given extension anywhere under `dir`.
pub fn find_latest_matching(dir: &Path, extension: &str) -> Option<PathBuf> {
    latest_matching_with_time(dir, extension).map(|(path, _)| path)
}

/// Picks the project subdirectory most likely to hold the current logs.
///
/// Every direct child of `projects_root` is a candidate through its
/// conventional subfolder when that subfolder holds matching files, or through
/// itself when it holds matching files directly. The candidate owning the most
/// recently modified matching file wins.
pub fn find_project_dir(projects_root: &Path, desc: &DiscoveryDesc) -> Option<PathBuf> {
    let entries = match fs::read_dir(projects_root) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!(
                "find_project_dir: cannot read {}: {}",
                projects_root.display(),
                e
            );
            return None;
        }
    };

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let conventional = path.join(&desc.conventional_subdir);
        if conventional.is_dir() && has_matching_child(&conventional, &desc.extension) {
            candidates.push(conventional);
        } else if has_matching_child(&path, &desc.extension) {
            candidates.push(path);
        }
    }

    let mut best: Option<(PathBuf, SystemTime)> = None;
    for candidate in candidates {
        if let Some((_, modified)) = latest_matching_with_time(&candidate, &desc.extension) {
            let is_newer = best.as_ref().is_none_or(|(_, best_time)| modified > *best_time);
            if is_newer {
                best = Some((candidate, modified));
            }
        }
    }

    if let Some((dir, _)) = &best {
        log::debug!("find_project_dir: picked {}", dir.display());
    }
    best.map(|(dir, _)| dir)
}

fn latest_matching_with_time(dir: &Path, extension: &str) -> Option<(PathBuf, SystemTime)> {
    let mut files = Vec::new();
    collect_files(dir, &|path| has_extension(path, extension), &mut files);
    newest(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext == extension)
}

fn has_matching_child(dir: &Path, extension: &str) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|entry| entry.path().is_file() && has_extension(&entry.path(), extension))
        })
        .unwrap_or(false)
}

/// Recursively collect files accepted by `filter`, with their modification time.
/// Symlinked directories are not descended into.
fn collect_files(
    dir: &Path,
    filter: &dyn Fn(&Path) -> bool,
    files: &mut Vec<(PathBuf, SystemTime)>,
) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            collect_files(&path, filter, files);
        } else if path.is_file() && filter(&path) {
            // get modification time for each file to find the latest one
            if let Ok(modified) = fs::metadata(&path).and_then(|m| m.modified()) {
                files.push((path, modified));
            }
        }
    }
}

fn newest(files: Vec<(PathBuf, SystemTime)>) -> Option<(PathBuf, SystemTime)> {
    files.into_iter().max_by_key(|(_, modified)| *modified)
}
