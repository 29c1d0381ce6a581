use crate::desc::ViewerDesc;
use anyhow::{Context, Result, bail};
use jsonlview_tracker::{FileTracker, find_latest_file, find_project_dir};
use memmap2::MmapOptions;
use std::{
    fs::File,
    path::{Path, PathBuf},
};

/// Picks the file the pager shows.
///
/// A file is used as is, a directory yields its newest file, and no argument
/// at all falls back to the newest file of the most recent project.
pub fn resolve_static(logfile: Option<&Path>, desc: &ViewerDesc) -> Result<PathBuf> {
    match logfile {
        Some(path) if path.is_dir() => find_latest_file(path),
        Some(path) => {
            if !path.exists() {
                bail!("Log file {} does not exist.", path.display());
            }
            Ok(path.to_path_buf())
        }
        None => find_latest_file(&project_dir(desc)?),
    }
}

/// Builds the tracker for follow mode.
///
/// `directory` only matters when no logfile is given; it replaces the
/// auto-discovered project directory.
pub fn resolve_follow(
    logfile: Option<&Path>,
    directory: Option<&Path>,
    desc: &ViewerDesc,
) -> Result<FileTracker> {
    match logfile {
        Some(path) if path.is_dir() => {
            FileTracker::discover(path.to_path_buf(), desc.tracker.clone())
        }
        Some(path) => {
            if directory.is_some() {
                log::debug!("resolve_follow: --directory ignored, logfile given");
            }
            if !path.exists() {
                bail!("Log file {} does not exist.", path.display());
            }
            FileTracker::open(path, None, desc.tracker.clone())
        }
        None => {
            let dir = match directory {
                Some(dir) => {
                    if !dir.is_dir() {
                        bail!("Directory {} does not exist.", dir.display());
                    }
                    dir.to_path_buf()
                }
                None => project_dir(desc)?,
            };
            FileTracker::discover(dir, desc.tracker.clone())
        }
    }
}

fn project_dir(desc: &ViewerDesc) -> Result<PathBuf> {
    let root = desc
        .projects_root
        .as_deref()
        .context("Cannot determine home directory. Please specify a path.")?;
    find_project_dir(root, &desc.discovery).with_context(|| {
        format!(
            "Cannot find a project directory under {}. Please specify a path.",
            root.display()
        )
    })
}

/// Reads the whole file into lines. Invalid UTF-8 is replaced, not rejected.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("Error opening file: {}", path.display()))?;
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(Vec::new());
    }

    // SAFETY: the map is read once and dropped before returning. If another
    // process truncates the file while it is mapped, reading the cut pages
    // raises SIGBUS.
    let mmap = unsafe { MmapOptions::new().len(len as usize).map(&file)? };
    let text = String::from_utf8_lossy(&mmap);

    Ok(text.lines().map(str::to_string).collect())
}
