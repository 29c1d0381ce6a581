// jsonlview-tracker - log file discovery and rotation-aware tailing
//
// Discovery answers "which file", the tracker answers "what is new in it"
// and notices when the path starts pointing at a different file.

pub mod file_finder;
pub mod metadata;
mod tracker;

pub use file_finder::{
    DiscoveryDesc, default_projects_root, find_latest_file, find_latest_matching,
    find_project_dir,
};
pub use tracker::{FileTracker, TrackerDesc, TrackerEvent};
