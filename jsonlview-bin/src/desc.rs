use crate::cli::Args;
use jsonlview_render::{Painter, TimeShift};
use jsonlview_tracker::{DiscoveryDesc, TrackerDesc, default_projects_root};
use std::path::PathBuf;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Everything the presentation loops need, resolved once from the command line.
#[derive(Debug, Clone)]
pub struct ViewerDesc {
    pub page_size: usize,
    pub painter: Painter,
    pub tracker: TrackerDesc,
    pub discovery: DiscoveryDesc,
    pub projects_root: Option<PathBuf>,
}

impl ViewerDesc {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            painter: Painter::default(),
            tracker: TrackerDesc::new(),
            discovery: DiscoveryDesc::new(),
            projects_root: default_projects_root(),
        }
    }

    pub fn from_args(args: &Args) -> Self {
        let mut desc = Self::new();
        desc.painter = Painter::new(!args.no_color, TimeShift::hours(args.utc_offset));
        desc.tracker.follow_newest = args.follow_newest;
        desc.tracker.extension = desc.discovery.extension.clone();
        if let Some(dir) = &args.projects_dir {
            desc.projects_root = Some(dir.clone());
        }
        desc
    }
}

impl Default for ViewerDesc {
    fn default() -> Self {
        Self::new()
    }
}
