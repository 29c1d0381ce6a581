use std::{fs, io, path::Path, time::SystemTime};

/// Marker for "the file this path points at".
///
/// On unix this is the `(device, inode)` pair. Elsewhere the creation time
/// stands in for it, and the tracker's size-reset check covers files that are
/// rewritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    #[cfg(not(unix))]
    created: Option<SystemTime>,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn of(meta: &fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn of(meta: &fs::Metadata) -> Self {
        Self {
            created: meta.created().ok(),
        }
    }
}

/// snapshot of the bits of metadata the tracker compares between polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaSnap {
    pub identity: FileIdentity,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl MetaSnap {
    pub fn of(meta: &fs::Metadata) -> Self {
        Self {
            identity: FileIdentity::of(meta),
            len: meta.len(),
            modified: meta.modified().ok(),
        }
    }
}

pub fn stat_path(path: &Path) -> io::Result<MetaSnap> {
    let meta = fs::metadata(path)?;
    if !meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a regular file: {}", path.display()),
        ));
    }
    Ok(MetaSnap::of(&meta))
}
