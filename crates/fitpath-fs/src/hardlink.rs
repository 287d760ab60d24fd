//! Hard-link discovery for fitpath-fs.
//!
//! Renaming a directory entry must never change how many names point at the
//! underlying file. Before a batch runs, every file to be renamed is stat'd;
//! files with more than one link get their identity recorded so the batch can
//! be re-verified afterwards.
//!
//! The sibling search is best-effort and bounded by both wall clock and a
//! directory cap: it feeds the post-rename verification report, while the
//! cross-device guard and the post-rename stat checks are the actual safety
//! net.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

/// Device/inode identity of one file, plus its link count at stat time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkIdentity {
    pub device: u64,
    pub inode: u64,
    pub link_count: u64,
}

impl LinkIdentity {
    pub fn is_hard_linked(&self) -> bool {
        self.link_count > 1
    }
}

/// Stat a path and extract its link identity.
#[cfg(unix)]
pub fn link_identity(path: &Path) -> io::Result<LinkIdentity> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::symlink_metadata(path)?;
    Ok(LinkIdentity {
        device: meta.dev(),
        inode: meta.ino(),
        link_count: meta.nlink(),
    })
}

/// On platforms without inode semantics every file reports a single link,
/// which disables the hard-link machinery without disabling renames.
#[cfg(not(unix))]
pub fn link_identity(path: &Path) -> io::Result<LinkIdentity> {
    std::fs::symlink_metadata(path)?;
    Ok(LinkIdentity {
        device: 0,
        inode: 0,
        link_count: 1,
    })
}

/// Bounds for the best-effort sibling search.
#[derive(Debug, Clone, Copy)]
pub struct LinkSearchLimits {
    pub time_budget: Duration,
    pub max_dirs: usize,
}

impl Default for LinkSearchLimits {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(2),
            max_dirs: 512,
        }
    }
}

/// All known directory entries sharing one inode.
#[derive(Debug, Clone, Serialize)]
pub struct HardLinkGroup {
    pub identity: LinkIdentity,
    pub paths: BTreeSet<PathBuf>,
    /// True when the search ended because a bound was hit, meaning `paths`
    /// may be incomplete.
    pub truncated: bool,
}

/// Enumerate paths under `root` sharing `identity`'s inode.
///
/// Stops early once `identity.link_count` paths are found, or when either
/// search bound is exhausted; whatever was found so far is returned.
pub fn find_link_siblings(
    root: &Path,
    identity: LinkIdentity,
    limits: &LinkSearchLimits,
) -> HardLinkGroup {
    let started = Instant::now();
    let mut paths = BTreeSet::new();
    let mut dirs_seen = 0usize;
    let mut truncated = false;

    for entry in WalkDir::new(root).follow_links(false) {
        let Ok(entry) = entry else { continue };

        if entry.file_type().is_dir() {
            dirs_seen += 1;
            if dirs_seen > limits.max_dirs {
                truncated = true;
                break;
            }
            continue;
        }

        if started.elapsed() > limits.time_budget {
            truncated = true;
            break;
        }

        if let Ok(id) = link_identity(entry.path()) {
            if id.device == identity.device && id.inode == identity.inode {
                paths.insert(entry.path().to_path_buf());
                if paths.len() as u64 >= identity.link_count {
                    break;
                }
            }
        }
    }

    debug!(
        inode = identity.inode,
        found = paths.len(),
        truncated,
        "hard-link sibling search finished"
    );

    HardLinkGroup {
        identity,
        paths,
        truncated,
    }
}
