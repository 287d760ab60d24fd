//! Directory-tree compliance checks for fitpath-fs.
//!
//! The pure per-path checks live in `fitpath_core::validate`; this module is
//! the half that walks a real directory and evaluates every file's full path
//! against one policy.

use std::path::Path;

use serde::Serialize;
use walkdir::WalkDir;

use fitpath_core::policy::Policy;
use fitpath_core::validate::check_path;

use crate::errors::{RenameError, RenameResult};

/// One non-compliant file.
#[derive(Debug, Clone, Serialize)]
pub struct InvalidPath {
    pub path: String,
    pub length: usize,
    pub overage: usize,
}

/// Whole-tree evaluation result.
#[derive(Debug, Clone, Serialize)]
pub struct TreeReport {
    pub valid: bool,
    pub total_count: usize,
    pub invalid: Vec<InvalidPath>,
    pub longest_path: Option<InvalidPath>,
    /// Fraction of files whose full path fits the budget, 1.0 for an empty
    /// tree.
    pub compliance_rate: f64,
}

/// Walk `root` and check every file's full path.
///
/// Paths are measured relative to `root`'s parent, so the folder name itself
/// counts against the budget the same way the planner counts it.
pub fn check_tree(root: &Path, policy: &Policy) -> RenameResult<TreeReport> {
    let base = root.parent().unwrap_or(root);

    let mut total_count = 0usize;
    let mut invalid = Vec::new();
    let mut longest_path: Option<InvalidPath> = None;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                return Err(RenameError::preflight(
                    "walk tree",
                    path,
                    std::io::Error::other(e),
                ));
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry.path().strip_prefix(base).unwrap_or(entry.path());
        let rel = rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/");

        let check = check_path(&rel, policy);
        total_count += 1;

        if longest_path
            .as_ref()
            .map(|l| check.length > l.length)
            .unwrap_or(true)
        {
            longest_path = Some(InvalidPath {
                path: rel.clone(),
                length: check.length,
                overage: check.overage,
            });
        }

        if check.overage > 0 {
            invalid.push(InvalidPath {
                path: rel,
                length: check.length,
                overage: check.overage,
            });
        }
    }

    let compliance_rate = if total_count == 0 {
        1.0
    } else {
        (total_count - invalid.len()) as f64 / total_count as f64
    };

    Ok(TreeReport {
        valid: invalid.is_empty(),
        total_count,
        invalid,
        longest_path,
        compliance_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn mixed_tree_reports_rate_and_longest() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("Lib");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("ok.m4b"), b"x").unwrap();
        fs::write(
            folder.join("a very long file name that is over budget.m4b"),
            b"x",
        )
        .unwrap();

        let mut policy = Policy::default();
        policy.max_full_path = 20;

        let report = check_tree(&folder, &policy).unwrap();

        assert!(!report.valid);
        assert_eq!(report.total_count, 2);
        assert_eq!(report.invalid.len(), 1);
        assert!(report.invalid[0].path.starts_with("Lib/"));
        assert!((report.compliance_rate - 0.5).abs() < f64::EPSILON);
        assert!(report.longest_path.unwrap().length > 20);
    }

    #[test]
    fn empty_tree_is_fully_compliant() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("Empty");
        fs::create_dir(&folder).unwrap();

        let report = check_tree(&folder, &Policy::default()).unwrap();
        assert!(report.valid);
        assert_eq!(report.total_count, 0);
        assert!((report.compliance_rate - 1.0).abs() < f64::EPSILON);
        assert!(report.longest_path.is_none());
    }

    #[test]
    fn nested_files_count_the_whole_relative_path() {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("Lib");
        fs::create_dir_all(folder.join("Deep")).unwrap();
        fs::write(folder.join("Deep").join("f.m4b"), b"x").unwrap();

        let report = check_tree(&folder, &Policy::default()).unwrap();
        assert_eq!(report.total_count, 1);
        assert_eq!(report.longest_path.unwrap().path, "Lib/Deep/f.m4b");
    }
}
