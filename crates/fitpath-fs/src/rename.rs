//! Batch rename application for fitpath-fs.
//!
//! Turns a [`RenamePlan`] produced by the planner into real renames without
//! ever leaving the tree inconsistent or silently breaking a hard link:
//! - hard-link discovery and a cross-device guard run before anything moves
//! - the folder rename is a single overwrite-protected operation
//! - file renames go through a temporary sibling name (two phases), which
//!   also makes case-only renames and A/B swaps safe
//! - destination collisions with unrelated files get a numeric disambiguator
//! - formerly hard-linked files are re-stat'd afterwards and any change in
//!   inode or link count is reported as an integrity failure
//!
//! Partial failure is a documented behavior, not an exception: committed
//! renames are never rolled back, and the report lists exactly which renames
//! completed before the batch stopped.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use fitpath_core::plan::RenamePlan;

use crate::errors::{RenameError, RenameResult};
use crate::hardlink::{find_link_siblings, link_identity, HardLinkGroup, LinkIdentity, LinkSearchLimits};

/// Options for one batch application.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Run every read-only check and report what would happen, touching
    /// nothing on disk.
    pub dry_run: bool,
    pub link_search: LinkSearchLimits,
}

/// One committed (or, in dry-run mode, simulated) rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameRecord {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Io,
    LinkIntegrity,
}

/// A failure observed after the batch started committing.
#[derive(Debug, Clone, Serialize)]
pub struct FailureInfo {
    pub kind: FailureKind,
    pub step: String,
    pub path: String,
    pub message: String,
}

/// Outcome of one batch. `completed` only ever grows in commit order, so on
/// failure it is the exact list of renames that made it to disk.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyReport {
    pub ok: bool,
    pub dry_run: bool,
    pub folder: Option<RenameRecord>,
    pub completed: Vec<RenameRecord>,
    pub failures: Vec<FailureInfo>,
    /// Hard-link groups discovered before the batch ran (best-effort).
    pub link_groups: Vec<HardLinkGroup>,
}

struct PendingFile {
    from: String,
    to: String,
    temp: Option<PathBuf>,
    link: Option<LinkIdentity>,
}

/// Cross-device guard, kept pure so the refusal path is testable without a
/// second filesystem.
pub fn check_same_device(
    path: &Path,
    file_device: u64,
    dest_device: u64,
) -> RenameResult<()> {
    if file_device != dest_device {
        return Err(RenameError::CrossDeviceHardLink {
            path: path.to_path_buf(),
            file_device,
            dest_device,
        });
    }
    Ok(())
}

/// Apply one plan to the folder at `folder_path`.
///
/// `Err` means the batch was refused before anything moved. Once renames
/// start, problems are reported through the returned [`ApplyReport`].
pub fn apply_plan(
    folder_path: &Path,
    plan: &RenamePlan,
    opts: &ApplyOptions,
) -> RenameResult<ApplyReport> {
    let folder_meta = std::fs::metadata(folder_path)
        .map_err(|e| RenameError::preflight("stat folder", folder_path, e))?;
    if !folder_meta.is_dir() {
        return Err(RenameError::preflight(
            "stat folder",
            folder_path,
            std::io::Error::other("not a directory"),
        ));
    }
    let dest_device = link_identity(folder_path)
        .map_err(|e| RenameError::preflight("stat folder", folder_path, e))?
        .device;

    // Discovery: stat every file, record hard-link identities, and refuse
    // the whole batch if a hard-linked file would cross devices.
    let mut pending = Vec::with_capacity(plan.file_renames.len());
    let mut link_groups = Vec::new();
    let search_root = folder_path.parent().unwrap_or(folder_path).to_path_buf();

    for pair in &plan.file_renames {
        let old_path = folder_path.join(&pair.from);
        let identity = link_identity(&old_path)
            .map_err(|e| RenameError::preflight("stat file", &old_path, e))?;

        let link = if identity.is_hard_linked() {
            check_same_device(&old_path, identity.device, dest_device)?;
            link_groups.push(find_link_siblings(&search_root, identity, &opts.link_search));
            Some(identity)
        } else {
            None
        };

        pending.push(PendingFile {
            from: pair.from.clone(),
            to: pair.to.clone(),
            temp: None,
            link,
        });
    }

    if opts.dry_run {
        debug!(folder = %folder_path.display(), "dry-run: no filesystem changes");
        return Ok(ApplyReport {
            ok: true,
            dry_run: true,
            folder: plan.folder_rename.as_ref().map(|p| RenameRecord {
                from: p.from.clone(),
                to: p.to.clone(),
            }),
            completed: pending
                .iter()
                .map(|p| RenameRecord {
                    from: p.from.clone(),
                    to: p.to.clone(),
                })
                .collect(),
            failures: Vec::new(),
            link_groups,
        });
    }

    let mut report = ApplyReport {
        ok: true,
        dry_run: false,
        folder: None,
        completed: Vec::new(),
        failures: Vec::new(),
        link_groups,
    };

    // Folder rename: one overwrite-protected operation, routed through a
    // temporary hop when the destination is the source under another case.
    let mut folder_path = folder_path.to_path_buf();
    if let Some(pair) = &plan.folder_rename {
        let new_path = folder_path.with_file_name(&pair.to);
        match rename_folder(&folder_path, &new_path)? {
            Ok(()) => {
                debug!(from = %pair.from, to = %pair.to, "renamed folder");
                report.folder = Some(RenameRecord {
                    from: pair.from.clone(),
                    to: pair.to.clone(),
                });
                folder_path = new_path;
            }
            Err(e) => {
                report.ok = false;
                report.failures.push(FailureInfo {
                    kind: FailureKind::Io,
                    step: "rename folder".to_string(),
                    path: folder_path.display().to_string(),
                    message: e.to_string(),
                });
                return Ok(report);
            }
        }
    }

    // Phase one: move every file aside to a temporary sibling name so that
    // destination names (including swapped and case-only ones) are free.
    // On failure the files already moved aside still get committed in phase
    // two; files never reached stay at their old names.
    for pf in &mut pending {
        let old_path = folder_path.join(&pf.from);
        let temp_path = free_temp_path(&folder_path, &pf.to);
        match std::fs::rename(&old_path, &temp_path) {
            Ok(()) => pf.temp = Some(temp_path),
            Err(e) => {
                report.ok = false;
                report.failures.push(FailureInfo {
                    kind: FailureKind::Io,
                    step: "rename to temporary".to_string(),
                    path: old_path.display().to_string(),
                    message: e.to_string(),
                });
                break;
            }
        }
    }

    // Phase two: commit each temporary to its final name. Files that never
    // reached a temporary name are left untouched at their old names.
    let mut abort = false;
    for pf in &mut pending {
        let Some(temp_path) = pf.temp.take() else { continue };
        let old_path = folder_path.join(&pf.from);

        if abort {
            // A later failure stops the batch; put this file back so no
            // temporary name survives the run.
            let _ = std::fs::rename(&temp_path, &old_path);
            continue;
        }

        let final_name = free_final_name(&folder_path, &pf.to);
        if final_name != pf.to {
            warn!(wanted = %pf.to, actual = %final_name, "destination collision, disambiguated");
        }
        let final_path = folder_path.join(&final_name);

        match std::fs::rename(&temp_path, &final_path) {
            Ok(()) => {
                debug!(from = %pf.from, to = %final_name, "renamed file");
                pf.to = final_name.clone();
                report.completed.push(RenameRecord {
                    from: pf.from.clone(),
                    to: final_name,
                });
            }
            Err(e) => {
                report.ok = false;
                report.failures.push(FailureInfo {
                    kind: FailureKind::Io,
                    step: "rename to final".to_string(),
                    path: temp_path.display().to_string(),
                    message: e.to_string(),
                });
                let _ = std::fs::rename(&temp_path, &old_path);
                abort = true;
            }
        }
    }

    // Post-rename verification: a formerly hard-linked file must still have
    // the same inode and link count under its new name.
    for pf in &pending {
        let Some(expected) = pf.link else { continue };
        if !report.completed.iter().any(|r| r.from == pf.from) {
            continue;
        }
        let new_path = folder_path.join(&pf.to);
        match link_identity(&new_path) {
            Ok(actual)
                if actual.inode == expected.inode
                    && actual.link_count == expected.link_count => {}
            Ok(actual) => {
                report.ok = false;
                report.failures.push(FailureInfo {
                    kind: FailureKind::LinkIntegrity,
                    step: "verify hard link".to_string(),
                    path: new_path.display().to_string(),
                    message: format!(
                        "expected inode {} with {} links, found inode {} with {} links",
                        expected.inode, expected.link_count, actual.inode, actual.link_count
                    ),
                });
            }
            Err(e) => {
                report.ok = false;
                report.failures.push(FailureInfo {
                    kind: FailureKind::LinkIntegrity,
                    step: "verify hard link".to_string(),
                    path: new_path.display().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Overwrite-protected folder rename. The outer error is a preflight
/// failure; the inner error is an I/O failure at rename time.
fn rename_folder(from: &Path, to: &Path) -> RenameResult<Result<(), std::io::Error>> {
    if to.exists() {
        let same_entry = match (link_identity(from), link_identity(to)) {
            (Ok(a), Ok(b)) => a.device == b.device && a.inode == b.inode,
            _ => false,
        };
        if !same_entry {
            return Err(RenameError::DestinationExists {
                path: to.to_path_buf(),
            });
        }
        // Case-only rename on a case-insensitive filesystem: hop through a
        // temporary sibling name.
        let temp = free_temp_path(from.parent().unwrap_or(from), &entry_name(to));
        if let Err(e) = std::fs::rename(from, &temp) {
            return Ok(Err(e));
        }
        return Ok(std::fs::rename(&temp, to));
    }
    Ok(std::fs::rename(from, to))
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First unused temporary sibling name for `base`.
fn free_temp_path(dir: &Path, base: &str) -> PathBuf {
    let mut n = 0usize;
    loop {
        let candidate = dir.join(format!(".{base}.tmp-rename{n}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Final destination name, disambiguated with ` (n)` before the extension
/// when an unrelated entry already holds the wanted name.
fn free_final_name(dir: &Path, wanted: &str) -> String {
    if !dir.join(wanted).exists() {
        return wanted.to_string();
    }
    let (stem, ext) = fitpath_core::edits::split_extension(wanted);
    let mut n = 1usize;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitpath_core::plan::RenamePair;
    use std::fs;

    fn pair(from: &str, to: &str) -> RenamePair {
        RenamePair {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn file_plan(pairs: Vec<RenamePair>) -> RenamePlan {
        RenamePlan {
            folder_rename: None,
            file_renames: pairs,
        }
    }

    fn setup(files: &[&str]) -> (tempfile::TempDir, PathBuf) {
        let root = tempfile::tempdir().unwrap();
        let folder = root.path().join("Folder");
        fs::create_dir(&folder).unwrap();
        for f in files {
            fs::write(folder.join(f), b"data").unwrap();
        }
        (root, folder)
    }

    #[test]
    fn renames_files_and_folder() {
        let (root, folder) = setup(&["Old Name (2021).m4b"]);
        let plan = RenamePlan {
            folder_rename: Some(pair("Folder", "Short")),
            file_renames: vec![pair("Old Name (2021).m4b", "Old Name.m4b")],
        };

        let report = apply_plan(&folder, &plan, &ApplyOptions::default()).unwrap();

        assert!(report.ok);
        let new_folder = root.path().join("Short");
        assert!(new_folder.join("Old Name.m4b").exists());
        assert!(!folder.exists());
        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.folder.as_ref().unwrap().to, "Short");
    }

    #[test]
    fn dry_run_touches_nothing() {
        let (_root, folder) = setup(&["Old Name (2021).m4b"]);
        let plan = file_plan(vec![pair("Old Name (2021).m4b", "Old Name.m4b")]);

        let opts = ApplyOptions {
            dry_run: true,
            ..ApplyOptions::default()
        };
        let report = apply_plan(&folder, &plan, &opts).unwrap();

        assert!(report.ok);
        assert!(report.dry_run);
        assert_eq!(report.completed.len(), 1);
        assert!(folder.join("Old Name (2021).m4b").exists());
        assert!(!folder.join("Old Name.m4b").exists());
    }

    #[test]
    fn swap_via_two_phase() {
        let (_root, folder) = setup(&[]);
        fs::write(folder.join("a.txt"), b"AAA").unwrap();
        fs::write(folder.join("b.txt"), b"BBB").unwrap();

        let plan = file_plan(vec![pair("a.txt", "b.txt"), pair("b.txt", "a.txt")]);
        let report = apply_plan(&folder, &plan, &ApplyOptions::default()).unwrap();

        assert!(report.ok, "failures: {:?}", report.failures);
        assert_eq!(fs::read(folder.join("a.txt")).unwrap(), b"BBB");
        assert_eq!(fs::read(folder.join("b.txt")).unwrap(), b"AAA");
    }

    #[test]
    fn collision_gets_numeric_disambiguator() {
        let (_root, folder) = setup(&["Source (2021).m4b", "Source.m4b"]);

        let plan = file_plan(vec![pair("Source (2021).m4b", "Source.m4b")]);
        let report = apply_plan(&folder, &plan, &ApplyOptions::default()).unwrap();

        assert!(report.ok);
        assert_eq!(report.completed[0].to, "Source (1).m4b");
        assert!(folder.join("Source.m4b").exists());
        assert!(folder.join("Source (1).m4b").exists());
    }

    #[test]
    fn case_only_rename_goes_through_hop() {
        let (_root, folder) = setup(&["book.m4b"]);

        let plan = file_plan(vec![pair("book.m4b", "Book.m4b")]);
        let report = apply_plan(&folder, &plan, &ApplyOptions::default()).unwrap();

        assert!(report.ok, "failures: {:?}", report.failures);
        let names: Vec<String> = fs::read_dir(&folder)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Book.m4b"]);
    }

    #[test]
    fn missing_file_refuses_batch_before_any_rename() {
        let (_root, folder) = setup(&["present.m4b"]);

        let plan = file_plan(vec![
            pair("missing.m4b", "gone.m4b"),
            pair("present.m4b", "renamed.m4b"),
        ]);
        let err = apply_plan(&folder, &plan, &ApplyOptions::default()).unwrap_err();

        assert!(matches!(err, RenameError::Preflight { .. }));
        // Preflight failure: nothing moved.
        assert!(folder.join("present.m4b").exists());
    }

    #[test]
    fn folder_destination_collision_is_refused() {
        let (root, folder) = setup(&[]);
        fs::create_dir(root.path().join("Taken")).unwrap();

        let plan = RenamePlan {
            folder_rename: Some(pair("Folder", "Taken")),
            file_renames: vec![],
        };
        let err = apply_plan(&folder, &plan, &ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, RenameError::DestinationExists { .. }));
        assert!(folder.exists());
    }

    #[test]
    fn cross_device_guard_is_pure_and_refuses() {
        let err = check_same_device(Path::new("/x/a.m4b"), 7, 9).unwrap_err();
        assert!(matches!(err, RenameError::CrossDeviceHardLink { .. }));
        check_same_device(Path::new("/x/a.m4b"), 7, 7).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn hard_link_preserved_across_rename() {
        use crate::hardlink::link_identity;

        let (_root, folder) = setup(&["linked (2021).m4b"]);
        let original = folder.join("linked (2021).m4b");
        let twin = folder.join("twin.m4b");
        fs::hard_link(&original, &twin).unwrap();
        let before = link_identity(&original).unwrap();

        let plan = file_plan(vec![pair("linked (2021).m4b", "linked.m4b")]);
        let report = apply_plan(&folder, &plan, &ApplyOptions::default()).unwrap();

        assert!(report.ok, "failures: {:?}", report.failures);
        let after = link_identity(&folder.join("linked.m4b")).unwrap();
        assert_eq!(after.inode, before.inode);
        assert_eq!(after.link_count, 2);
        assert_eq!(report.link_groups.len(), 1);
        assert_eq!(report.link_groups[0].paths.len(), 2);
    }
}
