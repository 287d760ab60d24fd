//! Compliance planning for fitpath-core.
//!
//! The planner drives the edit catalog against one folder + file-name tuple
//! until every resulting full path fits the policy budget, preferring the
//! least destructive edit set:
//! 1. normalize every name
//! 2. conservative pass: priority 5..=2 edits, file names only
//! 3. small remaining overage: folder-level edits, one step at a time,
//!    because one folder edit benefits every sibling file at once
//! 4. aggressive pass: the full ladder per still-non-compliant file, then
//!    the folder ladder as the final attempt
//!
//! Planning is pure: no I/O, no clock, no environment. A run that cannot
//! reach compliance reports `ok = false` with the closest attempt and the
//! full log; it never fabricates a result by truncating a title below the
//! policy floor.

use serde::Serialize;

use crate::edits::{char_len, split_extension, steps_for_priority, EditContext, EditScope};
use crate::errors::{FitpathError, FitpathResult};
use crate::normalize::normalize_name;
use crate::policy::{validate_policy, Policy};
use crate::validate::check_join;

/// Overage (in characters) up to which shrinking the shared folder name is
/// attempted before any title is touched aggressively.
pub const SMALL_OVERAGE_THRESHOLD: usize = 20;

/// The unit being made compliant: one folder and its member file names.
#[derive(Debug, Clone, Serialize)]
pub struct PathItem {
    pub folder_name: String,
    pub file_names: Vec<String>,
}

impl PathItem {
    pub fn new(folder_name: impl Into<String>, file_names: Vec<String>) -> Self {
        Self {
            folder_name: folder_name.into(),
            file_names,
        }
    }
}

/// One applied edit in the audit trail. Entries appear in execution order;
/// steps that produced no change are never recorded.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceLogEntry {
    pub scope: EditScope,
    /// Original (pre-planning) name of the folder or file the step applied to.
    pub target: String,
    pub priority: u8,
    pub step_name: String,
    pub before_text: String,
    pub after_text: String,
    pub before_len: usize,
    pub after_len: usize,
    pub saved_chars: usize,
    /// For file steps: whether this file's full path fits the budget after
    /// the step. For folder steps: whether the whole item fits.
    pub compliant: bool,
}

/// Outcome of one planning run.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub folder_name: String,
    pub file_names: Vec<String>,
    /// Display-only descriptions of normalization changes.
    pub normalization_notes: Vec<String>,
    pub log: Vec<ComplianceLogEntry>,
    pub ok: bool,
}

/// A rename pair, old name to new name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamePair {
    pub from: String,
    pub to: String,
}

/// The renames a successful plan implies, consumed once by the filesystem
/// layer. Unchanged names are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct RenamePlan {
    pub folder_rename: Option<RenamePair>,
    pub file_renames: Vec<RenamePair>,
}

impl PlanReport {
    /// Derive the rename plan by diffing against the original item.
    pub fn rename_plan(&self, original: &PathItem) -> FitpathResult<RenamePlan> {
        if original.file_names.len() != self.file_names.len() {
            return Err(FitpathError::invalid_argument(
                "rename plan requested for a different item than was planned",
            ));
        }

        let folder_rename = (original.folder_name != self.folder_name).then(|| RenamePair {
            from: original.folder_name.clone(),
            to: self.folder_name.clone(),
        });

        let file_renames = original
            .file_names
            .iter()
            .zip(&self.file_names)
            .filter(|(from, to)| from != to)
            .map(|(from, to)| RenamePair {
                from: from.clone(),
                to: to.clone(),
            })
            .collect();

        Ok(RenamePlan {
            folder_rename,
            file_renames,
        })
    }
}

struct WorkFile {
    original: String,
    stem: String,
    ext: String,
}

impl WorkFile {
    fn name(&self) -> String {
        format!("{}{}", self.stem, self.ext)
    }
}

/// Plan compliance edits for one item.
///
/// Returns `Err` only for an invalid policy; an unreachable budget is
/// reported through [`PlanReport::ok`].
pub fn plan(item: &PathItem, policy: &Policy) -> FitpathResult<PlanReport> {
    validate_policy(policy)?;

    let mut notes = Vec::new();

    let folder_norm = normalize_name(&item.folder_name, policy);
    let mut folder = folder_norm.text;
    notes.extend(
        folder_norm
            .changes
            .into_iter()
            .map(|c| format!("{}: {c}", item.folder_name)),
    );

    let mut files: Vec<WorkFile> = Vec::with_capacity(item.file_names.len());
    for name in &item.file_names {
        let (stem, ext) = split_extension(name);
        let norm = normalize_name(stem, policy);
        notes.extend(norm.changes.into_iter().map(|c| format!("{name}: {c}")));
        files.push(WorkFile {
            original: name.clone(),
            stem: norm.text,
            ext: ext.to_string(),
        });
    }

    let mut log = Vec::new();

    // Conservative pass: priority 5..=2, file names only.
    for wf in &mut files {
        run_file_ladder(&folder, wf, policy, 2, &mut log);
    }

    let overage = worst_overage(&folder, &files, policy);
    if overage > 0 && overage <= SMALL_OVERAGE_THRESHOLD {
        run_folder_ladder(&mut folder, &item.folder_name, &files, policy, &mut log);
    }

    if !item_compliant(&folder, &files, policy) {
        // Aggressive pass: full ladder per remaining non-compliant file.
        for wf in &mut files {
            run_file_ladder(&folder, wf, policy, 0, &mut log);
        }

        // Last resort: the folder ladder, for budgets no amount of file
        // editing can reach.
        if !item_compliant(&folder, &files, policy) {
            run_folder_ladder(&mut folder, &item.folder_name, &files, policy, &mut log);
        }
    }

    let ok = item_compliant(&folder, &files, policy);

    Ok(PlanReport {
        folder_name: folder,
        file_names: files.iter().map(WorkFile::name).collect(),
        normalization_notes: notes,
        log,
        ok,
    })
}

fn file_overage(folder: &str, wf: &WorkFile, policy: &Policy) -> usize {
    check_join(folder, &wf.name(), policy).overage
}

fn item_compliant(folder: &str, files: &[WorkFile], policy: &Policy) -> bool {
    files.iter().all(|wf| file_overage(folder, wf, policy) == 0)
}

fn worst_overage(folder: &str, files: &[WorkFile], policy: &Policy) -> usize {
    files
        .iter()
        .map(|wf| file_overage(folder, wf, policy))
        .max()
        .unwrap_or(0)
}

/// Walk the edit ladder for one file, lowest keep-priority first, stopping as
/// soon as the file's full path fits. `min_priority` bounds how deep the
/// ladder goes (2 for the conservative pass, 0 for the aggressive pass).
fn run_file_ladder(
    folder: &str,
    wf: &mut WorkFile,
    policy: &Policy,
    min_priority: u8,
    log: &mut Vec<ComplianceLogEntry>,
) {
    for &priority in policy
        .edit_priority_order
        .iter()
        .filter(|&&p| p >= min_priority)
    {
        for step in steps_for_priority(priority) {
            if file_overage(folder, wf, policy) == 0 {
                return;
            }

            let budget = policy
                .max_full_path
                .saturating_sub(char_len(folder) + 1 + char_len(&wf.ext));
            let ctx = EditContext {
                policy,
                budget: Some(budget),
            };

            let before = wf.name();
            let after_stem = step.apply(&wf.stem, &ctx);
            if after_stem == wf.stem {
                continue;
            }
            wf.stem = after_stem;
            let after = wf.name();

            log.push(ComplianceLogEntry {
                scope: EditScope::File,
                target: wf.original.clone(),
                priority,
                step_name: step.name().to_string(),
                before_len: char_len(&before),
                after_len: char_len(&after),
                saved_chars: char_len(&before).saturating_sub(char_len(&after)),
                compliant: file_overage(folder, wf, policy) == 0,
                before_text: before,
                after_text: after,
            });
        }
    }
}

/// Walk the edit ladder for the shared folder name, checking the whole item
/// after every single step and stopping at the first full compliance.
fn run_folder_ladder(
    folder: &mut String,
    original_folder: &str,
    files: &[WorkFile],
    policy: &Policy,
    log: &mut Vec<ComplianceLogEntry>,
) {
    let longest_file = files
        .iter()
        .map(|wf| char_len(&wf.name()))
        .max()
        .unwrap_or(0);

    for &priority in policy.edit_priority_order.iter() {
        for step in steps_for_priority(priority) {
            if item_compliant(folder, files, policy) {
                return;
            }

            let budget = policy.max_full_path.saturating_sub(1 + longest_file);
            let ctx = EditContext {
                policy,
                budget: Some(budget),
            };

            let before = folder.clone();
            let after = step.apply(&before, &ctx);
            if after == before {
                continue;
            }
            *folder = after.clone();

            log.push(ComplianceLogEntry {
                scope: EditScope::Folder,
                target: original_folder.to_string(),
                priority,
                step_name: step.name().to_string(),
                before_len: char_len(&before),
                after_len: char_len(&after),
                saved_chars: char_len(&before).saturating_sub(char_len(&after)),
                compliant: item_compliant(folder, files, policy),
                before_text: before,
                after_text: after,
            });
        }
    }
}
