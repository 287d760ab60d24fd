//! Destination policies for fitpath-core.
//!
//! A [`Policy`] captures everything one upload destination demands from a
//! folder/file name: the total path budget, the order in which informational
//! fields may be sacrificed, and the title-handling parameters.
//!
//! The core crate itself does not read environment variables or config files.
//! All configuration must be provided explicitly by the caller; the named
//! presets below exist so callers can look a destination up by identifier
//! without carrying their own rule tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{FitpathError, FitpathResult};

/// Per-destination rules, immutable for the duration of one planning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Destination identifier (e.g. the preset name this was built from).
    pub destination: String,

    /// Maximum allowed characters for `folder + "/" + file`.
    pub max_full_path: usize,

    /// Keep-rank per information class: position 0 holds the priority that is
    /// dropped last, position 5 the one dropped first. Must be a permutation
    /// of 0..=5.
    pub keep_priority_order: [u8; 6],

    /// The order in which edit priorities are attempted. Must be a
    /// permutation of 0..=5; the default tries 5 (year) first and 0
    /// (stable identifier) last.
    pub edit_priority_order: [u8; 6],

    /// Explicit title substitutions, applied whole-token before truncation.
    pub title_alias_map: BTreeMap<String, String>,

    /// Characters held back from the truncation target so a shortened title
    /// still leaves room for trailing tokens (volume marker, identifier).
    pub title_reserve_chars: usize,

    /// Hard floor for a truncated title, excluding the ellipsis. Truncation
    /// that would go below this floor is refused.
    pub title_min_chars_after_truncation: usize,

    /// Marker appended to a truncated title.
    pub title_ellipsis: String,

    /// Zero-pad single-digit volume numbers during normalization.
    pub zero_pad_volume: bool,

    /// Punctuation stripped outright during normalization.
    pub strip_punctuation: Vec<char>,

    /// Apply Unicode canonical composition (NFC) during normalization.
    pub unicode_nfc: bool,
}

/// Keep ranks in their natural order: priority 0 is dropped last.
pub const DEFAULT_KEEP_ORDER: [u8; 6] = [0, 1, 2, 3, 4, 5];

/// Edits attempted most-droppable-first.
pub const DEFAULT_EDIT_ORDER: [u8; 6] = [5, 4, 3, 2, 1, 0];

impl Default for Policy {
    fn default() -> Self {
        Self {
            destination: "default".to_string(),
            max_full_path: 255,
            keep_priority_order: DEFAULT_KEEP_ORDER,
            edit_priority_order: DEFAULT_EDIT_ORDER,
            title_alias_map: BTreeMap::new(),
            title_reserve_chars: 0,
            title_min_chars_after_truncation: 10,
            title_ellipsis: "…".to_string(),
            zero_pad_volume: true,
            strip_punctuation: vec![';', '!'],
            unicode_nfc: true,
        }
    }
}

impl Policy {
    /// Look up a named destination preset.
    ///
    /// Known presets:
    /// - `"strict"`: 150-character budget, reserved title slack, aggressive
    ///   punctuation stripping
    /// - `"standard"`: 255-character budget
    pub fn preset(name: &str) -> FitpathResult<Self> {
        match name {
            "strict" => Ok(Self {
                destination: "strict".to_string(),
                max_full_path: 150,
                title_reserve_chars: 4,
                strip_punctuation: vec![';', '!', ','],
                ..Self::default()
            }),
            "standard" => Ok(Self {
                destination: "standard".to_string(),
                max_full_path: 255,
                ..Self::default()
            }),
            other => Err(FitpathError::unknown_preset(other)),
        }
    }

    /// Names of all built-in presets.
    pub fn preset_names() -> &'static [&'static str] {
        &["strict", "standard"]
    }
}

/// Validate a policy before any planning work.
///
/// Rejects self-contradictory configurations rather than letting the planner
/// produce nonsense from them.
pub fn validate_policy(policy: &Policy) -> FitpathResult<()> {
    if policy.max_full_path == 0 {
        return Err(FitpathError::invalid_policy(
            "max_full_path must be greater than zero",
        ));
    }

    if policy.title_min_chars_after_truncation == 0 {
        return Err(FitpathError::invalid_policy(
            "title_min_chars_after_truncation must be greater than zero",
        ));
    }

    if policy.title_min_chars_after_truncation >= policy.max_full_path {
        return Err(FitpathError::invalid_policy(
            "title_min_chars_after_truncation must be less than max_full_path",
        ));
    }

    if policy.title_reserve_chars >= policy.max_full_path {
        return Err(FitpathError::invalid_policy(
            "title_reserve_chars must be less than max_full_path",
        ));
    }

    require_permutation(&policy.keep_priority_order, "keep_priority_order")?;
    require_permutation(&policy.edit_priority_order, "edit_priority_order")?;

    Ok(())
}

fn require_permutation(order: &[u8; 6], field: &str) -> FitpathResult<()> {
    let mut seen = [false; 6];
    for &p in order {
        if p > 5 || seen[p as usize] {
            return Err(FitpathError::invalid_policy(format!(
                "{field} must be a permutation of 0..=5, got {order:?}"
            )));
        }
        seen[p as usize] = true;
    }
    Ok(())
}
