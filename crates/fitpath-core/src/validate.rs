//! Pure compliance checks for fitpath-core.
//!
//! These checks are stateless and perform no I/O; they are safe to call
//! before or after any planning step, and the planner consults them after
//! every single edit. The directory-walking counterpart lives in the
//! `fitpath-fs` crate.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::edits::char_len;
use crate::policy::Policy;

/// Characters rejected in any path component on common destinations.
/// The path separator itself is checked separately.
pub const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\'];

/// Result of checking one path against one policy.
#[derive(Debug, Clone, Serialize)]
pub struct PathCheck {
    pub valid: bool,
    pub length: usize,
    pub overage: usize,
    pub illegal_chars: Vec<char>,
}

/// Check a full path string (already joined with `/`).
pub fn check_path(path: &str, policy: &Policy) -> PathCheck {
    let length = char_len(path);
    let overage = length.saturating_sub(policy.max_full_path);

    let mut illegal_chars: Vec<char> = Vec::new();
    for c in path.chars() {
        if (ILLEGAL_CHARS.contains(&c) || c.is_control()) && !illegal_chars.contains(&c) {
            illegal_chars.push(c);
        }
    }

    PathCheck {
        valid: overage == 0 && illegal_chars.is_empty(),
        length,
        overage,
        illegal_chars,
    }
}

/// Check the joined length of a folder name plus one member file name.
///
/// Full path length is `len(folder) + 1 + len(file)`, the separator counting
/// as one character.
pub fn check_join(folder: &str, file: &str, policy: &Policy) -> PathCheck {
    check_path(&format!("{folder}/{file}"), policy)
}

/// Evaluate one path against several destinations' rules at once.
///
/// Keys are the policies' destination identifiers; iteration order is
/// deterministic.
pub fn compare_across_policies(path: &str, policies: &[Policy]) -> BTreeMap<String, PathCheck> {
    policies
        .iter()
        .map(|p| (p.destination.clone(), check_path(path, p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_and_overage() {
        let mut policy = Policy::default();
        policy.max_full_path = 10;

        let ok = check_path("short", &policy);
        assert!(ok.valid);
        assert_eq!(ok.length, 5);
        assert_eq!(ok.overage, 0);

        let over = check_path("much-too-long-path", &policy);
        assert!(!over.valid);
        assert_eq!(over.overage, 8);
    }

    #[test]
    fn illegal_characters_flagged_once() {
        let policy = Policy::default();
        let check = check_path("bad:na?me::", &policy);
        assert!(!check.valid);
        assert_eq!(check.illegal_chars, vec![':', '?']);
    }

    #[test]
    fn join_counts_separator() {
        let mut policy = Policy::default();
        policy.max_full_path = 11;
        // 5 + 1 + 5 = 11
        assert!(check_join("abcde", "fghij", &policy).valid);
        policy.max_full_path = 10;
        assert!(!check_join("abcde", "fghij", &policy).valid);
    }

    #[test]
    fn multi_destination_comparison() {
        let strict = Policy::preset("strict").unwrap();
        let standard = Policy::preset("standard").unwrap();
        let path = "x".repeat(200);

        let results = compare_across_policies(&path, &[strict, standard]);
        assert!(!results["strict"].valid);
        assert!(results["standard"].valid);
        assert_eq!(results["strict"].overage, 50);
    }

    #[test]
    fn unicode_counts_characters_not_bytes() {
        let mut policy = Policy::default();
        policy.max_full_path = 4;
        // Four characters, more than four bytes.
        assert!(check_path("日本語x", &policy).valid);
    }
}
