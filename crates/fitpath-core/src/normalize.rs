//! Name normalization for fitpath-core.
//!
//! This module canonicalizes a folder or file name before any compliance
//! editing happens.
//!
//! Goals:
//! - identical logical names yield identical normalized output
//! - no information is destroyed, only representation is canonicalized
//! - remain purely in-memory (no I/O)
//!
//! The steps run in a fixed order and each is independently idempotent, so
//! running [`normalize_name`] twice yields a fixed point after the first call.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use unicode_normalization::{is_nfc, UnicodeNormalization};

use crate::policy::Policy;

/// A normalized name plus human-readable descriptions of what changed.
///
/// The change descriptions are for display only; they carry no semantic
/// weight and are not part of the compliance log.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub text: String,
    pub changes: Vec<String>,
}

static VOLUME_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(vol|volume)\.?[ _]*([0-9]+)\b").unwrap());

static VOLUME_PAD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(vol|volume)_([0-9])\b").unwrap());

/// Normalize a single name component.
///
/// Steps, in order:
/// 1. repair doubled tag markers (`{{`, `}}`, `[[`, `]]`) and collapse
///    immediately repeated identical bracketed tags
/// 2. Unicode canonical composition (NFC) when the policy asks for it
/// 3. canonicalize the volume marker separator (`Vol. 3`, `vol 3`,
///    `volume3` all become `vol_3` / `volume_3`)
/// 4. zero-pad single-digit volume numbers when the policy asks for it
/// 5. strip the policy's punctuation characters
/// 6. collapse whitespace runs and trim the ends
pub fn normalize_name(input: &str, policy: &Policy) -> Normalized {
    let mut changes = Vec::new();
    let mut text = input.to_string();

    let repaired = repair_duplicate_tags(&text);
    if repaired != text {
        changes.push(format!("repaired duplicated tag markers in {text:?}"));
        text = repaired;
    }

    if policy.unicode_nfc && !is_nfc(&text) {
        changes.push("recomposed Unicode to NFC".to_string());
        text = text.nfc().collect();
    }

    let canon = canonicalize_volume_marker(&text);
    if canon != text {
        changes.push(format!("canonicalized volume marker in {text:?}"));
        text = canon;
    }

    if policy.zero_pad_volume {
        let padded = zero_pad_volume(&text);
        if padded != text {
            changes.push("zero-padded volume number".to_string());
            text = padded;
        }
    }

    if !policy.strip_punctuation.is_empty() {
        let stripped: String = text
            .chars()
            .filter(|c| !policy.strip_punctuation.contains(c))
            .collect();
        if stripped != text {
            changes.push("stripped configured punctuation".to_string());
            text = stripped;
        }
    }

    let collapsed = collapse_whitespace(&text);
    if collapsed != text {
        changes.push("collapsed whitespace".to_string());
        text = collapsed;
    }

    Normalized { text, changes }
}

/// Collapse doubled tag markers and immediately repeated identical tags.
///
/// `{{ID.X}}` becomes `{ID.X}`, and `[Tag][Tag]` becomes `[Tag]`.
fn repair_duplicate_tags(input: &str) -> String {
    let mut s = input.to_string();
    for (doubled, single) in [("{{", "{"), ("}}", "}"), ("[[", "["), ("]]", "]")] {
        while s.contains(doubled) {
            s = s.replace(doubled, single);
        }
    }

    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{[^{}]*\}|\[[^\[\]]*\]").unwrap());

    // Drop a tag when it is identical to the previous tag and only
    // whitespace separates them.
    let mut out = String::with_capacity(s.len());
    let mut cursor = 0usize;
    let mut prev: Option<(String, usize)> = None;
    for m in TAG_RE.find_iter(&s) {
        let gap = &s[cursor..m.start()];
        let duplicate = match &prev {
            Some((tag, end)) => tag == m.as_str() && s[*end..m.start()].trim().is_empty(),
            None => false,
        };
        if duplicate {
            // Advance the comparison window so a third identical tag is
            // still adjacent to the one we kept.
            prev = Some((m.as_str().to_string(), m.end()));
            cursor = m.end();
            continue;
        }
        out.push_str(gap);
        out.push_str(m.as_str());
        prev = Some((m.as_str().to_string(), m.end()));
        cursor = m.end();
    }
    out.push_str(&s[cursor..]);
    out
}

/// Canonicalize spacing and separator around a volume marker without
/// shortening the marker word itself.
fn canonicalize_volume_marker(input: &str) -> String {
    VOLUME_MARKER_RE
        .replace_all(input, |c: &Captures<'_>| {
            format!("{}_{}", c[1].to_lowercase(), &c[2])
        })
        .into_owned()
}

fn zero_pad_volume(input: &str) -> String {
    VOLUME_PAD_RE
        .replace_all(input, |c: &Captures<'_>| format!("{}_0{}", &c[1], &c[2]))
        .into_owned()
}

/// Collapse whitespace runs to single spaces and trim both ends.
pub(crate) fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
