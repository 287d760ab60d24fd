//! The edit catalog for fitpath-core.
//!
//! Every edit is a named, pure `&str -> String` transform tagged with a
//! keep-priority:
//! - 5: year parenthetical, dropped first
//! - 4: author/contributor parenthetical
//! - 3: trailing group/uploader tag
//! - 2: volume token compaction (three sub-steps)
//! - 1: title edits (four sub-steps)
//! - 0: stable identifier tag, dropped only as a last resort
//!
//! Rules every edit obeys:
//! - output length never exceeds input length
//! - an edit whose pattern is absent returns its input unchanged
//! - edits never touch a file extension (the planner strips it first)

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::normalize::collapse_whitespace;
use crate::policy::Policy;

/// Whether an edit is being applied to the shared folder name or to one
/// member file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    Folder,
    File,
}

/// Context handed to each edit application.
///
/// `budget` is the maximum character count the edited text may occupy for
/// the current target; only the title truncation edit consults it.
#[derive(Debug, Clone, Copy)]
pub struct EditContext<'a> {
    pub policy: &'a Policy,
    pub budget: Option<usize>,
}

/// One named transform in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    DropYear,
    DropAuthor,
    DropGroupTag,
    VolumeAbbrev,
    VolumeShort,
    VolumeStripZero,
    TitleDropArticle,
    TitleSoftPunctuation,
    TitleAlias,
    TitleTruncate,
    IdCompact,
    IdDrop,
}

/// The full catalog in attempt order within each priority. The planner walks
/// this ladder grouped by `Policy::edit_priority_order`.
pub const LADDER: [EditKind; 12] = [
    EditKind::DropYear,
    EditKind::DropAuthor,
    EditKind::DropGroupTag,
    EditKind::VolumeAbbrev,
    EditKind::VolumeShort,
    EditKind::VolumeStripZero,
    EditKind::TitleDropArticle,
    EditKind::TitleSoftPunctuation,
    EditKind::TitleAlias,
    EditKind::TitleTruncate,
    EditKind::IdCompact,
    EditKind::IdDrop,
];

/// Sub-steps of one priority, in their fixed attempt order.
pub fn steps_for_priority(priority: u8) -> impl Iterator<Item = EditKind> {
    LADDER.into_iter().filter(move |k| k.priority() == priority)
}

impl EditKind {
    /// Keep-priority of the information this edit removes (5 = drop first).
    pub fn priority(self) -> u8 {
        match self {
            Self::DropYear => 5,
            Self::DropAuthor => 4,
            Self::DropGroupTag => 3,
            Self::VolumeAbbrev | Self::VolumeShort | Self::VolumeStripZero => 2,
            Self::TitleDropArticle
            | Self::TitleSoftPunctuation
            | Self::TitleAlias
            | Self::TitleTruncate => 1,
            Self::IdCompact | Self::IdDrop => 0,
        }
    }

    /// Stable dot-delimited step name, used in the compliance log.
    pub fn name(self) -> &'static str {
        match self {
            Self::DropYear => "year.drop",
            Self::DropAuthor => "author.drop",
            Self::DropGroupTag => "group.drop",
            Self::VolumeAbbrev => "volume.abbrev",
            Self::VolumeShort => "volume.short",
            Self::VolumeStripZero => "volume.strip_zero",
            Self::TitleDropArticle => "title.drop_article",
            Self::TitleSoftPunctuation => "title.soft_punctuation",
            Self::TitleAlias => "title.alias",
            Self::TitleTruncate => "title.truncate",
            Self::IdCompact => "id.compact",
            Self::IdDrop => "id.drop",
        }
    }

    /// Apply this edit. Returns the input unchanged when the pattern is not
    /// present; the caller must treat an unchanged result as a no-op and keep
    /// it out of the log.
    pub fn apply(self, input: &str, ctx: &EditContext<'_>) -> String {
        match self {
            Self::DropYear => drop_year(input),
            Self::DropAuthor => drop_rightmost_author(input),
            Self::DropGroupTag => drop_trailing_group_tag(input),
            Self::VolumeAbbrev => VOLUME_ABBREV_RE.replace_all(input, "vol_$1").into_owned(),
            Self::VolumeShort => VOLUME_SHORT_RE.replace_all(input, "v$1").into_owned(),
            Self::VolumeStripZero => VOLUME_ZERO_RE.replace_all(input, "v$1").into_owned(),
            Self::TitleDropArticle => ARTICLE_RE.replace(input, "").into_owned(),
            Self::TitleSoftPunctuation => strip_soft_punctuation(input),
            Self::TitleAlias => apply_aliases(input, ctx.policy),
            Self::TitleTruncate => truncate_title(input, ctx),
            Self::IdCompact => ID_COMPACT_RE
                .replace_all(input, |c: &Captures<'_>| format!("{{{}}}", &c[2]))
                .into_owned(),
            Self::IdDrop => tidy(&ID_DROP_RE.replace_all(input, "")),
        }
    }
}

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\((19|20)\d{2}\)").unwrap());

static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\([^()]*\)").unwrap());

static YEAR_INNER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\((19|20)\d{2}\)$").unwrap());

static TRAILING_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\[[^\[\]]*\]\s*$").unwrap());

static VOLUME_ABBREV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bvolume_([0-9]+)").unwrap());

static VOLUME_SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bvol_([0-9]+)").unwrap());

static VOLUME_ZERO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bv0+([0-9]+)\b").unwrap());

static ARTICLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(the|an|a)\s+").unwrap());

static ID_COMPACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z]+)[._-]([A-Za-z0-9]+)\}").unwrap());

static ID_DROP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\{[^{}]*\}").unwrap());

/// Tokens that count as a trailing suffix the title truncation must preserve:
/// volume markers, identifier tags, group tags and parentheticals.
static TITLE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\s*(?:-\s*)?(?:(?i:v(?:ol(?:ume)?)?_?[0-9]+)|\{[^{}]*\}|\[[^\[\]]*\]|\([^()]*\)))+\s*$",
    )
    .unwrap()
});

const SOFT_PUNCTUATION: &[char] = &[
    '\'', '"', ',', ';', ':', '!', '?', '\u{2019}', '\u{201C}', '\u{201D}',
];

fn tidy(s: &str) -> String {
    collapse_whitespace(s)
}

fn drop_year(input: &str) -> String {
    if !YEAR_RE.is_match(input) {
        return input.to_string();
    }
    tidy(&YEAR_RE.replace_all(input, ""))
}

/// Remove the right-most parenthetical group that is not a year.
fn drop_rightmost_author(input: &str) -> String {
    let target = PAREN_RE
        .find_iter(input)
        .filter(|m| !YEAR_INNER_RE.is_match(m.as_str()))
        .last();

    match target {
        Some(m) => {
            let mut out = String::with_capacity(input.len());
            out.push_str(&input[..m.start()]);
            out.push_str(&input[m.end()..]);
            tidy(&out)
        }
        None => input.to_string(),
    }
}

fn drop_trailing_group_tag(input: &str) -> String {
    if !TRAILING_GROUP_RE.is_match(input) {
        return input.to_string();
    }
    tidy(&TRAILING_GROUP_RE.replace(input, ""))
}

fn strip_soft_punctuation(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !SOFT_PUNCTUATION.contains(c))
        .collect();
    if stripped == input {
        return input.to_string();
    }
    tidy(&stripped)
}

/// Replace aliased title fragments. Longer keys win so that overlapping
/// aliases resolve deterministically; a replacement is only taken when it
/// actually shortens the text.
fn apply_aliases(input: &str, policy: &Policy) -> String {
    let mut keys: Vec<&String> = policy.title_alias_map.keys().collect();
    keys.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

    let mut out = input.to_string();
    for key in keys {
        let value = &policy.title_alias_map[key];
        if value.chars().count() < key.chars().count() && out.contains(key.as_str()) {
            out = out.replace(key.as_str(), value);
        }
    }
    if out == input {
        return input.to_string();
    }
    tidy(&out)
}

/// Truncate the title portion at a word boundary, appending the policy's
/// ellipsis and keeping trailing tokens (volume, identifier, tags) intact.
///
/// Refuses to go below `title_min_chars_after_truncation` characters of
/// title (ellipsis excluded): in that case the input is returned unchanged
/// and the planner reports the run as exhausted.
fn truncate_title(input: &str, ctx: &EditContext<'_>) -> String {
    let policy = ctx.policy;
    let Some(budget) = ctx.budget else {
        return input.to_string();
    };

    if char_len(input) <= budget {
        return input.to_string();
    }

    let (title, suffix) = match TITLE_SUFFIX_RE.find(input) {
        Some(m) if m.start() > 0 => (&input[..m.start()], &input[m.start()..]),
        _ => (input, ""),
    };
    let title = title.trim_end();

    let ellipsis_len = char_len(&policy.title_ellipsis);
    let allowed = budget
        .saturating_sub(char_len(suffix))
        .saturating_sub(policy.title_reserve_chars);
    let min = policy.title_min_chars_after_truncation;

    if allowed < min + ellipsis_len {
        return input.to_string();
    }
    let keep_target = allowed - ellipsis_len;

    // Greedy word-boundary cut; falls back to a character cut only when the
    // first word alone overshoots the target (e.g. unspaced scripts).
    let mut kept = String::new();
    for word in title.split(' ') {
        let candidate_len = if kept.is_empty() {
            char_len(word)
        } else {
            char_len(&kept) + 1 + char_len(word)
        };
        if candidate_len > keep_target {
            break;
        }
        if !kept.is_empty() {
            kept.push(' ');
        }
        kept.push_str(word);
    }

    if kept.is_empty() {
        kept = title.chars().take(keep_target).collect();
        kept = kept.trim_end().to_string();
    }

    // Nothing was actually removed from the title; appending an ellipsis
    // would grow the name, so this edit is a no-op.
    if kept == title {
        return input.to_string();
    }

    if char_len(&kept) < min {
        return input.to_string();
    }

    let mut out = kept;
    out.push_str(&policy.title_ellipsis);
    out.push_str(suffix);
    out
}

/// Character count, not byte count. The budget is defined in characters.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split a file name into stem and extension. The extension, when present,
/// keeps its leading dot and is never edited.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ctx(policy: &Policy) -> EditContext<'_> {
        EditContext {
            policy,
            budget: None,
        }
    }

    #[test]
    fn year_dropped_author_kept() {
        let p = Policy::default();
        let out = EditKind::DropYear.apply("Kingdom - vol_03 (2023) (Dojyomaru)", &ctx(&p));
        assert_eq!(out, "Kingdom - vol_03 (Dojyomaru)");
    }

    #[test]
    fn author_is_rightmost_non_year() {
        let p = Policy::default();
        let out = EditKind::DropAuthor.apply("Kingdom (Extra) (2023) (Dojyomaru)", &ctx(&p));
        assert_eq!(out, "Kingdom (Extra) (2023)");
    }

    #[test]
    fn group_tag_only_when_trailing() {
        let p = Policy::default();
        assert_eq!(
            EditKind::DropGroupTag.apply("Kingdom [Group]", &ctx(&p)),
            "Kingdom"
        );
        // A bracketed token mid-name is not a trailing group tag.
        let kept = EditKind::DropGroupTag.apply("Kingdom [G] - vol_03", &ctx(&p));
        assert_eq!(kept, "Kingdom [G] - vol_03");
    }

    #[test]
    fn volume_ladder() {
        let p = Policy::default();
        let s1 = EditKind::VolumeAbbrev.apply("Book - volume_03", &ctx(&p));
        assert_eq!(s1, "Book - vol_03");
        let s2 = EditKind::VolumeShort.apply(&s1, &ctx(&p));
        assert_eq!(s2, "Book - v03");
        let s3 = EditKind::VolumeStripZero.apply(&s2, &ctx(&p));
        assert_eq!(s3, "Book - v3");
    }

    #[test]
    fn article_and_soft_punctuation() {
        let p = Policy::default();
        assert_eq!(
            EditKind::TitleDropArticle.apply("The Long Title", &ctx(&p)),
            "Long Title"
        );
        assert_eq!(
            EditKind::TitleSoftPunctuation.apply("Hero's Journey: Part One!", &ctx(&p)),
            "Heros Journey Part One"
        );
    }

    #[test]
    fn alias_substitution_only_shortens() {
        let mut p = Policy::default();
        p.title_alias_map.insert(
            "How a Realist Hero Rebuilt the Kingdom".to_string(),
            "Realist Hero".to_string(),
        );
        p.title_alias_map
            .insert("short".to_string(), "much longer text".to_string());

        let out = EditKind::TitleAlias.apply(
            "How a Realist Hero Rebuilt the Kingdom - vol_03",
            &ctx(&p),
        );
        assert_eq!(out, "Realist Hero - vol_03");

        // A lengthening alias is never applied.
        assert_eq!(EditKind::TitleAlias.apply("short", &ctx(&p)), "short");
    }

    #[test]
    fn id_compact_then_drop() {
        let p = Policy::default();
        let c = ctx(&p);
        let s1 = EditKind::IdCompact.apply("Kingdom {ID.B0C8ZW5N6Y}", &c);
        assert_eq!(s1, "Kingdom {B0C8ZW5N6Y}");
        let s2 = EditKind::IdDrop.apply(&s1, &c);
        assert_eq!(s2, "Kingdom");
    }

    #[test]
    fn truncation_respects_word_boundary_and_suffix() {
        let p = Policy::default();
        let c = EditContext {
            policy: &p,
            budget: Some(24),
        };
        let out = EditKind::TitleTruncate.apply("A Very Long Novel Title Indeed - vol_03", &c);
        assert!(char_len(&out) <= 24, "got {out:?}");
        assert!(out.ends_with("- vol_03") || out.ends_with("vol_03"), "got {out:?}");
        assert!(out.contains('…'), "got {out:?}");
    }

    #[test]
    fn truncation_refuses_below_floor() {
        let mut p = Policy::default();
        p.title_min_chars_after_truncation = 20;
        let c = EditContext {
            policy: &p,
            budget: Some(12),
        };
        let input = "A Very Long Novel Title Indeed";
        assert_eq!(EditKind::TitleTruncate.apply(input, &c), input);
    }

    #[test]
    fn no_op_when_pattern_absent() {
        let p = Policy::default();
        let c = ctx(&p);
        for kind in LADDER {
            assert_eq!(kind.apply("PlainName", &c), "PlainName", "{}", kind.name());
        }
    }

    #[test]
    fn ladder_priorities_are_grouped_and_descending() {
        let priorities: Vec<u8> = LADDER.iter().map(|k| k.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
        assert_eq!(steps_for_priority(2).count(), 3);
        assert_eq!(steps_for_priority(1).count(), 4);
        assert_eq!(steps_for_priority(0).count(), 2);
    }

    #[test]
    fn split_extension_variants() {
        assert_eq!(split_extension("book.m4b"), ("book", ".m4b"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    proptest! {
        #[test]
        fn edits_never_grow_input(s in "\\PC{0,80}") {
            let p = Policy::default();
            let c = EditContext { policy: &p, budget: Some(40) };
            for kind in LADDER {
                let out = kind.apply(&s, &c);
                prop_assert!(
                    char_len(&out) <= char_len(&s),
                    "{} grew {:?} to {:?}",
                    kind.name(), s, out
                );
            }
        }
    }
}
