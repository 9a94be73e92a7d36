//! Dotted version string comparison.
//!
//! Tags are compared segment by segment. In strict mode every segment must be
//! all digits; in lexicographic mode a segment may carry a trailing run of
//! letters (`2b`, `10rc`). Inputs with an invalid segment are not comparable.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Accept `\d+[A-Za-z]*` segments and compare them as strings.
    pub lexicographical: bool,
    /// Pad the shorter side with `0` segments before comparing.
    pub zero_extend: bool,
}

impl CompareOptions {
    pub fn strict() -> Self {
        Self::default()
    }
}

fn is_valid_segment(segment: &str, lexicographical: bool) -> bool {
    let digits = segment.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return false;
    }
    let rest = &segment[digits..];
    if lexicographical {
        rest.bytes().all(|b| b.is_ascii_alphabetic())
    } else {
        rest.is_empty()
    }
}

/// Numeric order of two digit strings of any length.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Three-way comparison of two version strings. `None` means at least one
/// segment failed validation for the chosen mode.
pub fn compare_versions(a: &str, b: &str, options: CompareOptions) -> Option<Ordering> {
    let mut left: Vec<&str> = a.split('.').collect();
    let mut right: Vec<&str> = b.split('.').collect();

    let valid = |s: &&str| is_valid_segment(s, options.lexicographical);
    if !left.iter().all(valid) || !right.iter().all(valid) {
        return None;
    }

    if options.zero_extend {
        while left.len() < right.len() {
            left.push("0");
        }
        while right.len() < left.len() {
            right.push("0");
        }
    }

    for (l, r) in left.iter().zip(right.iter()) {
        let ord = if options.lexicographical {
            l.cmp(r)
        } else {
            compare_digits(l, r)
        };
        if ord != Ordering::Equal {
            return Some(ord);
        }
    }

    Some(left.len().cmp(&right.len()))
}

/// Integer form of a comparison result: -1, 0 or 1.
pub fn ordering_sign(ordering: Ordering) -> i32 {
    match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Human form used by the CLI, with `NaN` for the not-comparable case.
pub fn format_comparison(result: Option<Ordering>) -> String {
    match result {
        Some(ord) => ordering_sign(ord).to_string(),
        None => "NaN".to_string(),
    }
}

/// Tag text as compared: GitHub tags frequently carry a leading `v`.
pub fn normalize_tag(tag: &str) -> &str {
    tag.trim().trim_start_matches('v')
}
