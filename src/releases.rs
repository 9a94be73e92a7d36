use crate::types::Release;
use crate::version::{compare_versions, normalize_tag, CompareOptions};
use std::cmp::Ordering;

/// Releases partitioned by the pre-release flag, each newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSet {
    pub stable: Vec<Release>,
    pub prerelease: Vec<Release>,
}

impl ReleaseSet {
    pub fn latest_stable(&self) -> Option<&Release> {
        self.stable.first()
    }

    pub fn latest_prerelease(&self) -> Option<&Release> {
        self.prerelease.first()
    }
}

fn is_comparable(tag: &str) -> bool {
    compare_versions(tag, tag, CompareOptions::strict()).is_some()
}

/// Newest-first order. Tags that cannot be compared stay after every
/// comparable tag, in input order, so the ordering remains total.
fn descending(a: &Release, b: &Release) -> Ordering {
    let a_tag = normalize_tag(&a.tag_name);
    let b_tag = normalize_tag(&b.tag_name);
    match (is_comparable(a_tag), is_comparable(b_tag)) {
        (true, true) => compare_versions(b_tag, a_tag, CompareOptions::strict())
            .unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

/// Stable sort, newest version first.
pub fn sort_descending(releases: &mut [Release]) {
    releases.sort_by(descending);
}

pub fn classify(releases: &[Release]) -> ReleaseSet {
    let (mut prerelease, mut stable): (Vec<Release>, Vec<Release>) =
        releases.iter().cloned().partition(|r| r.prerelease);

    sort_descending(&mut stable);
    sort_descending(&mut prerelease);

    tracing::debug!(
        "Classified {} stable and {} pre-release(s)",
        stable.len(),
        prerelease.len()
    );

    ReleaseSet { stable, prerelease }
}
