//! Changelog and download views built from release records.

use crate::platform::{download_label, find_download, AssetNaming, BitWidth, Platform};
use crate::releases::sort_descending;
use crate::types::Release;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Version tag → discussion URL, from `comments.json`.
pub type CommentDirectory = HashMap<String, String>;

/// Download buttons shown next to every changelog entry.
const CHANGELOG_TARGETS: &[(Platform, BitWidth, &str)] = &[
    (Platform::Win, BitWidth::X64, "Windows 64 bit"),
    (Platform::Win, BitWidth::X32, "Windows 32 bit"),
    (Platform::Osx, BitWidth::X64, "OS X"),
    (Platform::Lin, BitWidth::Universal, "Linux"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub label: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogEntry {
    pub version: String,
    pub title: Option<String>,
    pub html_url: Option<String>,
    pub prerelease: bool,
    pub released: Option<String>,
    pub total_downloads: u64,
    /// Per-asset download counts, most downloaded first.
    pub download_counts: Vec<(String, u64)>,
    pub links: Vec<DownloadLink>,
    pub comment_url: Option<String>,
    pub notes: String,
}

/// `42s ago`, `5m ago`, `3 hours ago`, `12 days ago`, or the date itself
/// once a release is older than 30 days.
pub fn relative_time(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - published).num_milliseconds().max(0) as f64 / 1000.0;
    if seconds < 60.0 {
        format!("{}s ago", seconds.round())
    } else if seconds < 60.0 * 60.0 {
        format!("{}m ago", (seconds / 60.0).round())
    } else if seconds < 60.0 * 60.0 * 24.0 {
        format!("{} hours ago", (seconds / 3600.0).round())
    } else if seconds < 60.0 * 60.0 * 24.0 * 30.0 {
        format!("{} days ago", (seconds / 86400.0).round())
    } else {
        published.format("%Y-%m-%d").to_string()
    }
}

fn mention_pattern() -> &'static Regex {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    MENTION.get_or_init(|| Regex::new(r"@([a-zA-Z0-9]+)").expect("valid mention pattern"))
}

/// Appends the GitHub profile URL to every `@login` mention.
pub fn linkify_mentions(notes: &str) -> String {
    mention_pattern()
        .replace_all(notes, "@$1 <https://github.com/$1>")
        .into_owned()
}

pub fn build_entry(
    release: &Release,
    all_releases: &[Release],
    comments: &CommentDirectory,
    naming: &AssetNaming,
    now: DateTime<Utc>,
) -> ChangelogEntry {
    let version = release.tag_name.clone();

    let mut assets: Vec<_> = release.assets.iter().collect();
    assets.sort_by(|a, b| b.download_count.cmp(&a.download_count));
    let download_counts = assets
        .iter()
        .map(|a| (download_label(&a.name, &version), a.download_count))
        .collect();
    let total_downloads = release.assets.iter().map(|a| a.download_count).sum();

    let links = CHANGELOG_TARGETS
        .iter()
        .map(|(platform, bits, label)| DownloadLink {
            label: label.to_string(),
            url: find_download(all_releases, *platform, &version, *bits, naming)
                .map(|a| a.browser_download_url.clone()),
        })
        .collect();

    ChangelogEntry {
        title: release.name.clone().filter(|n| !n.is_empty()),
        html_url: release.html_url.clone(),
        prerelease: release.prerelease,
        released: release.published_at.map(|p| relative_time(p, now)),
        total_downloads,
        download_counts,
        links,
        comment_url: comments.get(&version).cloned(),
        notes: linkify_mentions(release.body.as_deref().unwrap_or_default()),
        version,
    }
}

/// Every release, newest version first.
pub fn build_changelog(
    releases: &[Release],
    comments: &CommentDirectory,
    naming: &AssetNaming,
    now: DateTime<Utc>,
) -> Vec<ChangelogEntry> {
    let mut ordered = releases.to_vec();
    sort_descending(&mut ordered);
    ordered
        .iter()
        .map(|r| build_entry(r, releases, comments, naming, now))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDownloads {
    pub platform: Platform,
    /// Empty when no build exists for the platform.
    pub buttons: Vec<DownloadButton>,
}

/// Download buttons for `latest`, per platform: one universal build, or
/// separate 32 and 64 bit builds.
pub fn build_downloads(
    latest: &Release,
    all_releases: &[Release],
    naming: &AssetNaming,
) -> Vec<PlatformDownloads> {
    let version = latest.tag_name.as_str();
    Platform::ALL
        .iter()
        .map(|&platform| {
            let find = |bits| find_download(all_releases, platform, version, bits, naming);
            let buttons = if let Some(universal) = find(BitWidth::Universal) {
                vec![DownloadButton {
                    label: format!("Version {} 32/64bit", version),
                    url: universal.browser_download_url.clone(),
                }]
            } else {
                [BitWidth::X32, BitWidth::X64]
                    .into_iter()
                    .filter_map(|bits| {
                        find(bits).map(|asset| DownloadButton {
                            label: format!("Version {} {}bit", version, bits),
                            url: asset.browser_download_url.clone(),
                        })
                    })
                    .collect()
            };
            PlatformDownloads { platform, buttons }
        })
        .collect()
}
