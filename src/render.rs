//! Terminal views for the site's pages.

use crate::changelog::{ChangelogEntry, PlatformDownloads};
use crate::contributors::{Activity, ContributorCard};
use crate::error::SiteError;
use crate::gate::prompt::format_countdown;
use crate::page::{NavBar, Page};
use crate::types::{RateLimitStatus, Release, SiteSettings};
use chrono::{DateTime, Utc};
use console::style;
use std::fmt::Write;

pub fn nav(bar: &NavBar) -> String {
    let mut out = format!("{}\n", style(&bar.title).bold());
    for entry in &bar.entries {
        let marker = if entry.active { "*" } else { " " };
        let label = if entry.active {
            style(&entry.label).cyan().bold().to_string()
        } else {
            entry.label.clone()
        };
        let _ = writeln!(out, " {} {}  {}", marker, label, style(&entry.href).dim());
    }
    out
}

pub fn changelog(entries: &[ChangelogEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let mut heading = style(&entry.version).bold().to_string();
        if let Some(title) = &entry.title {
            let _ = write!(heading, " - {}", title);
        }
        if entry.prerelease {
            let _ = write!(heading, " {}", style("[pre-release]").yellow());
        }
        let _ = writeln!(out, "{}", heading);

        if let Some(released) = &entry.released {
            let _ = writeln!(out, "  Released {}", released);
        }
        let _ = writeln!(out, "  {} downloads", entry.total_downloads);
        for (label, count) in &entry.download_counts {
            let _ = writeln!(out, "    {}: {}", label, count);
        }
        for link in &entry.links {
            match &link.url {
                Some(url) => {
                    let _ = writeln!(out, "  {}: {}", link.label, url);
                }
                None => {
                    let _ = writeln!(out, "  {}: {}", link.label, style("not available").dim());
                }
            }
        }
        if let Some(url) = &entry.comment_url {
            let _ = writeln!(out, "  Discuss: {}", url);
        }
        if let Some(url) = &entry.html_url {
            let _ = writeln!(out, "  {}", style(url).dim());
        }
        let notes = entry.notes.trim();
        if !notes.is_empty() {
            out.push('\n');
            for line in notes.lines() {
                let _ = writeln!(out, "    {}", line);
            }
        }
        out.push('\n');
    }
    out
}

pub fn downloads(platforms: &[PlatformDownloads]) -> String {
    let mut out = String::new();
    for platform in platforms {
        let _ = writeln!(out, "{}", style(platform.platform.display_name()).bold());
        if platform.buttons.is_empty() {
            let _ = writeln!(out, "  {}", style("No Download Found").red());
        }
        for button in &platform.buttons {
            let _ = writeln!(out, "  {}: {}", button.label, button.url);
        }
    }
    out
}

pub fn latest(stable: Option<&Release>, prerelease: Option<&Release>) -> String {
    let tag = |r: Option<&Release>| {
        r.map(|r| r.tag_name.clone())
            .unwrap_or_else(|| "none".to_string())
    };
    format!(
        "Latest release: {}\nLatest pre-release: {}\n",
        tag(stable),
        tag(prerelease)
    )
}

pub fn page(page: &Page) -> String {
    let mut out = nav(&page.nav);
    out.push('\n');
    out.push_str(&latest(
        page.latest_stable.as_ref(),
        page.latest_prerelease.as_ref(),
    ));
    out.push('\n');
    out.push_str(&downloads(&page.downloads));
    out.push('\n');
    out.push_str(&changelog(&page.changelog));
    out
}

fn activity_badge(activity: Activity) -> String {
    match activity {
        Activity::Active => style("active").green().to_string(),
        Activity::Recent => style("recent").yellow().to_string(),
        Activity::Inactive => style("inactive").dim().to_string(),
    }
}

pub fn contributors(cards: &[ContributorCard]) -> String {
    let mut out = String::new();
    for card in cards {
        let _ = writeln!(
            out,
            "{} ({}) {}% [{}]",
            style(&card.login).bold(),
            card.role,
            card.share,
            activity_badge(card.activity)
        );
        if let Some(last) = card.last_commit {
            let _ = writeln!(out, "  Last commit: {}", last.format("%Y-%m-%d"));
        }
        for link in &card.links {
            let _ = writeln!(out, "  {}: {}", link.kind, link.url);
        }
    }
    out
}

pub fn rate_limit(status: &RateLimitStatus, now: DateTime<Utc>) -> String {
    format!(
        "Limit: {}\nRemaining: {}\nUsed: {}\nResets: {} (in {})\n",
        status.limit,
        status.remaining,
        status.used,
        status.reset_at().to_rfc3339(),
        format_countdown((status.reset_at() - now).num_seconds())
    )
}

/// Failure view for any load error. Once `error_count` passes the
/// configured threshold the view also points at the issue tracker.
pub fn failure(
    err: &SiteError,
    error_count: u32,
    settings: &SiteSettings,
    now: DateTime<Utc>,
) -> String {
    let mut out = match err {
        SiteError::RateLimited { reset, .. } => format!(
            "{}\nThe GitHub API rate limit is exhausted. It resets in {}.\n",
            style("Rate limit exceeded").yellow().bold(),
            format_countdown((*reset - now).num_seconds())
        ),
        SiteError::RateLimitTransient { .. } => format!(
            "{}\nGitHub rejected a request but requests remain. Try again shortly.\n",
            style("Request throttled").yellow().bold()
        ),
        other => format!(
            "{}\n{}\n",
            style("Error loading page").red().bold(),
            other
        ),
    };
    if error_count > settings.report_issue_threshold {
        let _ = writeln!(
            out,
            "This keeps failing ({} times in a row). Please report it: {}",
            error_count, settings.issue_url
        );
    }
    out
}
