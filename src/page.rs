//! Page-load state machine.
//!
//! A [`PageSession`] walks `INIT → FETCH_NAV → RENDER_NAV → FETCH_RELEASES →
//! CLASSIFY → RENDER_CHANGELOG/DOWNLOADS → DONE`. Any step may instead end in
//! `RATE_LIMITED` or `LOAD_ERROR`; both are terminal and only a reload (a new
//! session) starts over at `INIT`.

use crate::changelog::{
    build_changelog, build_downloads, ChangelogEntry, CommentDirectory, PlatformDownloads,
};
use crate::error::{Result, SiteError};
use crate::gate::{CacheStore, FetchGate, Transport};
use crate::platform::AssetNaming;
use crate::releases::classify;
use crate::types::*;
use chrono::{DateTime, Utc};
use std::fmt;

pub const NAV_LOCATOR: &str = "navbar.json";
pub const COMMENTS_LOCATOR: &str = "comments.json";
/// Stored outside the cache namespace so clearing cached responses keeps it.
pub const ERROR_COUNT_KEY: &str = "mcsite.error-count";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    Init,
    FetchNav,
    RenderNav,
    FetchReleases,
    Classify,
    RenderChangelog,
    Done,
    RateLimited {
        reset: DateTime<Utc>,
        reload_requested: bool,
    },
    LoadError(String),
}

impl PageState {
    pub fn name(&self) -> &'static str {
        match self {
            PageState::Init => "INIT",
            PageState::FetchNav => "FETCH_NAV",
            PageState::RenderNav => "RENDER_NAV",
            PageState::FetchReleases => "FETCH_RELEASES",
            PageState::Classify => "CLASSIFY",
            PageState::RenderChangelog => "RENDER_CHANGELOG/DOWNLOADS",
            PageState::Done => "DONE",
            PageState::RateLimited { .. } => "RATE_LIMITED",
            PageState::LoadError(_) => "LOAD_ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PageState::Done | PageState::RateLimited { .. } | PageState::LoadError(_)
        )
    }

    fn successor(&self) -> Option<PageState> {
        let next = match self {
            PageState::Init => PageState::FetchNav,
            PageState::FetchNav => PageState::RenderNav,
            PageState::RenderNav => PageState::FetchReleases,
            PageState::FetchReleases => PageState::Classify,
            PageState::Classify => PageState::RenderChangelog,
            PageState::RenderChangelog => PageState::Done,
            _ => return None,
        };
        Some(next)
    }

    pub fn can_advance_to(&self, next: &PageState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            PageState::RateLimited { .. } | PageState::LoadError(_) => true,
            other => self.successor().as_ref() == Some(other),
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub label: String,
    pub href: String,
    pub icon: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavBar {
    pub title: String,
    pub entries: Vec<NavEntry>,
}

/// Builds the navigation bar; the entry whose `root + url` equals the
/// current page (ignoring `#`) is active and names the page title.
pub fn build_nav(doc: &NavDocument, current_page: Option<&str>, site_title: &str) -> NavBar {
    let current = current_page.map(|p| p.replace('#', ""));
    let mut title = site_title.to_string();

    let entries = doc
        .navbar
        .iter()
        .filter(|item| !item.hidden)
        .map(|item| {
            let href = format!("{}{}", doc.root, item.url);
            let active = current.as_deref() == Some(href.as_str());
            if active {
                title = format!("{} - {}", site_title, item.displayname);
            }
            NavEntry {
                label: item.displayname.clone(),
                href,
                icon: item.icon.clone(),
                active,
            }
        })
        .collect();

    NavBar { title, entries }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub nav: NavBar,
    pub changelog: Vec<ChangelogEntry>,
    pub downloads: Vec<PlatformDownloads>,
    pub latest_stable: Option<Release>,
    pub latest_prerelease: Option<Release>,
}

pub fn error_count<S: CacheStore>(store: &S) -> u32 {
    store
        .get(ERROR_COUNT_KEY)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn record_failure<S: CacheStore>(store: &S) -> u32 {
    let count = error_count(store) + 1;
    if let Err(e) = store.set(ERROR_COUNT_KEY, count.to_string()) {
        tracing::warn!("Could not record load failure: {}", e);
    }
    count
}

fn reset_failures<S: CacheStore>(store: &S) {
    if let Err(e) = store.remove(ERROR_COUNT_KEY) {
        tracing::warn!("Could not reset load failure count: {}", e);
    }
}

/// Discussion links per version. The file is optional; anything but an
/// exhausted rate limit degrades to no links.
pub async fn load_comments<T: Transport, S: CacheStore>(
    gate: &FetchGate<T, S>,
    force: bool,
) -> Result<CommentDirectory> {
    match gate.get_as(COMMENTS_LOCATOR, force).await {
        Ok(comments) => Ok(comments),
        Err(e) if e.is_exhausted() => Err(e),
        Err(e) => {
            tracing::warn!("Comments unavailable: {}", e);
            Ok(CommentDirectory::new())
        }
    }
}

pub struct PageSession<'a, T, S> {
    gate: &'a FetchGate<T, S>,
    settings: &'a SiteSettings,
    current_page: Option<String>,
    force: bool,
    state: PageState,
    history: Vec<PageState>,
}

impl<'a, T: Transport, S: CacheStore> PageSession<'a, T, S> {
    pub fn new(
        gate: &'a FetchGate<T, S>,
        settings: &'a SiteSettings,
        current_page: Option<String>,
        force: bool,
    ) -> Self {
        Self {
            gate,
            settings,
            current_page,
            force,
            state: PageState::Init,
            history: vec![PageState::Init],
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn history(&self) -> &[PageState] {
        &self.history
    }

    fn advance(&mut self, next: PageState) {
        debug_assert!(
            self.state.can_advance_to(&next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!("Page state {} -> {}", self.state, next);
        self.history.push(next.clone());
        self.state = next;
    }

    /// Runs the session to a terminal state.
    pub async fn load(&mut self, now: DateTime<Utc>) -> Result<Page> {
        match self.run(now).await {
            Ok(page) => {
                self.advance(PageState::Done);
                reset_failures(self.gate.store());
                Ok(page)
            }
            Err(SiteError::RateLimited {
                reset,
                reload_requested,
            }) => {
                self.advance(PageState::RateLimited {
                    reset,
                    reload_requested,
                });
                Err(SiteError::RateLimited {
                    reset,
                    reload_requested,
                })
            }
            Err(e) => {
                self.advance(PageState::LoadError(e.to_string()));
                let failures = record_failure(self.gate.store());
                tracing::error!("Page load failed ({} consecutive): {}", failures, e);
                Err(e)
            }
        }
    }

    async fn run(&mut self, now: DateTime<Utc>) -> Result<Page> {
        if let Err(e) = self.gate.refresh_on_reset().await {
            tracing::debug!("Skipping rate limit reset check: {}", e);
        }

        self.advance(PageState::FetchNav);
        let nav_doc: NavDocument = self.gate.get_as(NAV_LOCATOR, self.force).await?;

        self.advance(PageState::RenderNav);
        let nav = build_nav(&nav_doc, self.current_page.as_deref(), &self.settings.site_title);

        self.advance(PageState::FetchReleases);
        let releases: Vec<Release> = self
            .gate
            .get_as(&self.settings.releases_locator(), self.force)
            .await?;
        let comments = load_comments(self.gate, self.force).await?;

        self.advance(PageState::Classify);
        let set = classify(&releases);

        self.advance(PageState::RenderChangelog);
        let naming = AssetNaming::from_settings(self.settings);
        let changelog = build_changelog(&releases, &comments, &naming, now);
        let downloads = set
            .latest_stable()
            .or(set.latest_prerelease())
            .map(|latest| build_downloads(latest, &releases, &naming))
            .unwrap_or_default();

        Ok(Page {
            nav,
            changelog,
            downloads,
            latest_stable: set.latest_stable().cloned(),
            latest_prerelease: set.latest_prerelease().cloned(),
        })
    }
}
