use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::PartialEq;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CacheBackend {
    #[serde(rename = "memory")]
    Memory,
    #[serde(rename = "disk")]
    #[default]
    Disk,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvictionMode {
    #[serde(rename = "clear-on-reset")]
    #[default]
    ClearOnReset,
    #[serde(rename = "clear-prefixed")]
    ClearPrefixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteSettings {
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_site_root")]
    pub site_root: String,
    #[serde(default = "default_site_title")]
    pub site_title: String,
    #[serde(default = "default_product_name")]
    pub product_name: String,
    #[serde(default = "default_bit_suffix")]
    pub bit_suffix: String,
    #[serde(default)]
    pub cache_backend: CacheBackend,
    #[serde(default = "default_cache_namespace")]
    pub cache_namespace: String,
    #[serde(default)]
    pub eviction: EvictionMode,
    /// Remaining count that marks a freshly reset window; 0 means the limit
    /// the API reports.
    #[serde(default)]
    pub fresh_limit: u32,
    #[serde(default)]
    pub rate_limit_threshold: u32,
    #[serde(default = "default_text_fallback")]
    pub text_fallback: bool,
    #[serde(default = "default_report_issue_threshold")]
    pub report_issue_threshold: u32,
    #[serde(default = "default_issue_url")]
    pub issue_url: String,
}

fn default_repo() -> String {
    "Khroki/MCEdit-Unified".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_site_root() -> String {
    ".".to_string()
}
fn default_site_title() -> String {
    "MCEdit Fork".to_string()
}
fn default_product_name() -> String {
    "MCEdit".to_string()
}
fn default_bit_suffix() -> String {
    "bit".to_string()
}
fn default_cache_namespace() -> String {
    "mcsite:".to_string()
}
fn default_text_fallback() -> bool {
    true
}
fn default_report_issue_threshold() -> u32 {
    3
}
fn default_issue_url() -> String {
    format!("https://github.com/{}/issues/new", default_repo())
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            api_base: default_api_base(),
            site_root: default_site_root(),
            site_title: default_site_title(),
            product_name: default_product_name(),
            bit_suffix: default_bit_suffix(),
            cache_backend: CacheBackend::default(),
            cache_namespace: default_cache_namespace(),
            eviction: EvictionMode::default(),
            fresh_limit: 0,
            rate_limit_threshold: 0,
            text_fallback: default_text_fallback(),
            report_issue_threshold: default_report_issue_threshold(),
            issue_url: default_issue_url(),
        }
    }
}

impl SiteSettings {
    pub fn releases_locator(&self) -> String {
        format!("{}/repos/{}/releases", self.api_base, self.repo)
    }

    pub fn contributors_locator(&self) -> String {
        format!("{}/repos/{}/contributors", self.api_base, self.repo)
    }

    pub fn commits_locator(&self, login: &str) -> String {
        format!("{}/repos/{}/commits?author={}", self.api_base, self.repo, login)
    }

    pub fn rate_limit_locator(&self) -> String {
        format!("{}/rate_limit", self.api_base)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SiteConfig {
    #[serde(default)]
    pub settings: SiteSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub download_count: u64,
    pub browser_download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavItem {
    pub url: String,
    pub displayname: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NavDocument {
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub navbar: Vec<NavItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contributor {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub contributions: u64,
}

/// Local enrichment for a contributor, keyed by login in `contributors.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContributorProfile {
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub youtube: Option<String>,
    #[serde(default)]
    pub reddit: Option<String>,
    #[serde(default)]
    pub facebook: Option<String>,
    #[serde(default)]
    pub payment: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

pub type ContributorDirectory = HashMap<String, ContributorProfile>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitAuthor {
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitDetail {
    pub author: CommitAuthor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRecord {
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the window resets.
    pub reset: i64,
    #[serde(default)]
    pub used: u32,
}

impl RateLimitStatus {
    pub fn reset_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.reset, 0).unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitResponse {
    pub rate: RateLimitStatus,
}
