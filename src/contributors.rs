use crate::error::Result;
use crate::gate::{CacheStore, FetchGate, Transport};
use crate::types::*;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;

/// Last commit within five days.
const ACTIVE_COMMITTER_MAX_SECS: i64 = 432_000;
/// Last commit within a month.
const RECENT_COMMITTER_MAX_SECS: i64 = 2_678_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    Recent,
    Inactive,
}

impl Activity {
    pub fn label(self) -> &'static str {
        match self {
            Activity::Active => "active",
            Activity::Recent => "recent",
            Activity::Inactive => "inactive",
        }
    }
}

pub fn classify_activity(last_commit: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Activity {
    let Some(last) = last_commit else {
        return Activity::Inactive;
    };
    let elapsed = (now - last).num_seconds().abs();
    if elapsed < ACTIVE_COMMITTER_MAX_SECS {
        Activity::Active
    } else if elapsed < RECENT_COMMITTER_MAX_SECS {
        Activity::Recent
    } else {
        Activity::Inactive
    }
}

/// Rounded percentage of all contributions; anyone listed shows at least 1%.
pub fn contribution_share(contributions: u64, total: u64) -> u64 {
    if total == 0 {
        return 1;
    }
    let share = (contributions as f64 / total as f64 * 100.0).round() as u64;
    share.max(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialLink {
    pub kind: &'static str,
    pub url: String,
}

pub fn social_links(login: &str, repo: &str, profile: Option<&ContributorProfile>) -> Vec<SocialLink> {
    let mut links = vec![
        SocialLink {
            kind: "github",
            url: format!("https://github.com/{}", login),
        },
        SocialLink {
            kind: "commits",
            url: format!("https://github.com/{}/commits?author={}", repo, login),
        },
    ];

    let Some(profile) = profile else {
        return links;
    };
    let extra = [
        ("twitter", profile.twitter.as_ref().map(|h| format!("https://twitter.com/{}", h))),
        ("youtube", profile.youtube.as_ref().map(|h| format!("https://youtube.com/{}", h))),
        ("reddit", profile.reddit.as_ref().map(|h| format!("https://reddit.com/u/{}", h))),
        ("facebook", profile.facebook.as_ref().map(|h| format!("https://facebook.com/{}", h))),
        ("payment", profile.payment.clone()),
    ];
    links.extend(
        extra
            .into_iter()
            .filter_map(|(kind, url)| url.map(|url| SocialLink { kind, url })),
    );
    links
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorCard {
    pub login: String,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    pub role: String,
    pub share: u64,
    pub activity: Activity,
    pub last_commit: Option<DateTime<Utc>>,
    pub links: Vec<SocialLink>,
}

pub fn build_card(
    contributor: &Contributor,
    total: u64,
    directory: &ContributorDirectory,
    repo: &str,
    last_commit: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ContributorCard {
    let profile = directory.get(&contributor.login);
    ContributorCard {
        login: contributor.login.clone(),
        avatar_url: contributor.avatar_url.clone(),
        profile_url: contributor.html_url.clone(),
        role: profile
            .and_then(|p| p.role.clone())
            .unwrap_or_else(|| "Contributor".to_string()),
        share: contribution_share(contributor.contributions, total),
        activity: classify_activity(last_commit, now),
        last_commit,
        links: social_links(&contributor.login, repo, profile),
    }
}

async fn last_commit_date<T: Transport, S: CacheStore>(
    gate: &FetchGate<T, S>,
    settings: &SiteSettings,
    login: &str,
    force: bool,
) -> Result<Option<DateTime<Utc>>> {
    let locator = settings.commits_locator(login);
    match gate.get_as::<Vec<CommitRecord>>(&locator, force).await {
        Ok(commits) => Ok(commits.first().map(|c| c.commit.author.date)),
        Err(e) if e.is_exhausted() => Err(e),
        Err(e) => {
            tracing::warn!("Could not load commits for {}: {}", login, e);
            Ok(None)
        }
    }
}

/// Fetches contributors, their local profiles and last commit dates. Commit
/// lookups run concurrently.
pub async fn load_contributors<T: Transport, S: CacheStore>(
    gate: &FetchGate<T, S>,
    settings: &SiteSettings,
    force: bool,
    now: DateTime<Utc>,
) -> Result<Vec<ContributorCard>> {
    let contributors: Vec<Contributor> = gate
        .get_as(&settings.contributors_locator(), force)
        .await?;
    let total: u64 = contributors.iter().map(|c| c.contributions).sum();

    let directory: ContributorDirectory = match gate.get_as("contributors.json", force).await {
        Ok(directory) => directory,
        Err(e) if e.is_exhausted() => return Err(e),
        Err(e) => {
            tracing::warn!("No contributor directory: {}", e);
            ContributorDirectory::new()
        }
    };

    let lookups = contributors
        .iter()
        .map(|c| last_commit_date(gate, settings, &c.login, force));
    let last_commits = join_all(lookups).await;

    contributors
        .iter()
        .zip(last_commits)
        .map(|(contributor, last)| -> Result<ContributorCard> {
            let last = last?;
            let card = build_card(contributor, total, &directory, &settings.repo, last, now);
            tracing::debug!("{} - {}", card.login, card.activity.label());
            Ok(card)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{DeclinePrompt, GateOptions, MemoryStore, RawResponse};
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;

    struct FixedTransport {
        responses: HashMap<String, String>,
    }

    impl Transport for FixedTransport {
        async fn fetch(&self, locator: &str) -> Result<RawResponse> {
            Ok(match self.responses.get(locator) {
                Some(body) => RawResponse::ok(body.clone()),
                None => RawResponse {
                    status: 404,
                    body: r#"{"message":"Not Found"}"#.to_string(),
                },
            })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_activity_thresholds() {
        let now = now();
        assert_eq!(classify_activity(Some(now - Duration::days(2)), now), Activity::Active);
        assert_eq!(classify_activity(Some(now - Duration::days(20)), now), Activity::Recent);
        assert_eq!(classify_activity(Some(now - Duration::days(40)), now), Activity::Inactive);
        assert_eq!(classify_activity(None, now), Activity::Inactive);
    }

    #[test]
    fn test_contribution_share_rounds_and_floors_at_one() {
        assert_eq!(contribution_share(1, 3), 33);
        assert_eq!(contribution_share(2, 3), 67);
        assert_eq!(contribution_share(1, 1000), 1);
        assert_eq!(contribution_share(0, 0), 1);
    }

    #[test]
    fn test_card_uses_directory_profile() {
        let contributor = Contributor {
            login: "podshot".to_string(),
            avatar_url: None,
            html_url: Some("https://github.com/podshot".to_string()),
            contributions: 50,
        };
        let mut directory = ContributorDirectory::new();
        directory.insert(
            "podshot".to_string(),
            ContributorProfile {
                twitter: Some("podshot".to_string()),
                role: Some("Developer".to_string()),
                ..Default::default()
            },
        );

        let card = build_card(
            &contributor,
            200,
            &directory,
            "Khroki/MCEdit-Unified",
            Some(now() - Duration::hours(1)),
            now(),
        );

        assert_eq!(card.role, "Developer");
        assert_eq!(card.share, 25);
        assert_eq!(card.activity, Activity::Active);
        let kinds: Vec<_> = card.links.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec!["github", "commits", "twitter"]);
        assert_eq!(card.links[2].url, "https://twitter.com/podshot");
    }

    #[test]
    fn test_card_defaults_without_profile() {
        let contributor = Contributor {
            login: "someone".to_string(),
            avatar_url: None,
            html_url: None,
            contributions: 1,
        };
        let card = build_card(
            &contributor,
            10,
            &ContributorDirectory::new(),
            "Khroki/MCEdit-Unified",
            None,
            now(),
        );
        assert_eq!(card.role, "Contributor");
        assert_eq!(card.activity, Activity::Inactive);
        assert_eq!(card.links.len(), 2);
    }

    #[tokio::test]
    async fn test_load_contributors_without_directory() {
        let settings = SiteSettings::default();
        let recent = (now() - Duration::days(10)).to_rfc3339();
        let mut responses = HashMap::new();
        responses.insert(
            settings.contributors_locator(),
            r#"[{"login":"Khroki","contributions":30},{"login":"gone","contributions":10}]"#
                .to_string(),
        );
        responses.insert(
            settings.commits_locator("Khroki"),
            format!(r#"[{{"commit":{{"author":{{"date":"{}"}}}}}}]"#, recent),
        );
        let gate = FetchGate::new(
            FixedTransport { responses },
            MemoryStore::new(),
            GateOptions::from_settings(&settings),
            Box::new(DeclinePrompt),
        );

        let cards = load_contributors(&gate, &settings, false, now()).await.unwrap();

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].login, "Khroki");
        assert_eq!(cards[0].share, 75);
        assert_eq!(cards[0].activity, Activity::Recent);
        assert_eq!(cards[1].activity, Activity::Inactive);
        assert!(cards[1].last_commit.is_none());
        assert!(cards.iter().all(|c| c.role == "Contributor"));
    }

    #[tokio::test]
    async fn test_transient_rate_limit_on_commits_degrades() {
        let settings = SiteSettings::default();
        let mut responses = HashMap::new();
        responses.insert(
            settings.contributors_locator(),
            r#"[{"login":"Khroki","contributions":30}]"#.to_string(),
        );
        responses.insert(
            settings.commits_locator("Khroki"),
            r#"{"message":"API rate limit exceeded for 203.0.113.7."}"#.to_string(),
        );
        responses.insert(
            settings.rate_limit_locator(),
            r#"{"rate":{"limit":60,"remaining":30,"reset":1433116800}}"#.to_string(),
        );
        let gate = FetchGate::new(
            FixedTransport { responses },
            MemoryStore::new(),
            GateOptions::from_settings(&settings),
            Box::new(DeclinePrompt),
        );

        let cards = load_contributors(&gate, &settings, false, now()).await.unwrap();

        assert_eq!(cards.len(), 1);
        assert!(cards[0].last_commit.is_none());
        assert_eq!(cards[0].activity, Activity::Inactive);
    }

    #[tokio::test]
    async fn test_exhausted_rate_limit_on_commits_aborts() {
        let settings = SiteSettings::default();
        let mut responses = HashMap::new();
        responses.insert(
            settings.contributors_locator(),
            r#"[{"login":"Khroki","contributions":30}]"#.to_string(),
        );
        responses.insert(
            settings.commits_locator("Khroki"),
            r#"{"message":"API rate limit exceeded for 203.0.113.7."}"#.to_string(),
        );
        responses.insert(
            settings.rate_limit_locator(),
            r#"{"rate":{"limit":60,"remaining":0,"reset":1433116800}}"#.to_string(),
        );
        let gate = FetchGate::new(
            FixedTransport { responses },
            MemoryStore::new(),
            GateOptions::from_settings(&settings),
            Box::new(DeclinePrompt),
        );

        let err = load_contributors(&gate, &settings, false, now()).await.unwrap_err();
        assert!(err.is_exhausted());
    }
}
