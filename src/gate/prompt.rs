use crate::types::RateLimitStatus;
use chrono::Utc;
use console::{style, Term};

/// Blocking, user-acknowledged reload confirmation shown when the API rate
/// limit is exhausted. Returns whether the user asked for a reload.
pub trait ReloadPrompt: Send + Sync {
    fn confirm_reload(&self, status: &RateLimitStatus) -> bool;
}

/// Formats the time left until the limit resets, e.g. `12m 03s`.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

pub struct ConsolePrompt {
    term: Term,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadPrompt for ConsolePrompt {
    fn confirm_reload(&self, status: &RateLimitStatus) -> bool {
        let left = (status.reset_at() - Utc::now()).num_seconds();
        let warning = format!(
            "GitHub API rate limit exceeded ({} of {} requests left). Resets in {}.",
            status.remaining,
            status.limit,
            format_countdown(left)
        );
        let _ = self.term.write_line(&style(warning).yellow().bold().to_string());

        if !self.term.is_term() || !console::user_attended_stderr() {
            return false;
        }

        let _ = self.term.write_str("Reload now? [y/N] ");
        match self.term.read_line() {
            Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                tracing::debug!("Could not read reload confirmation: {}", e);
                false
            }
        }
    }
}

/// Prompt for non-interactive runs: reports and never reloads.
pub struct DeclinePrompt;

impl ReloadPrompt for DeclinePrompt {
    fn confirm_reload(&self, status: &RateLimitStatus) -> bool {
        tracing::warn!(
            "Rate limit exhausted; resets at {}",
            status.reset_at().to_rfc3339()
        );
        false
    }
}
