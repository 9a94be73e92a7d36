//! Response cache and fetch gate.
//!
//! Every remote or local resource the site reads goes through a
//! [`FetchGate`]. The gate returns a cached copy when one exists, otherwise
//! retrieves the locator, parses it and stores the raw body under
//! `<namespace><locator>`. Rate-limit responses from the API are detected
//! from the parsed body and never cached.

pub mod prompt;
pub mod store;
pub mod transport;

pub use prompt::{ConsolePrompt, DeclinePrompt, ReloadPrompt};
pub use store::{AnyStore, CacheStore, FileStore, MemoryStore};
pub use transport::{RawResponse, SiteTransport, Transport};

use crate::error::{Result, SiteError};
use crate::types::{EvictionMode, RateLimitResponse, RateLimitStatus, SiteSettings};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};

const RATE_LIMIT_MARKER: &str = "API rate limit exceeded";

type Flights = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    fn is_rate_limited(&self) -> bool {
        self.as_json()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .is_some_and(|m| m.starts_with(RATE_LIMIT_MARKER))
    }

    fn message(&self) -> String {
        match self {
            Payload::Json(value) => value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string()),
            Payload::Text(text) => text.clone(),
        }
    }
}

/// What to drop from the cache around a rate-limit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Wipe the whole store once the status shows a freshly reset window:
    /// `remaining` equals `fresh_limit`, or the reported limit when unset.
    /// Exhaustion evicts only the failed locator.
    ClearOnReset { fresh_limit: Option<u32> },
    /// On exhaustion, drop every key carrying the gate namespace.
    ClearPrefixed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOptions {
    pub namespace: String,
    pub rate_limit_locator: String,
    /// The limit counts as exhausted when `remaining <= threshold`.
    pub rate_limit_threshold: u32,
    pub eviction: EvictionPolicy,
    pub text_fallback: bool,
}

impl GateOptions {
    pub fn from_settings(settings: &SiteSettings) -> Self {
        let eviction = match settings.eviction {
            EvictionMode::ClearOnReset => EvictionPolicy::ClearOnReset {
                fresh_limit: Some(settings.fresh_limit).filter(|&n| n > 0),
            },
            EvictionMode::ClearPrefixed => EvictionPolicy::ClearPrefixed,
        };
        Self {
            namespace: settings.cache_namespace.clone(),
            rate_limit_locator: settings.rate_limit_locator(),
            rate_limit_threshold: settings.rate_limit_threshold,
            eviction,
            text_fallback: settings.text_fallback,
        }
    }
}

pub struct FetchGate<T, S> {
    transport: T,
    store: S,
    options: GateOptions,
    prompt: Box<dyn ReloadPrompt>,
    /// Set once the reload prompt has been shown; later exhaustion in the
    /// same session fails without asking again.
    prompted: AtomicBool,
    flights: Mutex<Flights>,
}

impl<T: Transport, S: CacheStore> FetchGate<T, S> {
    pub fn new(transport: T, store: S, options: GateOptions, prompt: Box<dyn ReloadPrompt>) -> Self {
        Self {
            transport,
            store,
            options,
            prompt,
            prompted: AtomicBool::new(false),
            flights: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &GateOptions {
        &self.options
    }

    pub fn cache_key(&self, locator: &str) -> String {
        format!("{}{}", self.options.namespace, locator)
    }

    pub fn is_cached(&self, locator: &str) -> bool {
        self.store.get(&self.cache_key(locator)).is_some()
    }

    pub fn cached_locators(&self) -> Vec<String> {
        let mut locators: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.options.namespace).map(str::to_string))
            .collect();
        locators.sort();
        locators
    }

    /// Drops every entry this gate wrote.
    pub fn clear(&self) -> Result<usize> {
        let removed = self.store.remove_prefixed(&self.options.namespace)?;
        tracing::debug!("Cleared {} cached response(s)", removed);
        Ok(removed)
    }

    pub fn evict(&self, locator: &str) -> Result<bool> {
        let removed = self.store.remove(&self.cache_key(locator))?;
        if removed {
            tracing::debug!("Evicted cached response for {}", locator);
        }
        Ok(removed)
    }

    fn flights(&self) -> MutexGuard<'_, Flights> {
        match self.flights.lock() {
            Ok(flights) => flights,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn flight(&self, locator: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.flights().entry(locator.to_string()).or_default().clone()
    }

    /// Drops the lock entry once no other caller holds or waits on it.
    fn land(&self, locator: &str, flight: Arc<tokio::sync::Mutex<()>>) {
        let mut flights = self.flights();
        // One reference in the map, one held here.
        if Arc::strong_count(&flight) == 2 {
            flights.remove(locator);
        }
    }

    fn parse(&self, locator: &str, body: &str) -> Result<Payload> {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => Ok(Payload::Json(value)),
            Err(e) if self.options.text_fallback => {
                tracing::debug!("{} is not JSON ({}); keeping raw text", locator, e);
                Ok(Payload::Text(body.to_string()))
            }
            Err(source) => Err(SiteError::Parse {
                locator: locator.to_string(),
                source,
            }),
        }
    }

    /// Returns the payload for `locator`, from cache unless `force` is set.
    pub async fn get(&self, locator: &str, force: bool) -> Result<Payload> {
        if locator == self.options.rate_limit_locator {
            let response = self.transport.fetch(locator).await?;
            return self.parse(locator, &response.body);
        }

        let flight = self.flight(locator);
        let result = {
            let _in_flight = flight.lock().await;
            self.get_exclusive(locator, force).await
        };
        self.land(locator, flight);
        result
    }

    async fn get_exclusive(&self, locator: &str, force: bool) -> Result<Payload> {
        let key = self.cache_key(locator);
        if !force {
            if let Some(body) = self.store.get(&key) {
                tracing::debug!("Cache hit for {}", locator);
                return self.parse(locator, &body).inspect_err(|_| self.discard(locator));
            }
        }
        tracing::debug!("Cache miss for {} (forced: {})", locator, force);

        let response = self.transport.fetch(locator).await?;
        let payload = self.parse(locator, &response.body)?;

        if payload.is_rate_limited() {
            return Err(self.handle_rate_limit(locator).await);
        }

        if !response.is_success() {
            return Err(SiteError::Http {
                locator: locator.to_string(),
                status: response.status,
                message: payload.message(),
            });
        }

        self.store.set(&key, response.body)?;
        Ok(payload)
    }

    /// Typed view of [`get`](Self::get). A body that does not fit `D` is
    /// dropped from the cache so the next request retrieves it again.
    pub async fn get_as<D: DeserializeOwned>(&self, locator: &str, force: bool) -> Result<D> {
        let typed = match self.get(locator, force).await? {
            Payload::Json(value) => serde_json::from_value(value).map_err(|source| SiteError::Parse {
                locator: locator.to_string(),
                source,
            }),
            Payload::Text(_) => Err(SiteError::NotJson {
                locator: locator.to_string(),
            }),
        };
        typed.inspect_err(|_| self.discard(locator))
    }

    fn discard(&self, locator: &str) {
        if let Err(e) = self.evict(locator) {
            tracing::warn!("Could not evict {}: {}", locator, e);
        }
    }

    /// Always retrieved; the status is never cached.
    pub async fn rate_limit_status(&self) -> Result<RateLimitStatus> {
        let locator = self.options.rate_limit_locator.as_str();
        let raw = self.transport.fetch(locator).await?;
        let response: RateLimitResponse =
            serde_json::from_str(&raw.body).map_err(|source| SiteError::Parse {
                locator: locator.to_string(),
                source,
            })?;
        tracing::debug!(
            "Rate limit: {}/{} remaining, resets at {}",
            response.rate.remaining,
            response.rate.limit,
            response.rate.reset
        );
        Ok(response.rate)
    }

    /// Applies the clear-on-reset policy. Returns whether the store was
    /// cleared.
    pub async fn refresh_on_reset(&self) -> Result<bool> {
        let EvictionPolicy::ClearOnReset { fresh_limit } = self.options.eviction else {
            return Ok(false);
        };
        let status = self.rate_limit_status().await?;
        if status.remaining == fresh_limit.unwrap_or(status.limit) {
            tracing::info!("Rate limit window is fresh; clearing cached responses");
            self.store.clear()?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn handle_rate_limit(&self, locator: &str) -> SiteError {
        tracing::warn!("Rate limit response for {}", locator);

        let status = match self.rate_limit_status().await {
            Ok(status) => status,
            Err(e) => return e,
        };

        if status.remaining > self.options.rate_limit_threshold {
            tracing::info!(
                "{} requests remaining; treating rate limit on {} as transient",
                status.remaining,
                locator
            );
            return SiteError::RateLimitTransient {
                locator: locator.to_string(),
            };
        }

        self.discard(locator);
        if self.options.eviction == EvictionPolicy::ClearPrefixed {
            if let Err(e) = self.clear() {
                tracing::warn!("Could not clear cached responses: {}", e);
            }
        }

        let reload_requested = if self.prompted.swap(true, AtomicOrdering::SeqCst) {
            false
        } else {
            self.prompt.confirm_reload(&status)
        };
        SiteError::RateLimited {
            reset: status.reset_at(),
            reload_requested,
        }
    }
}
