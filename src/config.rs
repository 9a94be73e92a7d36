use crate::types::*;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::PathBuf;

pub const APP_NAME: &str = "mcsite";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const CACHE_FILE_NAME: &str = "cache.json";

pub const SETTING_KEYS: &[&str] = &[
    "repo",
    "api_base",
    "site_root",
    "site_title",
    "product_name",
    "bit_suffix",
    "cache_backend",
    "cache_namespace",
    "eviction",
    "fresh_limit",
    "rate_limit_threshold",
    "text_fallback",
    "report_issue_threshold",
    "issue_url",
];

pub fn get_user_config_dir() -> Result<PathBuf> {
    let path = dirs::config_dir()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?
        .join(APP_NAME);
    fs::create_dir_all(&path)?;
    Ok(path)
}

pub fn get_config_file_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("MCSITE_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }
    let path = get_user_config_dir()?.join(CONFIG_FILE_NAME);
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

pub fn get_cache_file_path() -> Result<PathBuf> {
    let dir = match std::env::var("MCSITE_CACHE_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?
            .join(APP_NAME),
    };
    fs::create_dir_all(&dir)?;
    let path = dir.join(CACHE_FILE_NAME);
    tracing::debug!("Cache file path: {}", path.display());
    Ok(path)
}

pub fn load_site_config() -> Result<SiteConfig> {
    let config_path = get_config_file_path()?;

    let mut config = if config_path.exists() {
        let content = fs::read_to_string(&config_path).with_context(|| {
            format!("Could not read config file at {}", config_path.display())
        })?;
        serde_json::from_str(&content).with_context(|| "Could not parse config file as JSON")?
    } else {
        SiteConfig::default()
    };

    apply_env_overrides(&mut config.settings);
    Ok(config)
}

fn apply_env_overrides(settings: &mut SiteSettings) {
    if let Ok(repo) = std::env::var("MCSITE_REPO") {
        settings.repo = repo;
    }
    if let Ok(api_base) = std::env::var("MCSITE_API_BASE") {
        settings.api_base = api_base.trim_end_matches('/').to_string();
    }
    if let Ok(site_root) = std::env::var("MCSITE_SITE_ROOT") {
        settings.site_root = site_root;
    }
    if let Ok(backend) = std::env::var("MCSITE_CACHE_BACKEND") {
        if let Err(e) = set_setting(settings, "cache_backend", &backend) {
            tracing::warn!("Ignoring MCSITE_CACHE_BACKEND: {}", e);
        }
    }
    if let Ok(threshold) = std::env::var("MCSITE_RATE_LIMIT_THRESHOLD") {
        if let Ok(threshold) = threshold.parse::<u32>() {
            settings.rate_limit_threshold = threshold;
        }
    }
}

pub fn save_site_config(config: &SiteConfig) -> Result<()> {
    let config_path = get_config_file_path()?;
    if let Some(config_dir) = config_path.parent() {
        fs::create_dir_all(config_dir)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, content)?;

    Ok(())
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}

pub fn get_setting(settings: &SiteSettings, key: &str) -> Option<String> {
    let value = match key {
        "repo" => settings.repo.clone(),
        "api_base" => settings.api_base.clone(),
        "site_root" => settings.site_root.clone(),
        "site_title" => settings.site_title.clone(),
        "product_name" => settings.product_name.clone(),
        "bit_suffix" => settings.bit_suffix.clone(),
        "cache_backend" => match settings.cache_backend {
            CacheBackend::Memory => "memory".to_string(),
            CacheBackend::Disk => "disk".to_string(),
        },
        "cache_namespace" => settings.cache_namespace.clone(),
        "eviction" => match settings.eviction {
            EvictionMode::ClearOnReset => "clear-on-reset".to_string(),
            EvictionMode::ClearPrefixed => "clear-prefixed".to_string(),
        },
        "fresh_limit" => settings.fresh_limit.to_string(),
        "rate_limit_threshold" => settings.rate_limit_threshold.to_string(),
        "text_fallback" => settings.text_fallback.to_string(),
        "report_issue_threshold" => settings.report_issue_threshold.to_string(),
        "issue_url" => settings.issue_url.clone(),
        _ => return None,
    };
    Some(value)
}

fn parse_bool(value: &str) -> bool {
    value.to_lowercase() == "true" || value == "1"
}

fn parse_number(key: &str, value: &str) -> Result<u32> {
    value
        .parse::<u32>()
        .map_err(|_| anyhow!("Invalid value for '{}': expected a number", key))
}

pub fn set_setting(settings: &mut SiteSettings, key: &str, value: &str) -> Result<()> {
    match key {
        "repo" => settings.repo = value.to_string(),
        "api_base" => settings.api_base = value.trim_end_matches('/').to_string(),
        "site_root" => settings.site_root = value.to_string(),
        "site_title" => settings.site_title = value.to_string(),
        "product_name" => settings.product_name = value.to_string(),
        "bit_suffix" => settings.bit_suffix = value.to_string(),
        "cache_backend" => {
            settings.cache_backend = match value.to_lowercase().as_str() {
                "memory" => CacheBackend::Memory,
                "disk" => CacheBackend::Disk,
                _ => return Err(anyhow!("Invalid cache backend '{}': use memory or disk", value)),
            }
        }
        "cache_namespace" => settings.cache_namespace = value.to_string(),
        "eviction" => {
            settings.eviction = match value.to_lowercase().as_str() {
                "clear-on-reset" | "clear_on_reset" => EvictionMode::ClearOnReset,
                "clear-prefixed" | "clear_prefixed" => EvictionMode::ClearPrefixed,
                _ => {
                    return Err(anyhow!(
                        "Invalid eviction mode '{}': use clear-on-reset or clear-prefixed",
                        value
                    ))
                }
            }
        }
        "fresh_limit" => settings.fresh_limit = parse_number(key, value)?,
        "rate_limit_threshold" => settings.rate_limit_threshold = parse_number(key, value)?,
        "text_fallback" => settings.text_fallback = parse_bool(value),
        "report_issue_threshold" => settings.report_issue_threshold = parse_number(key, value)?,
        "issue_url" => settings.issue_url = value.to_string(),
        _ => {
            return Err(anyhow!(
                "'{}' is not a valid configuration setting. Valid settings: {}",
                key,
                SETTING_KEYS.join(", ")
            ))
        }
    }
    Ok(())
}

pub fn unset_setting(settings: &mut SiteSettings, key: &str) -> Result<()> {
    let defaults = SiteSettings::default();
    let value = get_setting(&defaults, key).ok_or_else(|| {
        anyhow!(
            "'{}' is not a valid configuration setting. Valid settings: {}",
            key,
            SETTING_KEYS.join(", ")
        )
    })?;
    set_setting(settings, key, &value)
}
