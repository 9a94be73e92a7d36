mod changelog;
mod cli;
mod config;
mod contributors;
mod error;
mod gate;
mod page;
mod platform;
mod releases;
mod render;
mod types;
mod version;


use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use cli::{CacheAction, Cli, Commands, ConfigAction};
use config::{
    get_cache_file_path, get_setting, load_site_config, normalize_key, save_site_config,
    set_setting, unset_setting, SETTING_KEYS,
};
use error::SiteError;
use gate::{
    AnyStore, ConsolePrompt, DeclinePrompt, FetchGate, FileStore, GateOptions, MemoryStore,
    ReloadPrompt, SiteTransport,
};
use indicatif::{ProgressBar, ProgressStyle};
use page::{build_nav, PageSession, NAV_LOCATOR};
use platform::{find_download, host_bit_width, AssetNaming, BitWidth, Platform};
use std::time::Duration;
use types::{CacheBackend, NavDocument, RateLimitStatus, Release, SiteConfig, SiteSettings};

type SiteGate = FetchGate<SiteTransport, AnyStore>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let mut config = load_site_config()?;
    let settings = config.settings.clone();
    let force = cli.refresh;

    match cli.command {
        Commands::Version => {
            println!("mcsite v{}", env!("CARGO_PKG_VERSION"));
        }

        Commands::Compare {
            a,
            b,
            lexicographical,
            zero_extend,
        } => {
            let options = version::CompareOptions {
                lexicographical,
                zero_extend,
            };
            let result = version::compare_versions(&a, &b, options);
            println!("{}", version::format_comparison(result));
        }

        Commands::Config { action } => handle_config(&mut config, action)?,

        Commands::Cache { action } => {
            let gate = build_gate(&settings, reload_prompt())?;
            handle_cache(&gate, action)?;
        }

        Commands::Page { page } => run_page(&settings, page, force).await?,

        Commands::Nav { page } => {
            let gate = build_gate(&settings, reload_prompt())?;
            let doc: NavDocument = gate
                .get_as(NAV_LOCATOR, force)
                .await
                .unwrap_or_else(|e| fail(&gate, &settings, &e));
            let bar = build_nav(&doc, page.as_deref(), &settings.site_title);
            print!("{}", render::nav(&bar));
        }

        Commands::Changelog => {
            let gate = build_gate(&settings, reload_prompt())?;
            let releases = load_releases(&gate, &settings, force).await;
            let comments = page::load_comments(&gate, force)
                .await
                .unwrap_or_else(|e| fail(&gate, &settings, &e));
            let naming = AssetNaming::from_settings(&settings);
            let entries = changelog::build_changelog(&releases, &comments, &naming, Utc::now());
            print!("{}", render::changelog(&entries));
        }

        Commands::Latest => {
            let gate = build_gate(&settings, reload_prompt())?;
            let releases = load_releases(&gate, &settings, force).await;
            let set = releases::classify(&releases);
            print!(
                "{}",
                render::latest(set.latest_stable(), set.latest_prerelease())
            );
        }

        Commands::Download {
            platform,
            bits,
            version,
        } => {
            let platform = match platform {
                Some(p) => p.parse::<Platform>().map_err(|e| anyhow!(e))?,
                None => Platform::detect(),
            };
            let bits = match bits {
                Some(b) => b.parse::<BitWidth>().map_err(|e| anyhow!(e))?,
                None => host_bit_width(),
            };

            let gate = build_gate(&settings, reload_prompt())?;
            let releases = load_releases(&gate, &settings, force).await;
            let version = match version {
                Some(v) => v,
                None => releases::classify(&releases)
                    .latest_stable()
                    .map(|r| r.tag_name.clone())
                    .ok_or_else(|| anyhow!("No stable release published for {}", settings.repo))?,
            };

            let naming = AssetNaming::from_settings(&settings);
            match find_download(&releases, platform, &version, bits, &naming) {
                Some(asset) => println!("{}", asset.browser_download_url),
                None => {
                    tracing::error!(
                        "No Download Found for {} {} ({}-bit)",
                        platform.display_name(),
                        version,
                        bits
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Downloads => {
            let gate = build_gate(&settings, reload_prompt())?;
            let releases = load_releases(&gate, &settings, force).await;
            let set = releases::classify(&releases);
            let naming = AssetNaming::from_settings(&settings);
            let downloads = set
                .latest_stable()
                .or(set.latest_prerelease())
                .map(|latest| changelog::build_downloads(latest, &releases, &naming))
                .unwrap_or_default();
            print!("{}", render::downloads(&downloads));
        }

        Commands::Contributors => {
            let gate = build_gate(&settings, reload_prompt())?;
            let cards = contributors::load_contributors(&gate, &settings, force, Utc::now())
                .await
                .unwrap_or_else(|e| fail(&gate, &settings, &e));
            print!("{}", render::contributors(&cards));
        }

        Commands::RateLimit => {
            let gate = build_gate(&settings, reload_prompt())?;
            let status = gate
                .rate_limit_status()
                .await
                .unwrap_or_else(|e| fail(&gate, &settings, &e));
            print!("{}", render::rate_limit(&status, Utc::now()));
        }
    }

    Ok(())
}

fn setup_logging(cli: &Cli) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.quiet {
        "error"
    } else if cli.verbose == 0 {
        "warn"
    } else if cli.verbose == 1 {
        "info"
    } else {
        "debug"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

fn build_gate(settings: &SiteSettings, prompt: Box<dyn ReloadPrompt>) -> Result<SiteGate> {
    let store = match settings.cache_backend {
        CacheBackend::Memory => AnyStore::Memory(MemoryStore::new()),
        CacheBackend::Disk => AnyStore::Disk(FileStore::open(get_cache_file_path()?)?),
    };
    let transport = SiteTransport::new(&settings.site_root)?;
    Ok(FetchGate::new(
        transport,
        store,
        GateOptions::from_settings(settings),
        prompt,
    ))
}

/// Prints the failure view and exits. Only page sessions count failures, so
/// the counter is read, not bumped.
fn fail(gate: &SiteGate, settings: &SiteSettings, err: &SiteError) -> ! {
    let count = page::error_count(gate.store());
    eprint!("{}", render::failure(err, count, settings, Utc::now()));
    std::process::exit(1);
}

async fn load_releases(gate: &SiteGate, settings: &SiteSettings, force: bool) -> Vec<Release> {
    gate.get_as(&settings.releases_locator(), force)
        .await
        .unwrap_or_else(|e| fail(gate, settings, &e))
}

fn reload_prompt() -> Box<dyn ReloadPrompt> {
    if console::user_attended_stderr() {
        Box::new(ConsolePrompt::new())
    } else {
        Box::new(DeclinePrompt)
    }
}

/// Pauses the spinner while the reload question is on screen.
struct SpinnerPrompt {
    spinner: ProgressBar,
    inner: ConsolePrompt,
}

impl ReloadPrompt for SpinnerPrompt {
    fn confirm_reload(&self, status: &RateLimitStatus) -> bool {
        self.spinner.suspend(|| self.inner.confirm_reload(status))
    }
}

fn page_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Loading page...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Runs page sessions until one finishes. A session that ends rate limited
/// with a reload request starts over from INIT with a fresh gate.
async fn run_page(settings: &SiteSettings, current_page: Option<String>, force: bool) -> Result<()> {
    loop {
        let spinner = page_spinner();
        let gate = build_gate(
            settings,
            Box::new(SpinnerPrompt {
                spinner: spinner.clone(),
                inner: ConsolePrompt::new(),
            }),
        )?;

        let mut session = PageSession::new(&gate, settings, current_page.clone(), force);
        let result = session.load(Utc::now()).await;
        spinner.finish_and_clear();
        tracing::debug!(
            "Page session ended in {} after {} states",
            session.state(),
            session.history().len()
        );

        match result {
            Ok(page) => {
                print!("{}", render::page(&page));
                return Ok(());
            }
            Err(SiteError::RateLimited {
                reload_requested: true,
                ..
            }) => {
                tracing::info!("Reloading page");
            }
            Err(e) => fail(&gate, settings, &e),
        }
    }
}

fn handle_cache(gate: &SiteGate, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::List => {
            if let AnyStore::Disk(store) = gate.store() {
                tracing::info!("Cache file: {}", store.path().display());
            }
            let locators = gate.cached_locators();
            if locators.is_empty() {
                println!("No cached responses.");
            }
            for locator in locators {
                println!("{}", locator);
            }
        }
        CacheAction::Clear => {
            let removed = gate.clear()?;
            println!(
                "Cleared {} cached response(s) under '{}'",
                removed,
                gate.options().namespace
            );
        }
        CacheAction::Evict { locator } => {
            if gate.evict(&locator)? {
                println!("Evicted {}", locator);
            } else {
                println!("{} was not cached", locator);
            }
        }
    }
    Ok(())
}

fn handle_config(config: &mut SiteConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Get { key } => {
            if let Some(key) = key {
                let key = normalize_key(&key);
                match get_setting(&config.settings, &key) {
                    Some(value) => println!("{}", value),
                    None => {
                        tracing::error!(
                            "'{}' is not a valid configuration setting. Valid settings: {}",
                            key,
                            SETTING_KEYS.join(", ")
                        );
                        std::process::exit(1);
                    }
                }
            } else {
                println!("--- mcsite Settings ---");
                for key in SETTING_KEYS {
                    if let Some(value) = get_setting(&config.settings, key) {
                        println!("  {}: {}", key, value);
                    }
                }
            }
        }
        ConfigAction::Set { args } => {
            let (key, value) = match args.as_slice() {
                [pair] => match pair.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => return Err(anyhow!("Invalid format. Use 'key=value' or 'key value'.")),
                },
                [k, rest @ ..] => (k.to_string(), rest.join(" ")),
                [] => return Err(anyhow!("Missing key and value")),
            };
            let key = normalize_key(&key);
            set_setting(&mut config.settings, &key, &value)?;
            save_site_config(config)?;
            tracing::info!("Setting '{}' updated to '{}'", key, value);
        }
        ConfigAction::Unset { key } => {
            let key = normalize_key(&key);
            unset_setting(&mut config.settings, &key)?;
            save_site_config(config)?;
            tracing::info!("Setting '{}' unset", key);
        }
        ConfigAction::Show { format } => match format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&config.settings)?),
            "yaml" => print!("{}", serde_yaml::to_string(&config.settings)?),
            other => return Err(anyhow!("Unsupported format '{}': use json or yaml", other)),
        },
    }
    Ok(())
}
