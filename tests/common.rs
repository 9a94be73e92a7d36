use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::str;
use tempfile::TempDir;

pub const REPO: &str = "Khroki/MCEdit-Unified";

pub const NAVBAR: &str = r#"{
    "root": "/",
    "navbar": [
        {"url": "index.html", "displayname": "Home"},
        {"url": "downloads.html", "displayname": "Downloads", "icon": "fa-download"},
        {"url": "drafts.html", "displayname": "Drafts", "hidden": true}
    ]
}"#;

pub const RELEASES: &str = r#"[
    {
        "tag_name": "1.5.0.0",
        "name": "MCEdit 1.5",
        "prerelease": false,
        "published_at": "2015-03-01T12:00:00Z",
        "body": "Thanks to @podshot",
        "assets": [
            {"name": "MCEdit.v1.5.0.0.Win.64bit.zip", "download_count": 40, "browser_download_url": "https://dl.invalid/1.5/win64.zip"},
            {"name": "MCEdit.v1.5.0.0.Win.32bit.zip", "download_count": 20, "browser_download_url": "https://dl.invalid/1.5/win32.zip"},
            {"name": "MCEdit.v1.5.0.0.Lin.Universal.run", "download_count": 5, "browser_download_url": "https://dl.invalid/1.5/lin.run"}
        ]
    },
    {
        "tag_name": "1.10.0.0",
        "name": "MCEdit 1.10 beta",
        "prerelease": true,
        "published_at": "2015-04-01T12:00:00Z",
        "assets": []
    },
    {
        "tag_name": "1.4.0.1",
        "prerelease": false,
        "published_at": "2015-01-01T12:00:00Z",
        "assets": [
            {"name": "MCEdit.v1.4.0.1.OSX.64bit.zip", "download_count": 9, "browser_download_url": "https://dl.invalid/1.4/osx.zip"}
        ]
    }
]"#;

/// Rate limit status with requests left, so nothing counts as exhausted and
/// the window does not look freshly reset.
pub const RATE_LIMIT: &str =
    r#"{"rate": {"limit": 60, "remaining": 42, "reset": 4102444800, "used": 18}}"#;

// Not every test binary uses every helper.
#[allow(dead_code)]
pub struct TestContext {
    pub _temp_dir: TempDir,
    pub config_path: PathBuf,
    pub cache_dir: PathBuf,
    pub site_root: PathBuf,
    pub api_base: PathBuf,
    pub bin_path: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("config.json");
        let cache_dir = temp_dir.path().join("cache");
        let site_root = temp_dir.path().join("site");
        let api_base = temp_dir.path().join("api");
        fs::create_dir_all(&site_root).expect("Failed to create site root");
        fs::create_dir_all(&api_base).expect("Failed to create api dir");

        let bin_path = PathBuf::from(env!("CARGO_BIN_EXE_mcsite"));

        Self {
            _temp_dir: temp_dir,
            config_path,
            cache_dir,
            site_root,
            api_base,
            bin_path,
        }
    }

    /// A context whose site and API directories hold a small release
    /// history, so every command runs without the network.
    pub fn with_site() -> Self {
        let ctx = Self::new();
        ctx.write_site("navbar.json", NAVBAR);
        ctx.write_api(&format!("repos/{}/releases", REPO), RELEASES);
        ctx.write_api("rate_limit", RATE_LIMIT);
        ctx
    }

    pub fn write_site(&self, name: &str, content: &str) {
        write_file(&self.site_root.join(name), content);
    }

    pub fn write_api(&self, name: &str, content: &str) {
        write_file(&self.api_base.join(name), content);
    }

    pub fn cache_file(&self) -> PathBuf {
        self.cache_dir.join("cache.json")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(&self.bin_path);
        cmd.env("MCSITE_CONFIG_PATH", &self.config_path);
        cmd.env("MCSITE_CACHE_DIR", &self.cache_dir);
        cmd.env("MCSITE_SITE_ROOT", &self.site_root);
        cmd.env("MCSITE_API_BASE", &self.api_base);
        cmd.env("MCSITE_REPO", REPO);
        cmd.env_remove("MCSITE_CACHE_BACKEND");
        cmd.env_remove("MCSITE_RATE_LIMIT_THRESHOLD");
        cmd.env_remove("RUST_LOG");
        // Keep dirs:: lookups inside the temp dir
        cmd.env("HOME", self._temp_dir.path());
        cmd.env("XDG_CONFIG_HOME", self._temp_dir.path().join("config"));
        cmd.env("XDG_CACHE_HOME", self._temp_dir.path().join("xdg-cache"));
        cmd
    }

    pub fn run(&self, args: &[&str]) -> CommandOutput {
        self.cmd()
            .args(args)
            .output()
            .expect("Failed to run mcsite")
            .into()
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture dir");
    }
    fs::write(path, content).expect("Failed to write fixture");
}

#[allow(dead_code)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status: output.status,
        }
    }
}

#[allow(dead_code)]
impl CommandOutput {
    pub fn assert_success(&self) -> &Self {
        if !self.status.success() {
            panic!(
                "Command failed with status {:?}\nstdout: {}\nstderr: {}",
                self.status.code(),
                self.stdout,
                self.stderr
            );
        }
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(
            !self.status.success(),
            "Command unexpectedly succeeded\nstdout: {}",
            self.stdout
        );
        self
    }

    pub fn assert_stdout_contains(&self, text: &str) -> &Self {
        assert!(
            self.stdout.contains(text),
            "Stdout did not contain '{}'\nActual stdout: {}",
            text,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, text: &str) -> &Self {
        assert!(
            self.stderr.contains(text),
            "Stderr did not contain '{}'\nActual stderr: {}",
            text,
            self.stderr
        );
        self
    }
}
