use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use apa_scraping_utils::fs_json_util::{read_toml, write_toml};
use getset::Getters;
use log::info;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::schema::League;

pub const DEFAULT_CONFIG_PATH: &str = "etc/apa-scraping/config.toml";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub browser: BrowserConfig,
    pub site: SiteConfig,
    pub scraping: ScrapingConfig,
    pub pagination: PaginationConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Getters, Serialize, Deserialize)]
#[serde(default)]
#[getset(get = "pub")]
pub struct PathsConfig {
    var_dir: PathBuf,
}
impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            var_dir: PathBuf::from("var/apa-scraping"),
        }
    }
}
impl PathsConfig {
    pub fn with_var_dir(var_dir: impl Into<PathBuf>) -> Self {
        Self {
            var_dir: var_dir.into(),
        }
    }

    pub fn browser_data_dir(&self) -> PathBuf {
        self.var_dir.join("browser_data")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.var_dir.join("cache")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.var_dir.join("logs")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.var_dir.join("tmp")
    }

    /// Every directory under `var_dir` that `clear-state` wipes.
    pub fn state_dirs(&self) -> [PathBuf; 4] {
        [
            self.browser_data_dir(),
            self.logs_dir(),
            self.cache_dir(),
            self.tmp_dir(),
        ]
    }
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    #[serde(rename = "timeout_secs")]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub timeout: Duration,
    pub user_agent: String,
}
impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub default_league: League,
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub max_retries: u32,
    #[serde(rename = "retry_backoff_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub retry_backoff: Duration,
    #[serde(rename = "timeout_backoff_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout_backoff: Duration,
    #[serde(rename = "jitter_before_navigation_ms")]
    #[serde_as(as = "[DurationMilliSeconds<u64>; 2]")]
    pub jitter_before_navigation: [Duration; 2],
    #[serde(rename = "jitter_after_navigation_ms")]
    #[serde_as(as = "[DurationMilliSeconds<u64>; 2]")]
    pub jitter_after_navigation: [Duration; 2],
    #[serde(rename = "tab_settle_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tab_settle: Duration,
    #[serde(rename = "dialog_settle_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub dialog_settle: Duration,
    #[serde(rename = "login_submit_settle_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub login_submit_settle: Duration,
    #[serde(rename = "login_continue_settle_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub login_continue_settle: Duration,
}
impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff: Duration::from_millis(2000),
            timeout_backoff: Duration::from_millis(3000),
            jitter_before_navigation: [Duration::from_millis(2000), Duration::from_millis(4000)],
            jitter_after_navigation: [Duration::from_millis(1000), Duration::from_millis(2000)],
            tab_settle: Duration::from_millis(2000),
            dialog_settle: Duration::from_millis(2000),
            login_submit_settle: Duration::from_millis(3000),
            login_continue_settle: Duration::from_millis(5000),
        }
    }
}
impl ScrapingConfig {
    /// No waits at all; what tests run with.
    pub fn immediate() -> Self {
        Self {
            retry_backoff: Duration::ZERO,
            timeout_backoff: Duration::ZERO,
            jitter_before_navigation: [Duration::ZERO; 2],
            jitter_after_navigation: [Duration::ZERO; 2],
            tab_settle: Duration::ZERO,
            dialog_settle: Duration::ZERO,
            login_submit_settle: Duration::ZERO,
            login_continue_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub max_scroll_attempts: u32,
    #[serde(rename = "settle_after_scroll_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub settle_after_scroll: Duration,
    #[serde(rename = "settle_after_click_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub settle_after_click: Duration,
    #[serde(rename = "settle_after_nudge_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub settle_after_nudge: Duration,
    pub nudge_offset_px: u32,
    pub bottom_slack_px: u32,
}
impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_scroll_attempts: 30,
            settle_after_scroll: Duration::from_millis(3500),
            settle_after_click: Duration::from_millis(5250),
            settle_after_nudge: Duration::from_millis(1750),
            nudge_offset_px: 500,
            bottom_slack_px: 100,
        }
    }
}
impl PaginationConfig {
    pub fn immediate() -> Self {
        Self {
            settle_after_scroll: Duration::ZERO,
            settle_after_click: Duration::ZERO,
            settle_after_nudge: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub timeout_hours: f64,
}
impl Default for CacheConfig {
    fn default() -> Self {
        Self { timeout_hours: 12. }
    }
}
impl CacheConfig {
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_hours * 3600.).unwrap_or(Duration::ZERO)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl Config {
    /// Loads the file, writing out the defaults first when it does not exist yet.
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            read_toml(path).with_context(|| format!("Failed to load configuration from {path:?}"))
        } else {
            let config = Self::default();
            write_toml(path, &config)
                .with_context(|| format!("Failed to write default configuration to {path:?}"))?;
            info!("Created default configuration at {path:?}");
            Ok(config)
        }
    }

    /// `--league` wins over the configured default.
    pub fn resolve_league(&self, cli: Option<League>) -> League {
        cli.unwrap_or_else(|| self.site.default_league.clone())
    }
}
