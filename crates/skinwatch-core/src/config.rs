use crate::error::{Result, WatchError};
use crate::scheduler::SchedulePolicy;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "skinwatch.yaml";

pub const ENV_CREDENTIAL: &str = "BNET_COOKIE";
pub const ENV_CHANNEL_ID: &str = "NOTIFICATION_CHANNEL_ID";
pub const ENV_BOT_TOKEN: &str = "DISCORD_TOKEN";
pub const ENV_STORE_PATH: &str = "SKINWATCH_DB";

const REDACTED: &str = "***";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ScheduleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleConfig {
    /// Once a day at a local wall-clock time, `HH:MM` or `HH:MM:SS`.
    Daily {
        #[serde(default = "default_daily_at")]
        at: String,
    },
    /// Immediately, then every `every_secs` seconds.
    Interval {
        every_secs: u64,
        #[serde(default = "default_run_immediately")]
        run_immediately: bool,
    },
}

fn default_daily_at() -> String {
    "00:00".to_string()
}

fn default_run_immediately() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::Daily {
            at: default_daily_at(),
        }
    }
}

impl ScheduleConfig {
    pub fn policy(&self) -> Result<SchedulePolicy> {
        match self {
            Self::Daily { at } => Ok(SchedulePolicy::Daily {
                at: parse_time_of_day(at)?,
            }),
            Self::Interval {
                every_secs,
                run_immediately,
            } => {
                if *every_secs == 0 {
                    return Err(WatchError::InvalidConfig(
                        "schedule.every_secs must be greater than zero".into(),
                    ));
                }
                Ok(SchedulePolicy::Interval {
                    every: Duration::from_secs(*every_secs),
                    run_immediately: *run_immediately,
                })
            }
        }
    }
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            WatchError::InvalidConfig(format!(
                "schedule.at '{value}' is not a time of day (expected HH:MM)"
            ))
        })
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    Json { path: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("data/skins.db"),
        }
    }
}

impl StoreConfig {
    pub fn path(&self) -> &Path {
        match self {
            Self::Sqlite { path } | Self::Json { path } => path,
        }
    }

    fn set_path(&mut self, new_path: PathBuf) {
        match self {
            Self::Sqlite { path } | Self::Json { path } => *path = new_path,
        }
    }
}

// ---------------------------------------------------------------------------
// NotifyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel_id: None,
            bot_token: None,
            api_base: default_api_base(),
        }
    }
}

// ---------------------------------------------------------------------------
// WatchConfig
// ---------------------------------------------------------------------------

/// Process-wide configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upstream session cookie. Normally supplied through `BNET_COOKIE`.
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_base_url() -> String {
    "https://eu.battle.net/shop/en/checkout/buy".to_string()
}

fn default_request_timeout_secs() -> u64 {
    crate::walker::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_request_delay_ms() -> u64 {
    crate::cycle::DEFAULT_REQUEST_DELAY.as_millis() as u64
}

fn default_max_redirects() -> usize {
    crate::walker::MAX_REDIRECTS
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            credential: None,
            request_timeout_secs: default_request_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            max_redirects: default_max_redirects(),
            schedule: ScheduleConfig::default(),
            store: StoreConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl WatchConfig {
    /// Load from `path` (or [`DEFAULT_CONFIG_FILE`]) and apply environment
    /// overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_file(path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE)))?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    /// Overlay secrets and the store path from the environment. Empty values
    /// are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_CREDENTIAL) {
            self.credential = Some(v);
        }
        if let Some(v) = get(ENV_CHANNEL_ID) {
            self.notify.channel_id = Some(v);
        }
        if let Some(v) = get(ENV_BOT_TOKEN) {
            self.notify.bot_token = Some(v);
        }
        if let Some(v) = get(ENV_STORE_PATH) {
            self.store.set_path(PathBuf::from(v));
        }
    }

    /// The credential, if present and non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Fail on settings under which no cycle can produce a trustworthy
    /// verdict. A missing credential is left to the cycle, which reports it.
    pub fn ensure_runnable(&self) -> Result<()> {
        if self.max_redirects == 0 {
            return Err(WatchError::InvalidConfig(
                "max_redirects must be at least 1".into(),
            ));
        }
        reqwest::Url::parse(&self.base_url).map_err(|e| WatchError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Copy with secrets replaced, safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.credential.is_some() {
            copy.credential = Some(REDACTED.into());
        }
        if copy.notify.bot_token.is_some() {
            copy.notify.bot_token = Some(REDACTED.into());
        }
        copy
    }

    /// Problems that degrade behaviour without preventing startup.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.credential().is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("{ENV_CREDENTIAL} is not set: every cycle will be skipped"),
            });
        }
        if self.notify.channel_id.is_none() || self.notify.bot_token.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "{ENV_CHANNEL_ID} or {ENV_BOT_TOKEN} is not set: operator alerts go to the log only"
                ),
            });
        }
        if let Err(e) = self.schedule.policy() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }
        if reqwest::Url::parse(&self.base_url).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("base_url '{}' is not a valid URL", self.base_url),
            });
        }
        if self.request_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "request_timeout_secs is 0: every request will time out".into(),
            });
        }
        if self.max_redirects == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "max_redirects is 0: no request will ever be sent".into(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
