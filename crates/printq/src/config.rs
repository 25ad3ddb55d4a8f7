use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MIN_POLL_TIMEOUT_MS: u64 = 1000;
const MAX_POLL_TIMEOUT_MS: u64 = 2000;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub submit_timeout_secs: u64,
    pub stagger_min_ms: u64,
    pub stagger_max_ms: u64,
    pub printable_extensions: Vec<String>,
    pub job_retention_hours: u64,
    pub log_file: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            poll_timeout_ms: MAX_POLL_TIMEOUT_MS,
            submit_timeout_secs: 10,
            stagger_min_ms: 100,
            stagger_max_ms: 300,
            printable_extensions: ["pdf", "txt", "doc", "docx", "jpg", "jpeg", "png", "gif"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            job_retention_hours: 24,
            log_file: None,
            data_dir: None,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    /// Polls must never stall the loop; the timeout is held to 1-2s.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(
            self.poll_timeout_ms
                .clamp(MIN_POLL_TIMEOUT_MS, MAX_POLL_TIMEOUT_MS),
        )
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs.max(1))
    }

    /// Half-open stagger window in milliseconds; an inverted range collapses.
    pub fn stagger_range(&self) -> (u64, u64) {
        let low = self.stagger_min_ms.min(self.stagger_max_ms);
        (low, self.stagger_max_ms.max(low))
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::try_from(self.job_retention_hours).unwrap_or(24))
    }

    /// Lowercased, without a leading dot.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.printable_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    pub fn jobs_path(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(data_dir)
            .join("printq/jobs.json")
    }

    /// `PRINTQ_LOG_FILE` overrides the config file.
    pub fn resolved_log_file(&self) -> Option<PathBuf> {
        match env::var("PRINTQ_LOG_FILE") {
            Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path.trim())),
            _ => self.log_file.clone(),
        }
    }
}

/// Missing file gives defaults. A parse error also gives defaults, with the
/// message handed back so it can be logged once logging is up.
pub fn load_config(path: &Path) -> (Config, Option<String>) {
    if !path.exists() {
        return (Config::default(), None);
    }
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            return (
                Config::default(),
                Some(format!("failed to read {}: {err}", path.display())),
            )
        }
    };
    match toml::from_str(&contents) {
        Ok(config) => (config, None),
        Err(err) => (
            Config::default(),
            Some(format!("invalid config {}: {err}", path.display())),
        ),
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = env::var("PRINTQ_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    config_dir().join("printq/config.toml")
}

fn data_dir() -> PathBuf {
    if let Ok(path) = env::var("XDG_DATA_HOME") {
        return PathBuf::from(path);
    }
    home_dir().join(".local/share")
}

fn config_dir() -> PathBuf {
    if let Ok(path) = env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(path);
    }
    home_dir().join(".config")
}

pub fn home_dir() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}
