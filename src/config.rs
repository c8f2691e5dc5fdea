// src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::fetch;

pub const ENV_CONFIG_PATH: &str = "LINKSCRIBE_CONFIG";
pub const ENV_USER_AGENT: &str = "LINKSCRIBE_USER_AGENT";
pub const ENV_ACCEPT_LANGUAGE: &str = "LINKSCRIBE_ACCEPT_LANGUAGE";

pub const DEFAULT_CONFIG_PATH: &str = "linkscribe.toml";
pub const DEFAULT_OUT_DIR: &str = "notes";
pub const DEFAULT_SLEEP_SECS: f64 = 1.0;

/// Optional TOML settings file. Every field is optional; CLI flags and env
/// variables override whatever is here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub user_agent: Option<String>,
    pub accept_language: Option<String>,
    pub timeout_secs: Option<u64>,
    pub sleep_secs: Option<f64>,
    pub out_dir: Option<String>,
    pub template: Option<String>,
}

impl Settings {
    /// `LINKSCRIBE_CONFIG` wins and must point at a readable file; otherwise
    /// `linkscribe.toml` is used when present, and built-in defaults when not.
    pub fn load() -> Result<Self> {
        if let Ok(path) = env::var(ENV_CONFIG_PATH) {
            let path = path.trim();
            if !path.is_empty() {
                return Self::load_from_file(Path::new(path));
            }
        }
        let default = Path::new(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(default);
        }
        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing settings from {}", path.display()))
    }
}

/// Fully resolved configuration for one run: file < env < CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub csv_path: PathBuf,
    pub out_root: PathBuf,
    pub sleep: Duration,
    pub timeout: Duration,
    pub user_agent: String,
    pub accept_language: String,
    pub template: Option<PathBuf>,
    pub zip: bool,
}

/// CLI-level overrides, kept as plain options so the binary owns the clap
/// surface and the library stays argument-parser free.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub out: Option<PathBuf>,
    pub sleep: Option<f64>,
    pub timeout: Option<u64>,
    pub template: Option<PathBuf>,
    pub zip: bool,
}

impl RunConfig {
    pub fn assemble(csv_path: PathBuf, overrides: Overrides, settings: &Settings) -> Self {
        let out_root = overrides
            .out
            .or_else(|| settings.out_dir.clone().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR));
        let sleep_secs = overrides
            .sleep
            .or(settings.sleep_secs)
            .unwrap_or(DEFAULT_SLEEP_SECS)
            .max(0.0);
        let timeout_secs = overrides
            .timeout
            .or(settings.timeout_secs)
            .unwrap_or(fetch::DEFAULT_TIMEOUT_SECS);
        let user_agent = env_non_empty(ENV_USER_AGENT)
            .or_else(|| settings.user_agent.clone())
            .unwrap_or_else(|| fetch::DEFAULT_USER_AGENT.to_string());
        let accept_language = env_non_empty(ENV_ACCEPT_LANGUAGE)
            .or_else(|| settings.accept_language.clone())
            .unwrap_or_else(|| fetch::DEFAULT_ACCEPT_LANGUAGE.to_string());
        let template = overrides
            .template
            .or_else(|| settings.template.clone().map(PathBuf::from));

        RunConfig {
            csv_path,
            out_root,
            sleep: Duration::from_secs_f64(sleep_secs),
            timeout: Duration::from_secs(timeout_secs),
            user_agent,
            accept_language,
            template,
            zip: overrides.zip,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
